//! In-memory registry implementations.
//!
//! `InMemory*` types back the test suite and embedders that assemble
//! provider data programmatically; the `No*` unit types are the no-op
//! defaults a [`crate::context::ValidationContext`] falls back to.
use crate::{
    context::{
        ChildExportLookup, ChildExportType, CustomVariableTypes, DataSourceRegistry,
        FunctionRegistry, LinkRegistry, ResourceRegistry,
    },
    schema::{
        CustomTypeOptions, DataSourceSpecDefinition, FilterFieldDefinition,
        LinkAnnotationDefinition, ResourceSpecDefinition,
    },
    substitutions::FunctionSignature,
};
use ahash::AHashMap;
use std::sync::Arc;

/// A function registry backed by a map of signatures.
#[derive(Debug, Default)]
pub struct InMemoryFunctionRegistry {
    functions: AHashMap<String, FunctionSignature>,
}

impl InMemoryFunctionRegistry {
    #[must_use]
    pub fn new() -> InMemoryFunctionRegistry {
        InMemoryFunctionRegistry::default()
    }

    #[must_use]
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        signature: FunctionSignature,
    ) -> InMemoryFunctionRegistry {
        self.functions.insert(name.into(), signature);
        self
    }
}

impl FunctionRegistry for InMemoryFunctionRegistry {
    fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn signature(&self, name: &str) -> Option<FunctionSignature> {
        self.functions.get(name).cloned()
    }
}

/// A resource registry backed by a map of spec definitions.
#[derive(Debug, Default)]
pub struct InMemoryResourceRegistry {
    definitions: AHashMap<String, Arc<ResourceSpecDefinition>>,
}

impl InMemoryResourceRegistry {
    #[must_use]
    pub fn new() -> InMemoryResourceRegistry {
        InMemoryResourceRegistry::default()
    }

    #[must_use]
    pub fn with_type(
        mut self,
        resource_type: impl Into<String>,
        definition: ResourceSpecDefinition,
    ) -> InMemoryResourceRegistry {
        self.definitions
            .insert(resource_type.into(), Arc::new(definition));
        self
    }
}

impl ResourceRegistry for InMemoryResourceRegistry {
    fn has_type(&self, resource_type: &str) -> bool {
        self.definitions.contains_key(resource_type)
    }

    fn spec_definition(&self, resource_type: &str) -> Option<Arc<ResourceSpecDefinition>> {
        self.definitions.get(resource_type).cloned()
    }
}

/// A data source registry backed by maps of definitions and filter fields.
#[derive(Debug, Default)]
pub struct InMemoryDataSourceRegistry {
    definitions: AHashMap<String, Arc<DataSourceSpecDefinition>>,
    filter_fields: AHashMap<String, AHashMap<String, FilterFieldDefinition>>,
}

impl InMemoryDataSourceRegistry {
    #[must_use]
    pub fn new() -> InMemoryDataSourceRegistry {
        InMemoryDataSourceRegistry::default()
    }

    #[must_use]
    pub fn with_type(
        mut self,
        source_type: impl Into<String>,
        definition: DataSourceSpecDefinition,
    ) -> InMemoryDataSourceRegistry {
        self.definitions
            .insert(source_type.into(), Arc::new(definition));
        self
    }

    #[must_use]
    pub fn with_filter_fields(
        mut self,
        source_type: impl Into<String>,
        fields: AHashMap<String, FilterFieldDefinition>,
    ) -> InMemoryDataSourceRegistry {
        self.filter_fields.insert(source_type.into(), fields);
        self
    }
}

impl DataSourceRegistry for InMemoryDataSourceRegistry {
    fn has_type(&self, source_type: &str) -> bool {
        self.definitions.contains_key(source_type)
    }

    fn spec_definition(&self, source_type: &str) -> Option<Arc<DataSourceSpecDefinition>> {
        self.definitions.get(source_type).cloned()
    }

    fn filter_fields(&self, source_type: &str) -> AHashMap<String, FilterFieldDefinition> {
        self.filter_fields
            .get(source_type)
            .cloned()
            .unwrap_or_default()
    }
}

/// A link registry keyed by `(resource type A, resource type B)` pairs.
#[derive(Debug, Default)]
pub struct InMemoryLinkRegistry {
    links: AHashMap<(String, String), Arc<AHashMap<String, LinkAnnotationDefinition>>>,
}

impl InMemoryLinkRegistry {
    #[must_use]
    pub fn new() -> InMemoryLinkRegistry {
        InMemoryLinkRegistry::default()
    }

    #[must_use]
    pub fn with_link(
        mut self,
        resource_type_a: impl Into<String>,
        resource_type_b: impl Into<String>,
        annotation_definitions: Vec<LinkAnnotationDefinition>,
    ) -> InMemoryLinkRegistry {
        let definitions: AHashMap<String, LinkAnnotationDefinition> = annotation_definitions
            .into_iter()
            .map(|definition| (definition.name.clone(), definition))
            .collect();
        self.links.insert(
            (resource_type_a.into(), resource_type_b.into()),
            Arc::new(definitions),
        );
        self
    }
}

impl LinkRegistry for InMemoryLinkRegistry {
    fn has_link(&self, resource_type_a: &str, resource_type_b: &str) -> bool {
        self.links
            .contains_key(&(resource_type_a.to_owned(), resource_type_b.to_owned()))
    }

    fn annotation_definitions(
        &self,
        resource_type_a: &str,
        resource_type_b: &str,
    ) -> Option<Arc<AHashMap<String, LinkAnnotationDefinition>>> {
        self.links
            .get(&(resource_type_a.to_owned(), resource_type_b.to_owned()))
            .cloned()
    }
}

/// A custom variable type registry backed by a map of option sets.
#[derive(Debug, Default)]
pub struct InMemoryVariableTypes {
    types: AHashMap<String, CustomTypeOptions>,
}

impl InMemoryVariableTypes {
    #[must_use]
    pub fn new() -> InMemoryVariableTypes {
        InMemoryVariableTypes::default()
    }

    #[must_use]
    pub fn with_type(
        mut self,
        variable_type: impl Into<String>,
        options: CustomTypeOptions,
    ) -> InMemoryVariableTypes {
        self.types.insert(variable_type.into(), options);
        self
    }
}

impl CustomVariableTypes for InMemoryVariableTypes {
    fn has_type(&self, variable_type: &str) -> bool {
        self.types.contains_key(variable_type)
    }

    fn options(&self, variable_type: &str) -> Option<CustomTypeOptions> {
        self.types.get(variable_type).cloned()
    }
}

/// A child export lookup backed by a map of `(child, export)` types.
#[derive(Debug, Default)]
pub struct InMemoryChildExports {
    exports: AHashMap<(String, String), ChildExportType>,
}

impl InMemoryChildExports {
    #[must_use]
    pub fn new() -> InMemoryChildExports {
        InMemoryChildExports::default()
    }

    #[must_use]
    pub fn with_export(
        mut self,
        child_name: impl Into<String>,
        export_name: impl Into<String>,
        export_type: ChildExportType,
    ) -> InMemoryChildExports {
        self.exports
            .insert((child_name.into(), export_name.into()), export_type);
        self
    }
}

impl ChildExportLookup for InMemoryChildExports {
    fn export_type(&self, child_name: &str, export_name: &str) -> Option<ChildExportType> {
        self.exports
            .get(&(child_name.to_owned(), export_name.to_owned()))
            .copied()
    }
}

/// No-op function registry: knows no functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFunctions;

impl FunctionRegistry for NoFunctions {
    fn has(&self, _name: &str) -> bool {
        false
    }

    fn signature(&self, _name: &str) -> Option<FunctionSignature> {
        None
    }
}

/// No-op resource registry: knows no resource types.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceRegistry for NoResources {
    fn has_type(&self, _resource_type: &str) -> bool {
        false
    }

    fn spec_definition(&self, _resource_type: &str) -> Option<Arc<ResourceSpecDefinition>> {
        None
    }
}

/// No-op data source registry: knows no data source types.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDataSources;

impl DataSourceRegistry for NoDataSources {
    fn has_type(&self, _source_type: &str) -> bool {
        false
    }

    fn spec_definition(&self, _source_type: &str) -> Option<Arc<DataSourceSpecDefinition>> {
        None
    }
}

/// No-op link registry: knows no link implementations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLinks;

impl LinkRegistry for NoLinks {
    fn has_link(&self, _resource_type_a: &str, _resource_type_b: &str) -> bool {
        false
    }

    fn annotation_definitions(
        &self,
        _resource_type_a: &str,
        _resource_type_b: &str,
    ) -> Option<Arc<AHashMap<String, LinkAnnotationDefinition>>> {
        None
    }
}

/// No-op custom variable type registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVariableTypes;

impl CustomVariableTypes for NoVariableTypes {
    fn has_type(&self, _variable_type: &str) -> bool {
        false
    }

    fn options(&self, _variable_type: &str) -> Option<CustomTypeOptions> {
        None
    }
}

/// No-op child export lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChildExports;

impl ChildExportLookup for NoChildExports {
    fn export_type(&self, _child_name: &str, _export_name: &str) -> Option<ChildExportType> {
        None
    }
}

pub(crate) static NO_FUNCTIONS: NoFunctions = NoFunctions;
pub(crate) static NO_RESOURCES: NoResources = NoResources;
pub(crate) static NO_DATA_SOURCES: NoDataSources = NoDataSources;
pub(crate) static NO_LINKS: NoLinks = NoLinks;
pub(crate) static NO_VARIABLE_TYPES: NoVariableTypes = NoVariableTypes;
pub(crate) static NO_CHILD_EXPORTS: NoChildExports = NoChildExports;
