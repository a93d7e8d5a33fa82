//! The validation context: registries, parameters, and cancellation.
//!
//! The validator depends only on the capability traits defined here;
//! concrete providers live behind them. [`crate::registry`] ships in-memory
//! implementations for tests and embedders that assemble provider data
//! programmatically.
use crate::{
    blueprint::{Blueprint, DataSource, Resource},
    diagnostics::Diagnostic,
    scalar::{ScalarKind, ScalarValue},
    schema::{
        CustomTypeOptions, DataSourceSpecDefinition, FilterFieldDefinition,
        LinkAnnotationDefinition, ResourceSpecDefinition,
    },
    substitutions::FunctionSignature,
};
use ahash::AHashMap;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Registry of substitution functions.
pub trait FunctionRegistry: Send + Sync {
    fn has(&self, name: &str) -> bool;
    fn signature(&self, name: &str) -> Option<FunctionSignature>;
}

/// Registry of resource types and their spec definitions.
pub trait ResourceRegistry: Send + Sync {
    fn has_type(&self, resource_type: &str) -> bool;
    fn spec_definition(&self, resource_type: &str) -> Option<Arc<ResourceSpecDefinition>>;
    /// Provider-specific checks run after structural validation; the
    /// returned diagnostics are merged into the run's buffer.
    fn custom_validate(
        &self,
        resource_type: &str,
        resource: &Resource,
        params: &ValidationParams,
    ) -> Vec<Diagnostic> {
        let _ = (resource_type, resource, params);
        Vec::new()
    }
}

/// Registry of data source types.
pub trait DataSourceRegistry: Send + Sync {
    fn has_type(&self, source_type: &str) -> bool;
    fn spec_definition(&self, source_type: &str) -> Option<Arc<DataSourceSpecDefinition>>;
    fn filter_fields(&self, source_type: &str) -> AHashMap<String, FilterFieldDefinition> {
        let _ = source_type;
        AHashMap::new()
    }
    fn custom_validate(
        &self,
        source_type: &str,
        data_source: &DataSource,
        params: &ValidationParams,
    ) -> Vec<Diagnostic> {
        let _ = (source_type, data_source, params);
        Vec::new()
    }
}

/// Registry of link implementations between pairs of resource types.
pub trait LinkRegistry: Send + Sync {
    fn has_link(&self, resource_type_a: &str, resource_type_b: &str) -> bool;
    fn annotation_definitions(
        &self,
        resource_type_a: &str,
        resource_type_b: &str,
    ) -> Option<Arc<AHashMap<String, LinkAnnotationDefinition>>>;
}

/// Registry of provider-declared custom variable types.
pub trait CustomVariableTypes: Send + Sync {
    fn has_type(&self, variable_type: &str) -> bool;
    /// Load the option set for a type. This is a suspension point: the
    /// options may come from a provider process.
    fn options(&self, variable_type: &str) -> Option<CustomTypeOptions>;
}

/// The declared type of a child blueprint export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExportType {
    Scalar(ScalarKind),
    Array,
    Object,
}

/// Lookup of export types declared by child blueprints.
pub trait ChildExportLookup: Send + Sync {
    fn export_type(&self, child_name: &str, export_name: &str) -> Option<ChildExportType>;
}

/// Supplies the working directory used to resolve relative include paths.
pub trait WorkingDirProvider: Send + Sync {
    fn cwd(&self) -> PathBuf;
}

/// Result of probing a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStat {
    Absent,
    File,
    Directory,
}

/// Probes the filesystem for include paths.
pub trait FileProbe: Send + Sync {
    fn stat(&self, path: &Path) -> FileStat;
}

/// [`WorkingDirProvider`] backed by the process working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsWorkingDir;

impl WorkingDirProvider for OsWorkingDir {
    fn cwd(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// [`FileProbe`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileProbe;

impl FileProbe for OsFileProbe {
    fn stat(&self, path: &Path) -> FileStat {
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => FileStat::Directory,
            Ok(_) => FileStat::File,
            Err(_) => FileStat::Absent,
        }
    }
}

/// Read-only configuration for one validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidationParams {
    /// User-supplied variable values, overriding declared defaults.
    pub blueprint_variables: AHashMap<String, ScalarValue>,
    /// Passed through to registry calls, opaque to validation.
    pub context_variables: AHashMap<String, ScalarValue>,
    /// Passed through to registry calls, opaque to validation.
    pub provider_context: AHashMap<String, String>,
}

impl ValidationParams {
    #[must_use]
    pub fn new() -> ValidationParams {
        ValidationParams::default()
    }

    #[must_use]
    pub fn with_blueprint_variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> ValidationParams {
        self.blueprint_variables.insert(name.into(), value.into());
        self
    }
}

/// Cooperative cancellation handle threaded through every traversal.
///
/// Cloning shares the underlying flag. Checks happen at collection
/// boundaries; a cancelled run returns the diagnostics collected so far
/// plus a `cancelled` sentinel error.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Everything a validation run consults besides the blueprint itself.
pub struct ValidationContext<'a> {
    functions: &'a dyn FunctionRegistry,
    resources: &'a dyn ResourceRegistry,
    data_sources: &'a dyn DataSourceRegistry,
    links: &'a dyn LinkRegistry,
    variable_types: &'a dyn CustomVariableTypes,
    child_exports: &'a dyn ChildExportLookup,
    child_blueprints: AHashMap<String, Blueprint>,
    working_dir: &'a dyn WorkingDirProvider,
    files: &'a dyn FileProbe,
    params: ValidationParams,
    cancellation: CancellationToken,
}

impl<'a> ValidationContext<'a> {
    /// A builder starting from no-op registries and OS-backed filesystem
    /// providers.
    #[must_use]
    pub fn builder() -> ValidationContextBuilder<'a> {
        ValidationContextBuilder::default()
    }

    #[must_use]
    pub fn functions(&self) -> &dyn FunctionRegistry {
        self.functions
    }

    #[must_use]
    pub fn resources(&self) -> &dyn ResourceRegistry {
        self.resources
    }

    #[must_use]
    pub fn data_sources(&self) -> &dyn DataSourceRegistry {
        self.data_sources
    }

    #[must_use]
    pub fn links(&self) -> &dyn LinkRegistry {
        self.links
    }

    #[must_use]
    pub fn variable_types(&self) -> &dyn CustomVariableTypes {
        self.variable_types
    }

    #[must_use]
    pub fn child_exports(&self) -> &dyn ChildExportLookup {
        self.child_exports
    }

    /// The parsed child blueprint for an include, when it has already been
    /// loaded by the embedder. Variable passing is only checked when the
    /// child is available.
    #[must_use]
    pub fn child_blueprint(&self, include_name: &str) -> Option<&Blueprint> {
        self.child_blueprints.get(include_name)
    }

    #[must_use]
    pub fn working_dir(&self) -> &dyn WorkingDirProvider {
        self.working_dir
    }

    #[must_use]
    pub fn files(&self) -> &dyn FileProbe {
        self.files
    }

    #[must_use]
    pub fn params(&self) -> &ValidationParams {
        &self.params
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Builder for [`ValidationContext`].
pub struct ValidationContextBuilder<'a> {
    functions: Option<&'a dyn FunctionRegistry>,
    resources: Option<&'a dyn ResourceRegistry>,
    data_sources: Option<&'a dyn DataSourceRegistry>,
    links: Option<&'a dyn LinkRegistry>,
    variable_types: Option<&'a dyn CustomVariableTypes>,
    child_exports: Option<&'a dyn ChildExportLookup>,
    child_blueprints: AHashMap<String, Blueprint>,
    working_dir: Option<&'a dyn WorkingDirProvider>,
    files: Option<&'a dyn FileProbe>,
    params: ValidationParams,
    cancellation: CancellationToken,
}

impl Default for ValidationContextBuilder<'_> {
    fn default() -> Self {
        ValidationContextBuilder {
            functions: None,
            resources: None,
            data_sources: None,
            links: None,
            variable_types: None,
            child_exports: None,
            child_blueprints: AHashMap::new(),
            working_dir: None,
            files: None,
            params: ValidationParams::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

impl<'a> ValidationContextBuilder<'a> {
    #[must_use]
    pub fn with_functions(mut self, functions: &'a dyn FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: &'a dyn ResourceRegistry) -> Self {
        self.resources = Some(resources);
        self
    }

    #[must_use]
    pub fn with_data_sources(mut self, data_sources: &'a dyn DataSourceRegistry) -> Self {
        self.data_sources = Some(data_sources);
        self
    }

    #[must_use]
    pub fn with_links(mut self, links: &'a dyn LinkRegistry) -> Self {
        self.links = Some(links);
        self
    }

    #[must_use]
    pub fn with_variable_types(mut self, variable_types: &'a dyn CustomVariableTypes) -> Self {
        self.variable_types = Some(variable_types);
        self
    }

    #[must_use]
    pub fn with_child_exports(mut self, child_exports: &'a dyn ChildExportLookup) -> Self {
        self.child_exports = Some(child_exports);
        self
    }

    #[must_use]
    pub fn with_child_blueprint(mut self, name: impl Into<String>, blueprint: Blueprint) -> Self {
        self.child_blueprints.insert(name.into(), blueprint);
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, working_dir: &'a dyn WorkingDirProvider) -> Self {
        self.working_dir = Some(working_dir);
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: &'a dyn FileProbe) -> Self {
        self.files = Some(files);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ValidationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn build(self) -> ValidationContext<'a> {
        ValidationContext {
            functions: self.functions.unwrap_or(&crate::registry::NO_FUNCTIONS),
            resources: self.resources.unwrap_or(&crate::registry::NO_RESOURCES),
            data_sources: self
                .data_sources
                .unwrap_or(&crate::registry::NO_DATA_SOURCES),
            links: self.links.unwrap_or(&crate::registry::NO_LINKS),
            variable_types: self
                .variable_types
                .unwrap_or(&crate::registry::NO_VARIABLE_TYPES),
            child_exports: self
                .child_exports
                .unwrap_or(&crate::registry::NO_CHILD_EXPORTS),
            child_blueprints: self.child_blueprints,
            working_dir: self.working_dir.unwrap_or(&OS_WORKING_DIR),
            files: self.files.unwrap_or(&OS_FILE_PROBE),
            params: self.params,
            cancellation: self.cancellation,
        }
    }
}

static OS_WORKING_DIR: OsWorkingDir = OsWorkingDir;
static OS_FILE_PROBE: OsFileProbe = OsFileProbe;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn builder_defaults_are_usable() {
        let ctx = ValidationContext::builder().build();
        assert!(!ctx.functions().has("trim"));
        assert!(!ctx.resources().has_type("aws/dynamodb/table"));
        assert!(ctx.child_blueprint("anything").is_none());
        assert!(!ctx.cancellation().is_cancelled());
    }

    #[test]
    fn os_file_probe_distinguishes_kinds() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(OsFileProbe.stat(dir.path()), FileStat::Directory);
        let file_path = dir.path().join("blueprint.yaml");
        std::fs::write(&file_path, "content").expect("write file");
        assert_eq!(OsFileProbe.stat(&file_path), FileStat::File);
        assert_eq!(
            OsFileProbe.stat(&dir.path().join("missing.yaml")),
            FileStat::Absent
        );
    }
}
