//! Validation of resources: metadata, link selectors, dependencies,
//! templating (`each`), conditions, and the spec against the provider's
//! definition.
use crate::{
    blueprint::{LabelEntry, Resource, ResourceMetadata},
    defs::{validate_definition, Sinks},
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    refgraph::{self, ReferenceGraph},
    substitutions::{
        check::{
            check_assignable, check_mapping_substitutions, check_string_with_substitutions,
            contains_substitution, EdgeBuffer, SubScope,
        },
        ResolvedType, StringWithSubstitutions, Substitution,
    },
};

#[allow(clippy::too_many_arguments)]
pub(crate) fn validate_resource(
    name: &str,
    name_range: Option<SourceRange>,
    resource: &Resource,
    scope: &SubScope<'_>,
    graph: &ReferenceGraph,
    diags: &mut Diagnostics,
    edges: &mut EdgeBuffer,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let mut errors = Vec::new();

    if contains_substitution(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidResource,
            format!("${{..}} substitutions cannot be used in resource names: \"{name}\""),
            range,
        ));
    }

    let resource_type = &resource.resource_type.value;
    let type_range = resource.resource_type.range.unwrap_or(range);
    let type_known = scope.ctx.resources().has_type(resource_type);
    if !type_known {
        errors.push(LoadError::at(
            ReasonCode::InvalidResource,
            format!(
                "resource type \"{resource_type}\" is not supported by any loaded \
                 provider"
            ),
            type_range,
        ));
    }

    if let Some(metadata) = &resource.metadata {
        validate_metadata(name, metadata, range, scope, diags, &mut errors, edges);
    }
    if let Some(selector) = &resource.link_selector {
        check_label_entries(
            &selector.by_label,
            "link selector label",
            range,
            &mut errors,
        );
    }
    validate_depends_on(name, resource, range, scope, &mut errors, edges);
    if let Some(condition) = &resource.condition {
        validate_condition(name, condition, range, scope, diags, &mut errors, edges);
    }
    if let Some(each) = &resource.each {
        validate_each(name, each, range, scope, graph, diags, &mut errors, edges);
    }

    if type_known {
        validate_spec(name, resource, range, scope, diags, &mut errors, edges);
        diags.extend(scope.ctx.resources().custom_validate(
            resource_type,
            resource,
            scope.ctx.params(),
        ));
    }
    errors
}

fn validate_metadata(
    name: &str,
    metadata: &ResourceMetadata,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let metadata_range = metadata.range.unwrap_or(range);
    if let Some(display_name) = &metadata.display_name {
        let resolved = check_string_with_substitutions(
            display_name,
            metadata_range,
            scope,
            diags,
            errors,
            edges,
        );
        let subject = format!("the display name of resource \"{name}\"");
        if !check_assignable(resolved, ResolvedType::String, &subject, metadata_range, diags) {
            errors.push(LoadError::at(
                ReasonCode::InvalidResource,
                format!("{subject} must resolve to a string, not {resolved}"),
                metadata_range,
            ));
        }
    }
    for annotation in &metadata.annotations {
        let key_range = annotation.key_range.unwrap_or(metadata_range);
        if contains_substitution(&annotation.key) {
            errors.push(LoadError::at(
                ReasonCode::MappingNodeKeyContainsSubstitution,
                format!(
                    "annotation key \"{}\" of resource \"{name}\" must not contain \
                     substitutions",
                    annotation.key
                ),
                key_range,
            ));
            continue;
        }
        match &annotation.value {
            MappingNode::Scalar { .. } | MappingNode::Null { .. } => {}
            MappingNode::Interpolation { value, .. } => {
                check_string_with_substitutions(value, key_range, scope, diags, errors, edges);
            }
            other => errors.push(LoadError::at(
                ReasonCode::InvalidResource,
                format!(
                    "the annotation \"{}\" of resource \"{name}\" must be a scalar, \
                     but {} was provided",
                    annotation.key,
                    other.type_tag()
                ),
                key_range,
            )),
        }
    }
    check_label_entries(&metadata.labels, "label", metadata_range, errors);
    if let Some(custom) = &metadata.custom {
        check_mapping_substitutions(custom, metadata_range, 0, scope, diags, errors, edges);
    }
}

/// Label keys and values are identifier-position strings; substitutions are
/// banned on both sides.
fn check_label_entries(
    labels: &[LabelEntry],
    what: &str,
    fallback: SourceRange,
    errors: &mut Vec<LoadError>,
) {
    for label in labels {
        if contains_substitution(&label.key) {
            errors.push(LoadError::at(
                ReasonCode::MappingNodeKeyContainsSubstitution,
                format!("{what} key \"{}\" must not contain substitutions", label.key),
                label.key_range.unwrap_or(fallback),
            ));
        }
        if contains_substitution(&label.value) {
            errors.push(LoadError::at(
                ReasonCode::MappingNodeKeyContainsSubstitution,
                format!(
                    "{what} value \"{}\" must not contain substitutions",
                    label.value
                ),
                label.value_range.unwrap_or(fallback),
            ));
        }
    }
}

fn validate_depends_on(
    name: &str,
    resource: &Resource,
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    for dependency in &resource.depends_on {
        let dependency_range = dependency.range.unwrap_or(range);
        if scope.blueprint.resources.contains(&dependency.value) {
            edges.record(
                &scope.element_id,
                refgraph::resource_id(&dependency.value),
                "dependsOn",
            );
        } else {
            errors.push(LoadError::at(
                ReasonCode::MissingResourceDependency,
                format!(
                    "resource \"{name}\" depends on \"{}\", which is not defined in \
                     this blueprint",
                    dependency.value
                ),
                dependency_range,
            ));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_condition(
    name: &str,
    condition: &StringWithSubstitutions,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let resolved =
        check_string_with_substitutions(condition, range, scope, diags, errors, edges);
    let subject = format!("the condition of resource \"{name}\"");
    if !check_assignable(resolved, ResolvedType::Boolean, &subject, range, diags) {
        errors.push(LoadError::at(
            ReasonCode::InvalidResource,
            format!("{subject} must resolve to a boolean, not {resolved}"),
            range,
        ));
    }
}

/// `each` must resolve to an array and must not depend on other resources
/// or child blueprints, directly or through named values, so that the
/// iteration source is derivable before any resource is deployed.
#[allow(clippy::too_many_arguments)]
fn validate_each(
    name: &str,
    each: &StringWithSubstitutions,
    range: SourceRange,
    scope: &SubScope<'_>,
    graph: &ReferenceGraph,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let resolved = check_string_with_substitutions(each, range, scope, diags, errors, edges);
    let subject = format!("the each expression of resource \"{name}\"");
    if !check_assignable(resolved, ResolvedType::Array, &subject, range, diags) {
        errors.push(LoadError::at(
            ReasonCode::InvalidResource,
            format!("{subject} must resolve to an array, not {resolved}"),
            range,
        ));
    }

    for substitution in each.substitutions() {
        substitution.walk(&mut |nested: &Substitution| {
            let Some(target) = nested.referenced_element_id() else {
                return;
            };
            let nested_range = nested.range().unwrap_or(range);
            if target.starts_with("resources.") {
                errors.push(each_dependency_error(
                    name,
                    &target,
                    ReasonCode::EachResourceDependency,
                    nested_range,
                ));
            } else if target.starts_with("children.") {
                errors.push(each_dependency_error(
                    name,
                    &target,
                    ReasonCode::EachChildDependency,
                    nested_range,
                ));
            } else if target.starts_with("values.") {
                // Named values can themselves reference resources or
                // children; values are validated before resources, so their
                // edges are already in the graph.
                if let Some(hit) =
                    graph.find_reachable(&target, |id| id.starts_with("resources."))
                {
                    errors.push(each_dependency_error(
                        name,
                        &hit,
                        ReasonCode::EachResourceDependency,
                        nested_range,
                    ));
                }
                if let Some(hit) =
                    graph.find_reachable(&target, |id| id.starts_with("children."))
                {
                    errors.push(each_dependency_error(
                        name,
                        &hit,
                        ReasonCode::EachChildDependency,
                        nested_range,
                    ));
                }
            }
        });
    }
}

fn each_dependency_error(
    name: &str,
    target: &str,
    reason: ReasonCode,
    range: SourceRange,
) -> LoadError {
    LoadError::at(
        reason,
        format!(
            "the each expression of resource \"{name}\" must not depend on \
             \"{target}\"; iteration sources must be derivable before deployment"
        ),
        range,
    )
}

#[allow(clippy::too_many_arguments)]
fn validate_spec(
    name: &str,
    resource: &Resource,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let resource_type = &resource.resource_type.value;
    let type_range = resource.resource_type.range.unwrap_or(range);
    let Some(definition) = scope.ctx.resources().spec_definition(resource_type) else {
        errors.push(LoadError::at(
            ReasonCode::ResourceTypeSpecDefMissing,
            format!(
                "no spec definition is available for the resource type \
                 \"{resource_type}\" of resource \"{name}\""
            ),
            type_range,
        ));
        return;
    };
    let Some(schema) = definition.schema.as_ref() else {
        errors.push(LoadError::at(
            ReasonCode::ResourceTypeSpecDefMissingSchema,
            format!(
                "the spec definition for the resource type \"{resource_type}\" of \
                 resource \"{name}\" has no schema"
            ),
            type_range,
        ));
        return;
    };
    let path = ElementPath::root("resources", name).child("spec");
    let mut sinks = Sinks {
        diags,
        errors,
        edges,
    };
    validate_definition(&resource.spec, schema, &path, range, 0, scope, &mut sinks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Blueprint, LinkSelector, StringField, Value, ValueType},
        context::ValidationContext,
        mapping::MappingEntry,
        registry::InMemoryResourceRegistry,
        schema::{DefinitionSchema, ResourceSpecDefinition},
        substitutions::{PathSegment, ResourceProperty},
    };

    const TABLE_TYPE: &str = "aws/dynamodb/table";

    fn registry() -> InMemoryResourceRegistry {
        InMemoryResourceRegistry::new().with_type(
            TABLE_TYPE,
            ResourceSpecDefinition::new(DefinitionSchema::object(
                vec![("tableName", DefinitionSchema::plain_string())],
                vec!["tableName"],
            )),
        )
    }

    fn table_resource() -> Resource {
        Resource::new(TABLE_TYPE).with_spec(MappingNode::object(vec![MappingEntry::new(
            "tableName",
            MappingNode::scalar("orders"),
        )]))
    }

    fn run(name: &str, resource: &Resource, blueprint: &Blueprint) -> Vec<LoadError> {
        let registry = registry();
        let ctx = ValidationContext::builder()
            .with_resources(&registry)
            .build();
        run_with_ctx(name, resource, blueprint, &ctx)
    }

    fn run_with_ctx(
        name: &str,
        resource: &Resource,
        blueprint: &Blueprint,
        ctx: &ValidationContext<'_>,
    ) -> Vec<LoadError> {
        let scope = SubScope::new(blueprint, ctx, refgraph::resource_id(name))
            .templated(resource.is_templated());
        let graph = ReferenceGraph::new();
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();
        validate_resource(name, None, resource, &scope, &graph, &mut diags, &mut edges)
    }

    fn blueprint_with(name: &str, resource: Resource) -> Blueprint {
        let mut blueprint = Blueprint::new("2023-04-20");
        blueprint.resources.push(name, resource);
        blueprint
    }

    #[test]
    fn well_formed_resource_passes() {
        let resource = table_resource();
        let blueprint = blueprint_with("orders", resource.clone());
        let errors = run("orders", &resource, &blueprint);
        assert!(errors.is_empty(), "errors: {errors:?}");
    }

    #[test]
    fn unknown_resource_type() {
        let resource = Resource::new("aws/unknown");
        let blueprint = blueprint_with("orders", resource.clone());
        let errors = run("orders", &resource, &blueprint);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::InvalidResource);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let mut resource = table_resource();
        resource.depends_on.push(StringField::new("ghost"));
        let blueprint = blueprint_with("orders", resource.clone());
        let errors = run("orders", &resource, &blueprint);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::MissingResourceDependency);
    }

    #[test]
    fn each_referencing_a_resource_is_rejected() {
        let mut resource = table_resource();
        resource.each = Some(StringWithSubstitutions::substitution(
            Substitution::Resource {
                name: "other".to_owned(),
                property: ResourceProperty::Spec(vec![PathSegment::Field(
                    "tableName".to_owned(),
                )]),
                range: None,
            },
        ));
        let mut blueprint = blueprint_with("orders", resource.clone());
        blueprint.resources.push("other", table_resource());
        let errors = run("orders", &resource, &blueprint);
        assert!(errors
            .iter()
            .any(|error| error.reason == ReasonCode::EachResourceDependency));
    }

    #[test]
    fn each_transitively_reaching_a_resource_is_rejected() {
        let mut resource = table_resource();
        resource.each = Some(StringWithSubstitutions::substitution(Substitution::Value {
            name: "tables".to_owned(),
            path: Vec::new(),
            range: None,
        }));
        let mut blueprint = blueprint_with("orders", resource.clone());
        blueprint.resources.push("other", table_resource());
        blueprint.values.push(
            "tables",
            Value::new(ValueType::Array, MappingNode::array(vec![])),
        );

        let registry = registry();
        let ctx = ValidationContext::builder()
            .with_resources(&registry)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, refgraph::resource_id("orders"))
            .templated(true);
        // Simulate the orchestrator having already collected the value's
        // reference to the other resource.
        let mut graph = ReferenceGraph::new();
        graph.add_reference("values.tables", "resources.other", "substitution");
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();
        let errors = validate_resource(
            "orders",
            None,
            &resource,
            &scope,
            &graph,
            &mut diags,
            &mut edges,
        );
        assert!(errors
            .iter()
            .any(|error| error.reason == ReasonCode::EachResourceDependency));
    }

    #[test]
    fn labels_and_selectors_reject_substitutions() {
        let mut resource = table_resource();
        let mut metadata = ResourceMetadata::default();
        metadata
            .labels
            .push(LabelEntry::new("app", "${variables.app}"));
        resource.metadata = Some(metadata);
        let mut selector = LinkSelector::default();
        selector
            .by_label
            .push(LabelEntry::new("${variables.key}", "orders"));
        resource.link_selector = Some(selector);
        let blueprint = blueprint_with("orders", resource.clone());
        let errors = run("orders", &resource, &blueprint);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|error| error.reason == ReasonCode::MappingNodeKeyContainsSubstitution));
    }

    #[test]
    fn spec_definition_gaps_are_distinct_errors() {
        let resource = Resource::new(TABLE_TYPE);
        let blueprint = blueprint_with("orders", resource.clone());

        let registry =
            InMemoryResourceRegistry::new().with_type(TABLE_TYPE, ResourceSpecDefinition::default());
        let ctx = ValidationContext::builder()
            .with_resources(&registry)
            .build();
        let errors = run_with_ctx("orders", &resource, &blueprint, &ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].reason,
            ReasonCode::ResourceTypeSpecDefMissingSchema
        );
    }

    #[test]
    fn non_scalar_annotation_is_rejected() {
        let mut resource = table_resource();
        let mut metadata = ResourceMetadata::default();
        metadata.annotations.push(MappingEntry::new(
            "aws.lambda.dynamodb.accessType",
            MappingNode::array(vec![MappingNode::scalar("read")]),
        ));
        resource.metadata = Some(metadata);
        let blueprint = blueprint_with("orders", resource.clone());
        let errors = run("orders", &resource, &blueprint);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must be a scalar"));
    }
}
