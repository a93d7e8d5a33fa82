//! Name resolution and type inference for substitutions.
//!
//! Resolution never fails fast: a substitution that cannot be resolved
//! pushes an error and degrades to `any` so sibling checks continue. Every
//! *successful* reference records an edge in the element's edge buffer;
//! failed resolutions record nothing, and union branch rollback discards
//! edges from branches that did not match.
use crate::{
    blueprint::Blueprint,
    context::{ChildExportType, ValidationContext},
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    positions::SourceRange,
    refgraph::{self, ReferenceGraph},
    schema::{DefinitionKind, DefinitionSchema},
    substitutions::{
        functions::check_function_call, ElemRefKind, MetadataProperty, PathSegment, ResolvedType,
        ResourceProperty, StringWithSubstitutions, Substitution,
    },
};

/// A reference edge buffered while an element is being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
    pub from: String,
    pub to: String,
    pub tag: &'static str,
}

/// Buffered reference edges for one element, merged into the graph after
/// the element's checks finish. `oneOf` branches run against scratch
/// buffers that are absorbed only when the branch matches.
#[derive(Debug, Default)]
pub(crate) struct EdgeBuffer {
    edges: Vec<Edge>,
}

impl EdgeBuffer {
    pub(crate) fn new() -> EdgeBuffer {
        EdgeBuffer::default()
    }

    pub(crate) fn record(&mut self, from: &str, to: String, tag: &'static str) {
        self.edges.push(Edge {
            from: from.to_owned(),
            to,
            tag,
        });
    }

    /// Move the other buffer's edges into this one.
    pub(crate) fn absorb(&mut self, other: &mut EdgeBuffer) {
        self.edges.append(&mut other.edges);
    }

    pub(crate) fn merge_into(&self, graph: &mut ReferenceGraph) {
        for edge in &self.edges {
            graph.add_reference(&edge.from, &edge.to, edge.tag);
        }
    }
}

/// The lexical scope a substitution is checked in.
pub(crate) struct SubScope<'a> {
    pub blueprint: &'a Blueprint,
    pub ctx: &'a ValidationContext<'a>,
    /// Stable ID of the enclosing element, e.g. `resources.orders`.
    pub element_id: String,
    /// Whether the enclosing element is a resource with `each` defined.
    pub in_templated_resource: bool,
}

impl<'a> SubScope<'a> {
    pub(crate) fn new(
        blueprint: &'a Blueprint,
        ctx: &'a ValidationContext<'a>,
        element_id: String,
    ) -> SubScope<'a> {
        SubScope {
            blueprint,
            ctx,
            element_id,
            in_templated_resource: false,
        }
    }

    pub(crate) fn templated(mut self, in_templated_resource: bool) -> SubScope<'a> {
        self.in_templated_resource = in_templated_resource;
        self
    }
}

/// Check whether `actual` can stand where `expected` is required.
///
/// `any` is assignable to everything but emits the mandatory warning;
/// integers promote to floats.
pub(crate) fn check_assignable(
    actual: ResolvedType,
    expected: ResolvedType,
    subject: &str,
    range: SourceRange,
    diags: &mut Diagnostics,
) -> bool {
    if actual == expected || expected == ResolvedType::Any {
        return true;
    }
    if actual == ResolvedType::Any {
        diags.warning(
            format!(
                "{subject} resolves to type any and cannot be verified against \
                 the expected type {expected} at this stage"
            ),
            range,
        );
        return true;
    }
    actual == ResolvedType::Integer && expected == ResolvedType::Float
}

/// Warning for an index applied to an array whose length is not knowable
/// at validation time.
pub(crate) fn warn_unsized_array_index(
    index: usize,
    subject: &str,
    range: SourceRange,
    diags: &mut Diagnostics,
) {
    diags.warning(
        format!("index {index} applied to {subject} cannot be validated at this stage"),
        range,
    );
}

/// Type an interpolated string or pass through the type of its lone
/// substitution.
pub(crate) fn check_string_with_substitutions(
    value: &StringWithSubstitutions,
    parent: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    if let Some(substitution) = value.single_substitution() {
        return resolve_substitution(substitution, parent, scope, diags, errors, edges);
    }
    for substitution in value.substitutions() {
        let range = substitution.range().unwrap_or_else(|| parent.as_approximate());
        let resolved = resolve_substitution(substitution, parent, scope, diags, errors, edges);
        match resolved {
            ResolvedType::Array | ResolvedType::Object => diags.warning(
                format!(
                    "substitution used in string interpolation resolves to {resolved} \
                     and may not render as text"
                ),
                range,
            ),
            ResolvedType::Any => diags.warning(
                "substitution used in string interpolation resolves to type any and \
                 cannot be verified at this stage",
                range,
            ),
            _ => {}
        }
    }
    ResolvedType::String
}

/// Resolve one substitution to its type, recording a reference edge when
/// the target exists.
pub(crate) fn resolve_substitution(
    substitution: &Substitution,
    parent: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let range = substitution.range().unwrap_or_else(|| parent.as_approximate());
    match substitution {
        Substitution::Literal { value, .. } => ResolvedType::from_scalar_kind(value.kind()),
        Substitution::Variable { name, .. } => {
            resolve_variable(name, range, scope, errors, edges)
        }
        Substitution::Value { name, path, .. } => {
            resolve_value(name, path, range, scope, diags, errors, edges)
        }
        Substitution::Resource { name, property, .. } => {
            resolve_resource(name, property, range, scope, diags, errors, edges)
        }
        Substitution::DataSource {
            name, field, index, ..
        } => resolve_data_source(name, field, *index, range, scope, diags, errors, edges),
        Substitution::Child {
            name, export, path, ..
        } => resolve_child(name, export, path, range, scope, errors, edges),
        Substitution::ElemRef { kind, .. } => resolve_elem_ref(kind, range, scope, errors),
        Substitution::Function(call) => {
            check_function_call(call, parent, scope, diags, errors, edges)
        }
    }
}

fn self_reference_error(element_id: &str, range: SourceRange) -> LoadError {
    LoadError::at(
        ReasonCode::InvalidReference,
        format!("\"{element_id}\" cannot reference itself"),
        range,
    )
}

fn resolve_variable(
    name: &str,
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let id = refgraph::variable_id(name);
    if id == scope.element_id {
        errors.push(self_reference_error(&id, range));
        return ResolvedType::Any;
    }
    let Some(variable) = scope.blueprint.variables.get(name) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("variable \"{name}\" is not defined in this blueprint"),
            range,
        ));
        return ResolvedType::Any;
    };
    edges.record(&scope.element_id, id, "substitution");
    match variable.var_type.core_kind() {
        Some(kind) => ResolvedType::from_scalar_kind(kind),
        None => {
            // Custom variable type: the shared kind of its options, when
            // the option set is loadable and uniform.
            let custom_type = variable.var_type.to_string();
            scope
                .ctx
                .variable_types()
                .options(&custom_type)
                .and_then(|options| options.uniform_kind())
                .map_or(ResolvedType::Any, ResolvedType::from_scalar_kind)
        }
    }
}

fn resolve_value(
    name: &str,
    path: &[PathSegment],
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let id = refgraph::value_id(name);
    if id == scope.element_id {
        errors.push(self_reference_error(&id, range));
        return ResolvedType::Any;
    }
    let Some(value) = scope.blueprint.values.get(name) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("value \"{name}\" is not defined in this blueprint"),
            range,
        ));
        return ResolvedType::Any;
    };
    edges.record(&scope.element_id, id, "substitution");
    let known_len = match &value.content {
        crate::mapping::MappingNode::Array { items, .. } => Some(items.len()),
        _ => None,
    };
    navigate_declared_type(
        value.value_type.resolved(),
        path,
        known_len,
        &format!("value \"{name}\""),
        range,
        diags,
        errors,
    )
}

/// Walk a property path over a declared (not schema-backed) type. Element
/// and field types beyond the first step are unknown, so any successful
/// navigation yields `any`.
fn navigate_declared_type(
    declared: ResolvedType,
    path: &[PathSegment],
    known_len: Option<usize>,
    subject: &str,
    range: SourceRange,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
) -> ResolvedType {
    let Some(first) = path.first() else {
        return declared;
    };
    match (first, declared) {
        (PathSegment::Index(index), ResolvedType::Array) => {
            match known_len {
                Some(len) if *index >= len => diags.warning(
                    format!(
                        "index {index} applied to {subject} is out of bounds for an \
                         array of length {len}"
                    ),
                    range,
                ),
                Some(_) => {}
                None => warn_unsized_array_index(*index, subject, range, diags),
            }
            ResolvedType::Any
        }
        (PathSegment::Field(_), ResolvedType::Object) => ResolvedType::Any,
        (_, ResolvedType::Any) => ResolvedType::Any,
        (PathSegment::Index(_), other) => {
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                format!("cannot index into {subject} of type {other}"),
                range,
            ));
            ResolvedType::Any
        }
        (PathSegment::Field(field), other) => {
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                format!("cannot access field \"{field}\" on {subject} of type {other}"),
                range,
            ));
            ResolvedType::Any
        }
    }
}

fn resolve_resource(
    name: &str,
    property: &ResourceProperty,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let id = refgraph::resource_id(name);
    if id == scope.element_id {
        errors.push(self_reference_error(&id, range));
        return ResolvedType::Any;
    }
    let Some(resource) = scope.blueprint.resources.get(name) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("resource \"{name}\" is not defined in this blueprint"),
            range,
        ));
        return ResolvedType::Any;
    };
    edges.record(&scope.element_id, id, "substitution");
    match property {
        ResourceProperty::Whole => ResolvedType::Object,
        ResourceProperty::Spec(path) => resolve_resource_spec_path(
            name,
            &resource.resource_type.value,
            path,
            range,
            scope,
            diags,
            errors,
        ),
        ResourceProperty::Metadata(metadata) => match metadata {
            MetadataProperty::DisplayName | MetadataProperty::Label(_) => ResolvedType::String,
            MetadataProperty::Annotation(_) | MetadataProperty::Custom(_) => ResolvedType::Any,
        },
        ResourceProperty::ElemItem(_) | ResourceProperty::ElemIndex => {
            let mut valid = true;
            if !scope.in_templated_resource {
                errors.push(LoadError::at(
                    ReasonCode::InvalidSubstitution,
                    format!(
                        "element reference to resource \"{name}\" can only be used \
                         within a resource that defines each"
                    ),
                    range,
                ));
                valid = false;
            }
            if !resource.is_templated() {
                errors.push(LoadError::at(
                    ReasonCode::InvalidSubstitution,
                    format!(
                        "resource \"{name}\" does not define each, so its elements \
                         cannot be referenced"
                    ),
                    range,
                ));
                valid = false;
            }
            match property {
                ResourceProperty::ElemIndex if valid => ResolvedType::Integer,
                _ => ResolvedType::Any,
            }
        }
    }
}

fn resolve_resource_spec_path(
    name: &str,
    resource_type: &str,
    path: &[PathSegment],
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
) -> ResolvedType {
    let definition = scope.ctx.resources().spec_definition(resource_type);
    let Some(definition) = definition else {
        diags.warning(
            format!(
                "cannot verify the spec reference to resource \"{name}\": no spec \
                 definition is available for type \"{resource_type}\""
            ),
            range,
        );
        return ResolvedType::Any;
    };
    let Some(schema) = definition.schema.as_ref() else {
        diags.warning(
            format!(
                "cannot verify the spec reference to resource \"{name}\": the spec \
                 definition for type \"{resource_type}\" has no schema"
            ),
            range,
        );
        return ResolvedType::Any;
    };
    navigate_definition(schema, path, name, range, diags, errors)
}

/// Walk a property path through a provider schema, erroring on unknown
/// attributes and computed-only fields.
fn navigate_definition(
    schema: &DefinitionSchema,
    path: &[PathSegment],
    resource_name: &str,
    range: SourceRange,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
) -> ResolvedType {
    let mut current = schema;
    let mut traversed = String::from("spec");
    for segment in path {
        match (&current.kind, segment) {
            (DefinitionKind::Object { attributes, .. }, PathSegment::Field(field)) => {
                match attributes.get(field.as_str()) {
                    Some(next) => current = next,
                    None => {
                        errors.push(LoadError::at(
                            ReasonCode::InvalidReference,
                            format!(
                                "property \"{traversed}.{field}\" does not exist in the \
                                 spec of resource \"{resource_name}\""
                            ),
                            range,
                        ));
                        return ResolvedType::Any;
                    }
                }
            }
            (DefinitionKind::Map { values, .. }, PathSegment::Field(_)) => current = values,
            (DefinitionKind::Array { items, .. }, PathSegment::Index(index)) => {
                warn_unsized_array_index(
                    *index,
                    &format!("\"{traversed}\" of resource \"{resource_name}\""),
                    range,
                    diags,
                );
                current = items;
            }
            (DefinitionKind::Union { .. }, _) => {
                // Union fields cannot be narrowed statically.
                return ResolvedType::Any;
            }
            (_, segment) => {
                errors.push(LoadError::at(
                    ReasonCode::InvalidReference,
                    format!(
                        "\"{traversed}\" of resource \"{resource_name}\" is a {} and \
                         cannot be navigated with \"{segment}\"",
                        current.kind.type_name()
                    ),
                    range,
                ));
                return ResolvedType::Any;
            }
        }
        match segment {
            PathSegment::Field(field) => {
                traversed.push('.');
                traversed.push_str(field);
            }
            PathSegment::Index(index) => {
                traversed.push('[');
                traversed.push_str(itoa::Buffer::new().format(*index));
                traversed.push(']');
            }
        }
    }
    if current.computed {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!(
                "\"{traversed}\" of resource \"{resource_name}\" is computed and only \
                 available after deployment"
            ),
            range,
        ));
        return ResolvedType::Any;
    }
    current.kind.resolved_type()
}

fn resolve_data_source(
    name: &str,
    field: &str,
    index: Option<usize>,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let id = refgraph::data_source_id(name);
    if id == scope.element_id {
        errors.push(self_reference_error(&id, range));
        return ResolvedType::Any;
    }
    let Some(data_source) = scope.blueprint.data_sources.get(name) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("data source \"{name}\" is not defined in this blueprint"),
            range,
        ));
        return ResolvedType::Any;
    };
    edges.record(&scope.element_id, id, "substitution");
    let Some(export) = data_source.exports.get(field) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("data source \"{name}\" does not declare an export named \"{field}\""),
            range,
        ));
        return ResolvedType::Any;
    };
    let field_type = export.export_type.unwrap_or(ResolvedType::Any);
    match index {
        None => field_type,
        Some(index) => match field_type {
            ResolvedType::Array | ResolvedType::Any => {
                warn_unsized_array_index(
                    index,
                    &format!("export \"{field}\" of data source \"{name}\""),
                    range,
                    diags,
                );
                ResolvedType::Any
            }
            other => {
                errors.push(LoadError::at(
                    ReasonCode::InvalidSubstitution,
                    format!(
                        "index access on export \"{field}\" of data source \"{name}\" \
                         is only supported for array exports, not {other}"
                    ),
                    range,
                ));
                ResolvedType::Any
            }
        },
    }
}

fn resolve_child(
    name: &str,
    export: &str,
    path: &[PathSegment],
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let id = refgraph::child_id(name);
    if id == scope.element_id {
        errors.push(self_reference_error(&id, range));
        return ResolvedType::Any;
    }
    if !scope.blueprint.includes.contains(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidReference,
            format!("child blueprint \"{name}\" is not included in this blueprint"),
            range,
        ));
        return ResolvedType::Any;
    }
    edges.record(&scope.element_id, id, "substitution");
    match scope.ctx.child_exports().export_type(name, export) {
        None => {
            errors.push(LoadError::at(
                ReasonCode::ChildExportNotFound,
                format!("child blueprint \"{name}\" does not export \"{export}\""),
                range,
            ));
            ResolvedType::Any
        }
        Some(ChildExportType::Scalar(kind)) => {
            if path.is_empty() {
                ResolvedType::from_scalar_kind(kind)
            } else {
                errors.push(LoadError::at(
                    ReasonCode::ChildExportScalarNavigation,
                    format!(
                        "export \"{export}\" of child blueprint \"{name}\" is a \
                         {} and cannot be navigated into",
                        kind
                    ),
                    range,
                ));
                ResolvedType::Any
            }
        }
        Some(ChildExportType::Array) => {
            if path.is_empty() {
                ResolvedType::Array
            } else {
                // Structure beyond the export's own type is not declared.
                ResolvedType::Any
            }
        }
        Some(ChildExportType::Object) => {
            if path.is_empty() {
                ResolvedType::Object
            } else {
                ResolvedType::Any
            }
        }
    }
}

fn resolve_elem_ref(
    kind: &ElemRefKind,
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
) -> ResolvedType {
    if !scope.in_templated_resource {
        let form = match kind {
            ElemRefKind::Item(_) => "elem",
            ElemRefKind::Index => "i",
        };
        errors.push(LoadError::at(
            ReasonCode::InvalidSubstitution,
            format!(
                "\"${{{form}}}\" can only be used within a resource that defines each"
            ),
            range,
        ));
        return ResolvedType::Any;
    }
    match kind {
        ElemRefKind::Item(_) => ResolvedType::Any,
        ElemRefKind::Index => ResolvedType::Integer,
    }
}

/// Walk an arbitrary mapping tree (no schema), checking every embedded
/// substitution and rejecting `${...}` in mapping keys. Used for value
/// content, include variables, and resource `metadata.custom` blocks.
pub(crate) fn check_mapping_substitutions(
    node: &crate::mapping::MappingNode,
    parent: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    use crate::mapping::MappingNode;

    if depth >= crate::MAX_TRAVERSE_DEPTH || scope.ctx.cancellation().is_cancelled() {
        return;
    }
    let position = node.position_or(parent);
    match node {
        MappingNode::Null { .. } | MappingNode::Scalar { .. } => {}
        MappingNode::Interpolation { value, .. } => {
            check_string_with_substitutions(value, position, scope, diags, errors, edges);
        }
        MappingNode::Array { items, .. } => {
            for item in items {
                check_mapping_substitutions(
                    item,
                    position,
                    depth + 1,
                    scope,
                    diags,
                    errors,
                    edges,
                );
            }
        }
        MappingNode::Object { entries, .. } => {
            for entry in entries {
                let key_position = entry.key_range.unwrap_or(position);
                if contains_substitution(&entry.key) {
                    errors.push(LoadError::at(
                        ReasonCode::MappingNodeKeyContainsSubstitution,
                        format!(
                            "mapping key \"{}\" must not contain substitutions",
                            entry.key
                        ),
                        key_position,
                    ));
                    continue;
                }
                check_mapping_substitutions(
                    &entry.value,
                    key_position,
                    depth + 1,
                    scope,
                    diags,
                    errors,
                    edges,
                );
            }
        }
    }
}

/// Whether a raw string contains an (unparsed) `${...}` expression. Used
/// for identifier-position strings where substitutions are banned outright.
pub(crate) fn contains_substitution(text: &str) -> bool {
    use once_cell::sync::Lazy;
    static SUBSTITUTION_RE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"\$\{[^}]*\}").expect("valid literal pattern"));
    SUBSTITUTION_RE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Blueprint, Value, ValueType, Variable, VariableType},
        mapping::MappingNode,
        registry::InMemoryFunctionRegistry,
        scalar::ScalarValue,
        substitutions::{FunctionCall, FunctionSignature},
    };
    use test_case::test_case;

    fn blueprint_with_variable() -> Blueprint {
        let mut blueprint = Blueprint::new("2023-04-20");
        blueprint
            .variables
            .push("region", Variable::new(VariableType::String));
        blueprint.values.push(
            "total",
            Value::new(ValueType::Integer, MappingNode::scalar(1)),
        );
        blueprint
    }

    fn variable(name: &str) -> Substitution {
        Substitution::Variable {
            name: name.to_owned(),
            range: None,
        }
    }

    #[test]
    fn variable_reference_records_an_edge() {
        let blueprint = blueprint_with_variable();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "values.other".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let resolved = resolve_substitution(
            &variable("region"),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(resolved, ResolvedType::String);
        assert!(errors.is_empty());

        let mut graph = ReferenceGraph::new();
        edges.merge_into(&mut graph);
        assert!(graph.contains("variables.region"));
        assert_eq!(
            graph.node("values.other").expect("node").references,
            vec!["variables.region"]
        );
    }

    #[test]
    fn unknown_variable_is_an_error_without_an_edge() {
        let blueprint = blueprint_with_variable();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "values.other".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let resolved = resolve_substitution(
            &variable("missing"),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(resolved, ResolvedType::Any);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::InvalidReference);

        let mut graph = ReferenceGraph::new();
        edges.merge_into(&mut graph);
        assert!(graph.is_empty());
    }

    #[test]
    fn self_reference_is_rejected() {
        let blueprint = blueprint_with_variable();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "values.total".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let substitution = Substitution::Value {
            name: "total".to_owned(),
            path: Vec::new(),
            range: None,
        };
        resolve_substitution(
            &substitution,
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot reference itself"));
    }

    #[test]
    fn interpolated_string_resolves_to_string() {
        let blueprint = blueprint_with_variable();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "resources.api".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let value = StringWithSubstitutions::parts(vec![
            crate::substitutions::StringPart::Literal {
                text: "region-".to_owned(),
                range: None,
            },
            crate::substitutions::StringPart::Substitution(variable("region")),
        ]);
        let resolved = check_string_with_substitutions(
            &value,
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(resolved, ResolvedType::String);
        assert!(errors.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_function_reports_but_still_resolves_args() {
        let blueprint = blueprint_with_variable();
        let registry = InMemoryFunctionRegistry::new();
        let ctx = ValidationContext::builder()
            .with_functions(&registry)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "resources.api".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let call = Substitution::Function(FunctionCall::new("trim", vec![variable("missing")]));
        resolve_substitution(
            &call,
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        // One error for the unknown variable, one for the unknown function.
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn link_function_checks_first_literal_argument() {
        let mut blueprint = blueprint_with_variable();
        blueprint
            .resources
            .push("orders", crate::blueprint::Resource::new("aws/dynamodb/table"));
        let registry = InMemoryFunctionRegistry::new().with_function(
            "link",
            FunctionSignature::new(
                vec![ResolvedType::String, ResolvedType::String],
                ResolvedType::Object,
            ),
        );
        let ctx = ValidationContext::builder()
            .with_functions(&registry)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "resources.api".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let literal = |text: &str| Substitution::Literal {
            value: ScalarValue::from(text),
            range: None,
        };
        let call = Substitution::Function(FunctionCall::new(
            "link",
            vec![literal("orders"), literal("handler")],
        ));
        resolve_substitution(
            &call,
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert!(errors.is_empty(), "errors: {errors:?}");

        let missing = Substitution::Function(FunctionCall::new(
            "link",
            vec![literal("ghost"), literal("handler")],
        ));
        resolve_substitution(
            &missing,
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::SubFuncLinkArgResourceNotFound);
    }

    #[test]
    fn child_export_resolution_rules() {
        use crate::registry::InMemoryChildExports;

        let mut blueprint = blueprint_with_variable();
        blueprint.includes.push(
            "coreInfra",
            crate::blueprint::Include::new(StringWithSubstitutions::literal("./core.yaml")),
        );
        let exports = InMemoryChildExports::new()
            .with_export(
                "coreInfra",
                "vpcId",
                ChildExportType::Scalar(crate::scalar::ScalarKind::String),
            )
            .with_export("coreInfra", "subnetIds", ChildExportType::Array);
        let ctx = ValidationContext::builder()
            .with_child_exports(&exports)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "resources.api".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();

        let child = |export: &str, path: Vec<PathSegment>| Substitution::Child {
            name: "coreInfra".to_owned(),
            export: export.to_owned(),
            path,
            range: None,
        };

        let resolved = resolve_substitution(
            &child("vpcId", Vec::new()),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(resolved, ResolvedType::String);
        assert!(errors.is_empty());

        let resolved = resolve_substitution(
            &child("subnetIds", Vec::new()),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(resolved, ResolvedType::Array);
        assert!(errors.is_empty());

        // Scalar exports forbid navigation.
        resolve_substitution(
            &child("vpcId", vec![PathSegment::Field("region".to_owned())]),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ChildExportScalarNavigation);
        errors.clear();

        // Missing exports are errors.
        resolve_substitution(
            &child("ghost", Vec::new()),
            SourceRange::new(1, 1),
            &scope,
            &mut diags,
            &mut errors,
            &mut edges,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ChildExportNotFound);
    }

    #[test_case("plain text", false)]
    #[test_case("${variables.region}", true)]
    #[test_case("prefix ${values.x} suffix", true)]
    #[test_case("$ {not a sub}", false)]
    fn substitution_detection(text: &str, expected: bool) {
        assert_eq!(contains_substitution(text), expected);
    }

    #[test]
    fn absorbed_edges_survive_merge() {
        let mut edges = EdgeBuffer::new();
        edges.record("resources.a", "variables.x".to_owned(), "substitution");
        let mut branch = EdgeBuffer::new();
        branch.record("resources.a", "values.y".to_owned(), "substitution");
        edges.absorb(&mut branch);

        let mut graph = ReferenceGraph::new();
        edges.merge_into(&mut graph);
        assert!(graph.contains("variables.x"));
        assert!(graph.contains("values.y"));
    }
}
