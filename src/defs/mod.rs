//! Recursive conformance of mapping trees against provider spec
//! definitions, one module per schema variant.
mod array;
mod boolean;
mod map;
mod number;
mod object;
mod string;
mod union;

use crate::{
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    schema::{DefinitionKind, DefinitionSchema},
    substitutions::check::{EdgeBuffer, SubScope},
};

use crate::MAX_TRAVERSE_DEPTH;

/// The mutable outputs of a validation pass, grouped so they can be swapped
/// for scratch buffers when a `oneOf` branch needs rollback.
pub(crate) struct Sinks<'s> {
    pub diags: &'s mut Diagnostics,
    pub errors: &'s mut Vec<LoadError>,
    pub edges: &'s mut EdgeBuffer,
}

/// Validate one node of a mapping tree against one schema node.
///
/// Collects diagnostics and errors instead of failing fast; returns nothing
/// because every outcome lands in `sinks`.
pub(crate) fn validate_definition(
    node: &MappingNode,
    schema: &DefinitionSchema,
    path: &ElementPath,
    parent: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    if depth >= MAX_TRAVERSE_DEPTH || scope.ctx.cancellation().is_cancelled() {
        return;
    }
    let position = node.position_or(parent);
    if schema.computed {
        sinks.errors.push(LoadError::at(
            ReasonCode::ComputedFieldInBlueprint,
            format!(
                "\"{path}\" is computed by the provider and must not be defined \
                 in the source document"
            ),
            position,
        ));
        return;
    }
    if node.is_empty() {
        if !schema.nullable {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefItemEmpty,
                format!("\"{path}\" must not be empty"),
                position,
            ));
        }
        return;
    }
    match &schema.kind {
        DefinitionKind::Object {
            attributes,
            required,
        } => object::validate(node, attributes, required, path, position, depth, scope, sinks),
        DefinitionKind::Map {
            values,
            min_length,
            max_length,
        } => map::validate(
            node,
            values,
            *min_length,
            *max_length,
            path,
            position,
            depth,
            scope,
            sinks,
        ),
        DefinitionKind::Array {
            items,
            min_length,
            max_length,
        } => array::validate(
            node,
            items,
            *min_length,
            *max_length,
            path,
            position,
            depth,
            scope,
            sinks,
        ),
        DefinitionKind::String(constraints) => {
            string::validate(node, constraints, path, position, scope, sinks);
        }
        DefinitionKind::Integer(constraints) => {
            number::validate_integer(node, constraints, path, position, scope, sinks);
        }
        DefinitionKind::Float(constraints) => {
            number::validate_float(node, constraints, path, position, scope, sinks);
        }
        DefinitionKind::Boolean { validate } => {
            boolean::validate(node, validate.as_ref(), path, position, scope, sinks);
        }
        DefinitionKind::Union { one_of } => {
            union::validate(node, one_of, path, parent, depth, scope, sinks);
        }
    }
}

/// Error for a node whose shape does not match the schema variant.
pub(super) fn type_error(
    path: &ElementPath,
    expected: &str,
    node: &MappingNode,
    position: SourceRange,
) -> LoadError {
    LoadError::at(
        ReasonCode::ResourceDefInvalidType,
        format!(
            "\"{path}\" must be of type {expected}, but {} was provided",
            node.type_tag()
        ),
        position,
    )
}
