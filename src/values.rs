//! Validation of named values (`values` section).
use crate::{
    blueprint::{Value, ValueType},
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    positions::SourceRange,
    substitutions::{
        check::{
            check_assignable, check_mapping_substitutions, check_string_with_substitutions,
            contains_substitution, EdgeBuffer, SubScope,
        },
        ResolvedType,
    },
};

/// Validate one named value: its name, its content against the declared
/// type, and every substitution inside the content.
pub(crate) fn validate_value(
    name: &str,
    name_range: Option<SourceRange>,
    value: &Value,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    edges: &mut EdgeBuffer,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let mut errors = Vec::new();

    if contains_substitution(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidValue,
            format!("${{..}} substitutions cannot be used in value names: \"{name}\""),
            range,
        ));
    }
    if value.content.is_empty() {
        errors.push(LoadError::at(
            ReasonCode::InvalidValue,
            format!("value \"{name}\" must define content"),
            range,
        ));
        return errors;
    }

    let declared = value.value_type.resolved();
    let position = value.content.position_or(range);
    match &value.content {
        MappingNode::Interpolation { value: content, .. } => {
            let resolved = check_string_with_substitutions(
                content, position, scope, diags, &mut errors, edges,
            );
            let subject = format!("value \"{name}\"");
            if !check_assignable(resolved, declared, &subject, position, diags) {
                errors.push(type_mismatch(name, value.value_type, resolved, position));
            }
        }
        MappingNode::Scalar { value: scalar, .. } => {
            let resolved = ResolvedType::from_scalar_kind(scalar.kind());
            let subject = format!("value \"{name}\"");
            if !check_assignable(resolved, declared, &subject, position, diags) {
                errors.push(type_mismatch(name, value.value_type, resolved, position));
            }
        }
        MappingNode::Array { .. } => {
            if declared != ResolvedType::Array {
                errors.push(type_mismatch(
                    name,
                    value.value_type,
                    ResolvedType::Array,
                    position,
                ));
            }
            check_mapping_substitutions(
                &value.content,
                position,
                0,
                scope,
                diags,
                &mut errors,
                edges,
            );
        }
        MappingNode::Object { .. } => {
            if declared != ResolvedType::Object {
                errors.push(type_mismatch(
                    name,
                    value.value_type,
                    ResolvedType::Object,
                    position,
                ));
            }
            check_mapping_substitutions(
                &value.content,
                position,
                0,
                scope,
                diags,
                &mut errors,
                edges,
            );
        }
        MappingNode::Null { .. } => {}
    }
    errors
}

fn type_mismatch(
    name: &str,
    declared: ValueType,
    resolved: ResolvedType,
    position: SourceRange,
) -> LoadError {
    LoadError::at(
        ReasonCode::InvalidValueType,
        format!(
            "value \"{name}\" is declared as {declared} but its content resolves \
             to {resolved}"
        ),
        position,
    )
}
