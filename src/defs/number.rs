use crate::{
    defs::{type_error, Sinks},
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    scalar::ScalarValue,
    schema::{FloatConstraints, IntegerConstraints},
    substitutions::{
        check::{check_assignable, check_string_with_substitutions, SubScope},
        ResolvedType, StringWithSubstitutions,
    },
};
use num_cmp::NumCmp;

pub(super) fn validate_integer(
    node: &MappingNode,
    constraints: &IntegerConstraints,
    path: &ElementPath,
    position: SourceRange,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    match node {
        MappingNode::Scalar {
            value: value @ ScalarValue::Integer(int_value),
            ..
        } => {
            if let Some(allowed) = &constraints.allowed {
                if !allowed.contains(int_value) {
                    sinks.errors.push(LoadError::at(
                        ReasonCode::ResourceDefValueNotAllowed,
                        format!(
                            "\"{path}\" must be one of {}, but {int_value} was provided",
                            number_list(allowed)
                        ),
                        position,
                    ));
                }
            }
            if let Some(min) = constraints.min {
                if *int_value < min {
                    sinks.errors.push(out_of_range(path, "at least", min, position));
                }
            }
            if let Some(max) = constraints.max {
                if *int_value > max {
                    sinks.errors.push(out_of_range(path, "at most", max, position));
                }
            }
            if let Some(validate) = &constraints.validate {
                sinks.diags.extend(validate.run(value, position));
            }
        }
        MappingNode::Interpolation { value, .. } => check_substituted_number(
            value,
            ResolvedType::Integer,
            path,
            position,
            scope,
            sinks,
        ),
        _ => sinks.errors.push(type_error(path, "integer", node, position)),
    }
}

pub(super) fn validate_float(
    node: &MappingNode,
    constraints: &FloatConstraints,
    path: &ElementPath,
    position: SourceRange,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    match node {
        MappingNode::Scalar { value, .. } => {
            // Integer literals are accepted where a float is expected;
            // comparisons stay in the original representation.
            match value {
                ScalarValue::Float(float_value) => {
                    check_float_constraints(*float_value, constraints, path, position, sinks);
                }
                ScalarValue::Integer(int_value) => {
                    check_float_constraints(*int_value, constraints, path, position, sinks);
                }
                _ => {
                    sinks.errors.push(type_error(path, "float", node, position));
                    return;
                }
            }
            if let Some(validate) = &constraints.validate {
                sinks.diags.extend(validate.run(value, position));
            }
        }
        MappingNode::Interpolation { value, .. } => {
            check_substituted_number(value, ResolvedType::Float, path, position, scope, sinks);
        }
        _ => sinks.errors.push(type_error(path, "float", node, position)),
    }
}

fn check_float_constraints<N>(
    value: N,
    constraints: &FloatConstraints,
    path: &ElementPath,
    position: SourceRange,
    sinks: &mut Sinks<'_>,
) where
    N: NumCmp<f64> + std::fmt::Display + Copy,
{
    if let Some(allowed) = &constraints.allowed {
        if !allowed
            .iter()
            .any(|candidate| NumCmp::num_eq(value, *candidate))
        {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefValueNotAllowed,
                format!(
                    "\"{path}\" must be one of {}, but {value} was provided",
                    number_list(allowed)
                ),
                position,
            ));
        }
    }
    if let Some(min) = constraints.min {
        if NumCmp::num_lt(value, min) {
            sinks.errors.push(out_of_range(path, "at least", min, position));
        }
    }
    if let Some(max) = constraints.max {
        if NumCmp::num_gt(value, max) {
            sinks.errors.push(out_of_range(path, "at most", max, position));
        }
    }
}

/// A numeric field holding substitutions: a true interpolation resolves to
/// a string and type-errors; a bare substitution must resolve to the
/// numeric type. Numeric range constraints only apply to concrete values,
/// so there is nothing further to check here.
fn check_substituted_number(
    value: &StringWithSubstitutions,
    expected: ResolvedType,
    path: &ElementPath,
    position: SourceRange,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    if value.is_interpolated() {
        sinks.errors.push(LoadError::at(
            ReasonCode::ResourceDefInvalidType,
            format!(
                "\"{path}\" must be of type {expected}, but an interpolated string \
                 (which resolves to string) was provided"
            ),
            position,
        ));
        return;
    }
    let resolved = check_string_with_substitutions(
        value,
        position,
        scope,
        sinks.diags,
        sinks.errors,
        sinks.edges,
    );
    let subject = format!("\"{path}\"");
    if !check_assignable(resolved, expected, &subject, position, sinks.diags) {
        sinks.errors.push(LoadError::at(
            ReasonCode::ResourceDefInvalidType,
            format!(
                "\"{path}\" must be of type {expected}, but the substitution \
                 resolves to {resolved}"
            ),
            position,
        ));
    }
}

fn out_of_range<N: std::fmt::Display>(
    path: &ElementPath,
    bound: &str,
    limit: N,
    position: SourceRange,
) -> LoadError {
    LoadError::at(
        ReasonCode::ResourceDefOutOfRange,
        format!("\"{path}\" must be {bound} {limit}"),
        position,
    )
}

fn number_list<N: std::fmt::Display>(values: &[N]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
