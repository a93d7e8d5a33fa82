//! Validation of blueprint variables: core and custom types, defaults,
//! allowed values, and the effective value for this run.
use crate::{
    blueprint::{Variable, VariableType},
    context::ValidationContext,
    error::{LoadError, ReasonCode},
    positions::SourceRange,
    scalar::{ScalarKind, ScalarValue},
    schema::CustomTypeOptions,
    substitutions::check::contains_substitution,
};

/// Validate one variable declaration together with its effective value
/// (parameter override over default). Returns the collected errors.
pub(crate) fn validate_variable(
    name: &str,
    name_range: Option<SourceRange>,
    variable: &Variable,
    ctx: &ValidationContext<'_>,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let mut errors = Vec::new();

    if contains_substitution(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidVariable,
            format!("${{..}} substitutions cannot be used in variable names: \"{name}\""),
            range,
        ));
    }

    // For custom types the option set doubles as the type definition; when
    // it cannot be loaded (or is inconsistent) nothing else is checkable.
    let custom_options = match &variable.var_type {
        VariableType::Custom(type_name) => {
            match load_custom_options(name, type_name, ctx, range) {
                Ok(options) => Some(options),
                Err(error) => {
                    errors.push(error);
                    return errors;
                }
            }
        }
        _ => None,
    };
    let expected_kind = variable
        .var_type
        .core_kind()
        .or_else(|| custom_options.as_ref().and_then(CustomTypeOptions::uniform_kind));

    if let Some(default) = &variable.default {
        if let Some(error) =
            check_default(name, variable, default, expected_kind, custom_options.as_ref(), range)
        {
            errors.push(error);
        }
    }

    let allowed_usable = check_allowed_values(name, variable, expected_kind, range, &mut errors);

    check_effective_value(
        name,
        variable,
        expected_kind,
        custom_options.as_ref(),
        allowed_usable,
        ctx,
        range,
        &mut errors,
    );

    errors
}

fn load_custom_options(
    name: &str,
    type_name: &str,
    ctx: &ValidationContext<'_>,
    range: SourceRange,
) -> Result<CustomTypeOptions, LoadError> {
    if !ctx.variable_types().has_type(type_name) {
        return Err(LoadError::at(
            ReasonCode::InvalidVariable,
            format!(
                "the custom type \"{type_name}\" of variable \"{name}\" is not \
                 supported by any loaded provider"
            ),
            range,
        ));
    }
    let Some(options) = ctx.variable_types().options(type_name) else {
        return Err(LoadError::at(
            ReasonCode::InvalidVariable,
            format!(
                "failed to load options for the custom type \"{type_name}\" of \
                 variable \"{name}\""
            ),
            range,
        ));
    };
    if options.uniform_kind().is_none() {
        return Err(LoadError::at(
            ReasonCode::MixedVariableTypes,
            format!(
                "the custom type \"{type_name}\" declares options of mixed scalar \
                 types, so variable \"{name}\" cannot be validated"
            ),
            range,
        ));
    }
    Ok(options)
}

fn check_default(
    name: &str,
    variable: &Variable,
    default: &ScalarValue,
    expected_kind: Option<ScalarKind>,
    custom_options: Option<&CustomTypeOptions>,
    range: SourceRange,
) -> Option<LoadError> {
    if let Some(expected) = expected_kind {
        if default.kind() != expected {
            return Some(LoadError::at(
                ReasonCode::InvalidVariable,
                format!(
                    "an invalid type was used for the default value of variable \
                     \"{name}\", expected a value of type {} but one of type {} \
                     was provided",
                    variable.var_type,
                    default.kind()
                ),
                range,
            ));
        }
    }
    if let Some(options) = custom_options {
        if !options.contains(default) {
            return Some(LoadError::at(
                ReasonCode::InvalidVariable,
                format!(
                    "the default value \"{default}\" of variable \"{name}\" is not a \
                     valid option for the custom type {}",
                    variable.var_type
                ),
                range,
            ));
        }
    }
    None
}

/// Check the `allowed_values` list itself. Returns whether the list is
/// usable for membership checks: a list with invalid entries is not.
fn check_allowed_values(
    name: &str,
    variable: &Variable,
    expected_kind: Option<ScalarKind>,
    range: SourceRange,
    errors: &mut Vec<LoadError>,
) -> bool {
    let Some(allowed) = &variable.allowed_values else {
        return false;
    };
    if variable.var_type == VariableType::Boolean {
        errors.push(LoadError::at(
            ReasonCode::InvalidVariable,
            format!("allowed values are not supported for the boolean variable \"{name}\""),
            range,
        ));
        return false;
    }
    let mut children = Vec::new();
    for value in allowed {
        if let Some(expected) = expected_kind {
            if value.kind() != expected {
                children.push(LoadError::at(
                    ReasonCode::InvalidVariable,
                    format!(
                        "an invalid type was used for an allowed value of variable \
                         \"{name}\", expected a value of type {} but \"{value}\" of \
                         type {} was provided",
                        variable.var_type,
                        value.kind()
                    ),
                    range,
                ));
            }
        }
    }
    if !children.is_empty() {
        errors.push(
            LoadError::at(
                ReasonCode::InvalidVariable,
                format!("invalid allowed values were provided for variable \"{name}\""),
                range,
            )
            .with_children(children),
        );
        return false;
    }
    if let Some(default) = &variable.default {
        if !allowed.contains(default) {
            errors.push(LoadError::at(
                ReasonCode::InvalidVariable,
                format!(
                    "the default value \"{default}\" of variable \"{name}\" is not \
                     in its allowed values"
                ),
                range,
            ));
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn check_effective_value(
    name: &str,
    variable: &Variable,
    expected_kind: Option<ScalarKind>,
    custom_options: Option<&CustomTypeOptions>,
    allowed_usable: bool,
    ctx: &ValidationContext<'_>,
    range: SourceRange,
    errors: &mut Vec<LoadError>,
) {
    let provided = ctx.params().blueprint_variables.get(name);
    let Some(value) = provided.or(variable.default.as_ref()) else {
        errors.push(LoadError::at(
            ReasonCode::VariableInvalidOrMissing,
            format!(
                "a value must be provided for variable \"{name}\" as it does not \
                 define a default"
            ),
            range,
        ));
        return;
    };

    if let Some(expected) = expected_kind {
        if value.kind() != expected {
            errors.push(LoadError::at(
                ReasonCode::VariableInvalidOrMissing,
                format!(
                    "an invalid type was used for variable \"{name}\", expected a \
                     value of type {} but one of type {} was provided",
                    variable.var_type,
                    value.kind()
                ),
                range,
            ));
            return;
        }
    }
    if value.is_empty_string() {
        errors.push(LoadError::at(
            ReasonCode::VariableInvalidOrMissing,
            format!("an empty value was provided for variable \"{name}\""),
            range,
        ));
        return;
    }
    if allowed_usable {
        if let Some(allowed) = &variable.allowed_values {
            if !allowed.contains(value) {
                errors.push(LoadError::at(
                    ReasonCode::VariableInvalidOrMissing,
                    format!(
                        "\"{value}\" is not an allowed value for variable \"{name}\""
                    ),
                    range,
                ));
                return;
            }
        }
    }
    if let Some(options) = custom_options {
        if !options.contains(value) {
            errors.push(LoadError::at(
                ReasonCode::VariableInvalidOrMissing,
                format!(
                    "\"{value}\" is not a valid option for variable \"{name}\" of \
                     custom type {}",
                    variable.var_type
                ),
                range,
            ));
        }
    }
}
