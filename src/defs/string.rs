use crate::{
    defs::{type_error, Sinks},
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    scalar::ScalarValue,
    schema::StringConstraints,
    substitutions::{
        check::{check_assignable, check_string_with_substitutions, SubScope},
        ResolvedType,
    },
};

pub(super) fn validate(
    node: &MappingNode,
    constraints: &StringConstraints,
    path: &ElementPath,
    position: SourceRange,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    match node {
        MappingNode::Scalar { value, .. } => match value {
            ScalarValue::String(text) => {
                check_scalar(text, constraints, value, path, position, sinks);
            }
            _ => sinks.errors.push(type_error(path, "string", node, position)),
        },
        MappingNode::Interpolation { value, .. } => {
            // A parser may surface a plain string as a one-part
            // interpolation; constraints still apply in full.
            if let Some(text) = value.as_pure_string() {
                let scalar = ScalarValue::String(text.to_owned());
                check_scalar(text, constraints, &scalar, path, position, sinks);
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
            match resolved {
                ResolvedType::Array | ResolvedType::Object => {
                    sinks.errors.push(LoadError::at(
                        ReasonCode::ResourceDefInvalidType,
                        format!(
                            "\"{path}\" must be of type string, but the substitution \
                             resolves to {resolved}"
                        ),
                        position,
                    ));
                    return;
                }
                resolved => {
                    // Primitive substitutions render as text; `any` warns.
                    let subject = format!("\"{path}\"");
                    check_assignable(
                        resolved,
                        ResolvedType::String,
                        &subject,
                        position,
                        sinks.diags,
                    );
                }
            }
            if has_constraints(constraints) {
                sinks.diags.warning(
                    format!(
                        "\"{path}\" contains substitutions and cannot be checked \
                         against its constraints at this stage"
                    ),
                    position,
                );
            }
        }
        _ => sinks.errors.push(type_error(path, "string", node, position)),
    }
}

fn has_constraints(constraints: &StringConstraints) -> bool {
    constraints.allowed_values.is_some()
        || constraints.min_length.is_some()
        || constraints.max_length.is_some()
        || constraints.pattern.is_some()
        || constraints.validate.is_some()
}

fn check_scalar(
    text: &str,
    constraints: &StringConstraints,
    value: &ScalarValue,
    path: &ElementPath,
    position: SourceRange,
    sinks: &mut Sinks<'_>,
) {
    if let Some(allowed) = &constraints.allowed_values {
        if !allowed.iter().any(|candidate| candidate == text) {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefValueNotAllowed,
                format!(
                    "\"{path}\" must be one of {}, but \"{text}\" was provided",
                    quoted_list(allowed)
                ),
                position,
            ));
        }
    }
    if let Some(pattern) = &constraints.pattern {
        match pattern.regex() {
            Some(regex) => match regex.is_match(text) {
                Ok(true) => {}
                Ok(false) => sinks.errors.push(LoadError::at(
                    ReasonCode::ResourceDefPatternMismatch,
                    format!(
                        "\"{path}\" must match the pattern \"{}\", but \"{text}\" \
                         was provided",
                        pattern.source()
                    ),
                    position,
                )),
                Err(_) => sinks.diags.warning(
                    format!(
                        "the pattern \"{}\" for \"{path}\" could not be evaluated",
                        pattern.source()
                    ),
                    position,
                ),
            },
            None => sinks.diags.warning(
                format!(
                    "the pattern \"{}\" declared for \"{path}\" is not a valid \
                     regular expression",
                    pattern.source()
                ),
                position,
            ),
        }
    }
    // Length limits count Unicode scalar values, not bytes.
    let length = bytecount::num_chars(text.as_bytes());
    if let Some(min) = constraints.min_length {
        if length < min {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefStringTooShort,
                format!(
                    "\"{path}\" must be at least {min} character{} long, \
                     {length} provided",
                    if min == 1 { "" } else { "s" }
                ),
                position,
            ));
        }
    }
    if let Some(max) = constraints.max_length {
        if length > max {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefStringTooLong,
                format!(
                    "\"{path}\" must be at most {max} character{} long, \
                     {length} provided",
                    if max == 1 { "" } else { "s" }
                ),
                position,
            ));
        }
    }
    if let Some(validate) = &constraints.validate {
        sinks.diags.extend(validate.run(value, position));
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Blueprint, Variable, VariableType},
        context::ValidationContext,
        defs::validate_definition,
        diagnostics::{Diagnostics, Level},
        schema::{DefinitionSchema, Pattern},
        substitutions::{check::EdgeBuffer, StringWithSubstitutions, Substitution},
    };
    use test_case::test_case;

    fn run(node: &MappingNode, constraints: StringConstraints) -> (Vec<LoadError>, Diagnostics) {
        let mut blueprint = Blueprint::new("2023-04-20");
        blueprint
            .variables
            .push("region", Variable::new(VariableType::String));
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "resources.api".to_owned());
        let mut diags = Diagnostics::new();
        let mut errors = Vec::new();
        let mut edges = EdgeBuffer::new();
        let mut sinks = Sinks {
            diags: &mut diags,
            errors: &mut errors,
            edges: &mut edges,
        };
        let path = ElementPath::root("resources", "api")
            .child("spec")
            .child("name");
        validate_definition(
            node,
            &DefinitionSchema::string(constraints),
            &path,
            SourceRange::new(1, 1),
            0,
            &scope,
            &mut sinks,
        );
        (errors, diags)
    }

    #[test_case("ab", Some(3), None, ReasonCode::ResourceDefStringTooShort; "too short")]
    #[test_case("abcd", None, Some(3), ReasonCode::ResourceDefStringTooLong; "too long")]
    fn length_violations(
        text: &str,
        min: Option<usize>,
        max: Option<usize>,
        expected: ReasonCode,
    ) {
        let constraints = StringConstraints {
            min_length: min,
            max_length: max,
            ..StringConstraints::default()
        };
        let (errors, _) = run(&MappingNode::scalar(text), constraints);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, expected);
    }

    #[test]
    fn lengths_count_unicode_scalar_values() {
        let constraints = StringConstraints {
            max_length: Some(3),
            ..StringConstraints::default()
        };
        // Three characters, nine bytes.
        let (errors, _) = run(&MappingNode::scalar("日本語"), constraints);
        assert!(errors.is_empty());
    }

    #[test]
    fn pattern_and_allowed_values() {
        let constraints = StringConstraints {
            pattern: Some(Pattern::new("^[a-z-]+$")),
            ..StringConstraints::default()
        };
        let (errors, _) = run(&MappingNode::scalar("Orders!"), constraints);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefPatternMismatch);

        let constraints = StringConstraints {
            allowed_values: Some(vec!["small".to_owned(), "large".to_owned()]),
            ..StringConstraints::default()
        };
        let (errors, _) = run(&MappingNode::scalar("medium"), constraints);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefValueNotAllowed);
        assert!(errors[0].message.contains("\"small\", \"large\""));
    }

    #[test]
    fn interpolated_value_degrades_constraints_to_a_warning() {
        let constraints = StringConstraints {
            min_length: Some(10),
            ..StringConstraints::default()
        };
        let value = StringWithSubstitutions::parts(vec![
            crate::substitutions::StringPart::Literal {
                text: "prefix-".to_owned(),
                range: None,
            },
            crate::substitutions::StringPart::Substitution(Substitution::Variable {
                name: "region".to_owned(),
                range: None,
            }),
        ]);
        let (errors, diags) = run(&MappingNode::interpolation(value), constraints);
        assert!(errors.is_empty());
        assert!(diags
            .iter()
            .any(|diagnostic| diagnostic.level == Level::Warning
                && diagnostic.message.contains("cannot be checked")));
    }

    #[test]
    fn pure_literal_interpolation_still_applies_constraints() {
        let constraints = StringConstraints {
            min_length: Some(10),
            ..StringConstraints::default()
        };
        let value = StringWithSubstitutions::literal("short");
        let (errors, _) = run(&MappingNode::interpolation(value), constraints);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefStringTooShort);
    }

    #[test]
    fn integer_scalar_is_a_type_error() {
        let (errors, _) = run(&MappingNode::scalar(5), StringConstraints::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefInvalidType);
    }
}
