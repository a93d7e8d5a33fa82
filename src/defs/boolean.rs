use crate::{
    defs::{type_error, Sinks},
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    scalar::ScalarValue,
    schema::ScalarValidateFn,
    substitutions::{
        check::{check_assignable, check_string_with_substitutions, SubScope},
        ResolvedType,
    },
};

pub(super) fn validate(
    node: &MappingNode,
    validate_fn: Option<&ScalarValidateFn>,
    path: &ElementPath,
    position: SourceRange,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    match node {
        MappingNode::Scalar {
            value: value @ ScalarValue::Boolean(_),
            ..
        } => {
            if let Some(validate) = validate_fn {
                sinks.diags.extend(validate.run(value, position));
            }
        }
        MappingNode::Interpolation { value, .. } => {
            if value.is_interpolated() {
                sinks.errors.push(LoadError::at(
                    ReasonCode::ResourceDefInvalidType,
                    format!(
                        "\"{path}\" must be of type boolean, but an interpolated \
                         string (which resolves to string) was provided"
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
            if !check_assignable(resolved, ResolvedType::Boolean, &subject, position, sinks.diags)
            {
                sinks.errors.push(LoadError::at(
                    ReasonCode::ResourceDefInvalidType,
                    format!(
                        "\"{path}\" must be of type boolean, but the substitution \
                         resolves to {resolved}"
                    ),
                    position,
                ));
            }
        }
        _ => sinks.errors.push(type_error(path, "boolean", node, position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Blueprint, Variable, VariableType},
        context::ValidationContext,
        defs::validate_definition,
        diagnostics::Diagnostics,
        schema::DefinitionSchema,
        substitutions::{check::EdgeBuffer, StringWithSubstitutions, Substitution},
    };

    fn run(node: &MappingNode) -> Vec<LoadError> {
        let mut blueprint = Blueprint::new("2023-04-20");
        blueprint
            .variables
            .push("enabled", Variable::new(VariableType::Boolean));
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
            .child("enabled");
        validate_definition(
            node,
            &DefinitionSchema::boolean(),
            &path,
            SourceRange::new(1, 1),
            0,
            &scope,
            &mut sinks,
        );
        errors
    }

    #[test]
    fn boolean_scalar_is_accepted() {
        assert!(run(&MappingNode::scalar(false)).is_empty());
    }

    #[test]
    fn boolean_substitution_is_accepted() {
        let value = StringWithSubstitutions::substitution(Substitution::Variable {
            name: "enabled".to_owned(),
            range: None,
        });
        assert!(run(&MappingNode::interpolation(value)).is_empty());
    }

    #[test]
    fn string_scalar_is_rejected() {
        let errors = run(&MappingNode::scalar("true"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefInvalidType);
    }

    #[test]
    fn interpolated_string_is_rejected() {
        let value = StringWithSubstitutions::parts(vec![
            crate::substitutions::StringPart::Literal {
                text: "is-".to_owned(),
                range: None,
            },
            crate::substitutions::StringPart::Substitution(Substitution::Variable {
                name: "enabled".to_owned(),
                range: None,
            }),
        ]);
        let errors = run(&MappingNode::interpolation(value));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefInvalidType);
    }
}
