use crate::{
    defs::{type_error, validate_definition, Sinks},
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    schema::DefinitionSchema,
    substitutions::check::SubScope,
};

#[allow(clippy::too_many_arguments)]
pub(super) fn validate(
    node: &MappingNode,
    items: &DefinitionSchema,
    min_length: Option<usize>,
    max_length: Option<usize>,
    path: &ElementPath,
    position: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    let MappingNode::Array {
        items: elements, ..
    } = node
    else {
        sinks.errors.push(type_error(path, "array", node, position));
        return;
    };

    if let Some(min) = min_length {
        if elements.len() < min {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefArrayTooShort,
                format!(
                    "\"{path}\" must contain at least {min} item{}, {} provided",
                    if min == 1 { "" } else { "s" },
                    elements.len()
                ),
                position,
            ));
        }
    }
    if let Some(max) = max_length {
        if elements.len() > max {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefArrayTooLong,
                format!(
                    "\"{path}\" must contain at most {max} item{}, {} provided",
                    if max == 1 { "" } else { "s" },
                    elements.len()
                ),
                position,
            ));
        }
    }

    for (index, element) in elements.iter().enumerate() {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        validate_definition(
            element,
            items,
            &path.child(index),
            element.position_or(position),
            depth + 1,
            scope,
            sinks,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::Blueprint, context::ValidationContext, diagnostics::Diagnostics,
        substitutions::check::EdgeBuffer,
    };

    fn run(node: &MappingNode, schema: &DefinitionSchema) -> Vec<LoadError> {
        let blueprint = Blueprint::new("2023-04-20");
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
            .child("subnets");
        validate_definition(
            node,
            schema,
            &path,
            SourceRange::new(1, 1),
            0,
            &scope,
            &mut sinks,
        );
        errors
    }

    #[test]
    fn items_validated_with_indexed_paths() {
        let schema = DefinitionSchema::array(DefinitionSchema::plain_string());
        let node = MappingNode::array(vec![
            MappingNode::scalar("subnet-1"),
            MappingNode::scalar(true),
        ]);
        let errors = run(&node, &schema);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("spec.subnets[1]"));
    }

    #[test]
    fn length_constraints() {
        let schema =
            DefinitionSchema::array_bounded(DefinitionSchema::plain_string(), Some(1), Some(2));
        assert!(run(&MappingNode::array(vec![]), &schema)
            .iter()
            .any(|error| error.reason == ReasonCode::ResourceDefArrayTooShort));
        let three = MappingNode::array(vec![
            MappingNode::scalar("a"),
            MappingNode::scalar("b"),
            MappingNode::scalar("c"),
        ]);
        assert!(run(&three, &schema)
            .iter()
            .any(|error| error.reason == ReasonCode::ResourceDefArrayTooLong));
    }

    #[test]
    fn non_array_is_a_type_error() {
        let schema = DefinitionSchema::array(DefinitionSchema::plain_string());
        let errors = run(&MappingNode::scalar("not-an-array"), &schema);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefInvalidType);
    }
}
