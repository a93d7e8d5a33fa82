use crate::{
    defs::{type_error, validate_definition, Sinks},
    error::{LoadError, ReasonCode},
    mapping::{MappingEntry, MappingNode},
    paths::ElementPath,
    positions::SourceRange,
    schema::DefinitionSchema,
    substitutions::check::{contains_substitution, SubScope},
};
use ahash::AHashMap;

/// Entries ordered by key position with a lexicographic tie-break, so
/// diagnostics come out in document order.
fn ordered_entries(entries: &[MappingEntry]) -> Vec<&MappingEntry> {
    let mut ordered: Vec<&MappingEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        let key_a = a
            .key_range
            .map_or((usize::MAX, usize::MAX), |range| range.sort_key());
        let key_b = b
            .key_range
            .map_or((usize::MAX, usize::MAX), |range| range.sort_key());
        (key_a, a.key.as_str()).cmp(&(key_b, b.key.as_str()))
    });
    ordered
}

#[allow(clippy::too_many_arguments)]
pub(super) fn validate(
    node: &MappingNode,
    attributes: &AHashMap<String, DefinitionSchema>,
    required: &[String],
    path: &ElementPath,
    position: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    let MappingNode::Object { entries, .. } = node else {
        sinks.errors.push(type_error(path, "object", node, position));
        return;
    };

    for name in required {
        if node.get(name).is_none() {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefMissingRequiredField,
                format!("\"{path}.{name}\" is required but missing"),
                position,
            ));
        }
    }

    for entry in ordered_entries(entries) {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        let key_position = entry.key_range.unwrap_or(position);
        if contains_substitution(&entry.key) {
            sinks.errors.push(LoadError::at(
                ReasonCode::MappingNodeKeyContainsSubstitution,
                format!(
                    "field name \"{}\" under \"{path}\" must not contain substitutions",
                    entry.key
                ),
                key_position,
            ));
            continue;
        }
        match attributes.get(entry.key.as_str()) {
            Some(attribute) => validate_definition(
                &entry.value,
                attribute,
                &path.child(entry.key.as_str()),
                key_position,
                depth + 1,
                scope,
                sinks,
            ),
            None => {
                let mut known: Vec<&str> =
                    attributes.keys().map(String::as_str).collect();
                known.sort_unstable();
                sinks.errors.push(LoadError::at(
                    ReasonCode::ResourceDefUnknownField,
                    format!(
                        "\"{path}.{}\" is not expected here, expected one of: {}",
                        entry.key,
                        known.join(", ")
                    ),
                    key_position,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::Blueprint, context::ValidationContext, diagnostics::Diagnostics,
        schema::StringConstraints, substitutions::check::EdgeBuffer,
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
        let path = ElementPath::root("resources", "api").child("spec");
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

    fn schema() -> DefinitionSchema {
        DefinitionSchema::object(
            vec![
                ("tableName", DefinitionSchema::plain_string()),
                (
                    "region",
                    DefinitionSchema::string(StringConstraints::default()).nullable(),
                ),
            ],
            vec!["tableName"],
        )
    }

    #[test]
    fn missing_required_attribute() {
        let node = MappingNode::object(vec![]);
        let errors = run(&node, &schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefMissingRequiredField);
        assert!(errors[0].message.contains("spec.tableName"));
    }

    #[test]
    fn unknown_attribute_lists_candidates() {
        let node = MappingNode::object(vec![
            MappingEntry::new("tableName", MappingNode::scalar("orders")),
            MappingEntry::new("tabel", MappingNode::scalar("oops")),
        ]);
        let errors = run(&node, &schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefUnknownField);
        assert!(errors[0].message.contains("expected one of: region, tableName"));
    }

    #[test]
    fn substituted_key_is_rejected() {
        let node = MappingNode::object(vec![
            MappingEntry::new("tableName", MappingNode::scalar("orders")),
            MappingEntry::new("${variables.key}", MappingNode::scalar("x")),
        ]);
        let errors = run(&node, &schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].reason,
            ReasonCode::MappingNodeKeyContainsSubstitution
        );
    }

    #[test]
    fn non_object_is_a_type_error() {
        let errors = run(&MappingNode::scalar(17), &schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::ResourceDefInvalidType);
        assert!(errors[0].message.contains("must be of type object"));
    }
}
