use crate::{
    defs::{type_error, validate_definition, Sinks},
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    schema::DefinitionSchema,
    substitutions::check::{contains_substitution, SubScope},
};

#[allow(clippy::too_many_arguments)]
pub(super) fn validate(
    node: &MappingNode,
    values: &DefinitionSchema,
    min_length: Option<usize>,
    max_length: Option<usize>,
    path: &ElementPath,
    position: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    let MappingNode::Object { entries, .. } = node else {
        sinks.errors.push(type_error(path, "map", node, position));
        return;
    };

    if let Some(min) = min_length {
        if entries.len() < min {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefMapTooSmall,
                format!(
                    "\"{path}\" must contain at least {min} entr{}, {} provided",
                    if min == 1 { "y" } else { "ies" },
                    entries.len()
                ),
                position,
            ));
        }
    }
    if let Some(max) = max_length {
        if entries.len() > max {
            sinks.errors.push(LoadError::at(
                ReasonCode::ResourceDefMapTooLarge,
                format!(
                    "\"{path}\" must contain at most {max} entr{}, {} provided",
                    if max == 1 { "y" } else { "ies" },
                    entries.len()
                ),
                position,
            ));
        }
    }

    for entry in entries {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        let key_position = entry.key_range.unwrap_or(position);
        if contains_substitution(&entry.key) {
            sinks.errors.push(LoadError::at(
                ReasonCode::InvalidMapKey,
                format!(
                    "map key \"{}\" under \"{path}\" must not contain substitutions",
                    entry.key
                ),
                key_position,
            ));
            continue;
        }
        validate_definition(
            &entry.value,
            values,
            &path.child(entry.key.as_str()),
            key_position,
            depth + 1,
            scope,
            sinks,
        );
    }
}
