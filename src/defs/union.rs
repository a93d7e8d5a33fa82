use crate::{
    defs::{validate_definition, Sinks},
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    paths::ElementPath,
    positions::SourceRange,
    schema::DefinitionSchema,
    substitutions::check::{EdgeBuffer, SubScope},
};

/// Try each variant in order; the first that validates cleanly wins and
/// only its diagnostics and reference edges are kept. Failed branches are
/// discarded wholesale.
pub(super) fn validate(
    node: &MappingNode,
    one_of: &[DefinitionSchema],
    path: &ElementPath,
    parent: SourceRange,
    depth: usize,
    scope: &SubScope<'_>,
    sinks: &mut Sinks<'_>,
) {
    for candidate in one_of {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        let mut branch_diags = Diagnostics::new();
        let mut branch_errors: Vec<LoadError> = Vec::new();
        let mut branch_edges = EdgeBuffer::new();
        let mut branch_sinks = Sinks {
            diags: &mut branch_diags,
            errors: &mut branch_errors,
            edges: &mut branch_edges,
        };
        validate_definition(node, candidate, path, parent, depth, scope, &mut branch_sinks);
        if branch_errors.is_empty() {
            sinks.diags.append(&mut branch_diags);
            sinks.edges.absorb(&mut branch_edges);
            return;
        }
    }
    let variants = one_of
        .iter()
        .map(|candidate| candidate.kind.type_name())
        .collect::<Vec<_>>()
        .join(" | ");
    sinks.errors.push(LoadError::at(
        ReasonCode::ResourceDefUnionNoMatch,
        format!(
            "\"{path}\" does not match any of the expected types ({variants}); \
             a value of type {} was provided",
            node.type_tag()
        ),
        node.position_or(parent),
    ));
}
