//! The top-level orchestrator: gates, phase fan-out, and the final
//! reference-cycle check.
use crate::{
    blueprint::Blueprint,
    context::ValidationContext,
    diagnostics::{Diagnostic, Diagnostics},
    error::{LoadError, ReasonCode},
    links::{collect_link_edges, LinkAnnotationsValidator},
    positions::SourceRange,
    refgraph::{self, ReferenceGraph},
    substitutions::check::{contains_substitution, EdgeBuffer, SubScope},
};

/// Transform spec versions this validator understands.
pub const SUPPORTED_VERSIONS: &[&str] = &["2021-12-18", "2023-04-20"];

/// The outcome of a validation run: every diagnostic collected, in source
/// order, plus the aggregated error tree when anything failed.
#[derive(Debug)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<LoadError>,
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Validate a blueprint against the registries in `ctx`.
///
/// Validation never mutates the blueprint and accumulates every error it
/// can find; only the version, resources-or-includes, and transform gates
/// abort early.
pub fn validate(blueprint: &Blueprint, ctx: &ValidationContext<'_>) -> ValidationResult {
    let mut diags = Diagnostics::new();
    let mut errors: Vec<LoadError> = Vec::new();
    let mut graph = ReferenceGraph::new();

    tracing::debug!(
        resources = blueprint.resources.len(),
        includes = blueprint.includes.len(),
        "validating blueprint"
    );

    // Gate: version present and supported.
    match &blueprint.version {
        None => {
            errors.push(LoadError::new(
                ReasonCode::MissingVersion,
                "a blueprint must declare a version",
            ));
            return finish(diags, errors);
        }
        Some(version) if !SUPPORTED_VERSIONS.contains(&version.value.as_str()) => {
            errors.push(LoadError::at(
                ReasonCode::InvalidVersion,
                format!(
                    "the blueprint version \"{}\" is not supported, expected one \
                     of: {}",
                    version.value,
                    SUPPORTED_VERSIONS.join(", ")
                ),
                version.range.unwrap_or_default(),
            ));
            return finish(diags, errors);
        }
        Some(_) => {}
    }

    // Gate: a blueprint without resources or includes deploys nothing.
    if blueprint.resources.is_empty() && blueprint.includes.is_empty() {
        errors.push(LoadError::new(
            ReasonCode::MissingResources,
            "a blueprint must define at least one resource or include",
        ));
        return finish(diags, errors);
    }

    // Gate: transforms are identifier-position strings.
    for transform in &blueprint.transform {
        let range = transform.range.unwrap_or_default();
        if transform.value.is_empty() {
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                "transform entries must not be empty",
                range,
            ));
        } else if contains_substitution(&transform.value) {
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                format!(
                    "the transform \"{}\" must not contain substitutions",
                    transform.value
                ),
                range,
            ));
        }
    }
    if !errors.is_empty() {
        return finish(diags, errors);
    }

    for entry in blueprint.variables.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        errors.extend(crate::variables::validate_variable(
            &entry.name,
            entry.name_range,
            &entry.item,
            ctx,
        ));
    }
    tracing::trace!(variables = blueprint.variables.len(), "variables validated");

    for entry in blueprint.values.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        let scope = SubScope::new(blueprint, ctx, refgraph::value_id(&entry.name));
        let mut edges = EdgeBuffer::new();
        errors.extend(crate::values::validate_value(
            &entry.name,
            entry.name_range,
            &entry.item,
            &scope,
            &mut diags,
            &mut edges,
        ));
        edges.merge_into(&mut graph);
    }

    for entry in blueprint.data_sources.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        let scope = SubScope::new(blueprint, ctx, refgraph::data_source_id(&entry.name));
        let mut edges = EdgeBuffer::new();
        errors.extend(crate::datasources::validate_data_source(
            &entry.name,
            entry.name_range,
            &entry.item,
            &scope,
            &mut diags,
            &mut edges,
        ));
        edges.merge_into(&mut graph);
    }

    for entry in blueprint.resources.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        let scope = SubScope::new(blueprint, ctx, refgraph::resource_id(&entry.name))
            .templated(entry.item.is_templated());
        let mut edges = EdgeBuffer::new();
        errors.extend(crate::resources::validate_resource(
            &entry.name,
            entry.name_range,
            &entry.item,
            &scope,
            &graph,
            &mut diags,
            &mut edges,
        ));
        edges.merge_into(&mut graph);
    }

    for entry in blueprint.includes.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        let scope = SubScope::new(blueprint, ctx, refgraph::child_id(&entry.name));
        let mut edges = EdgeBuffer::new();
        errors.extend(crate::includes::validate_include(
            &entry.name,
            entry.name_range,
            &entry.item,
            &scope,
            &mut diags,
            &mut edges,
        ));
        edges.merge_into(&mut graph);
    }

    for entry in blueprint.exports.in_source_order() {
        if check_cancelled(ctx, &mut errors) {
            return finish(diags, errors);
        }
        let scope = SubScope::new(blueprint, ctx, format!("exports.{}", entry.name));
        errors.extend(crate::exports::validate_export(
            &entry.name,
            entry.name_range,
            &entry.item,
            &scope,
            &mut diags,
        ));
    }

    // Link-annotation pass, then the implicit link edges join the graph so
    // the final cycle check sees explicit and implicit references together.
    let link_edges = collect_link_edges(blueprint);
    let mut link_validator = LinkAnnotationsValidator::new();
    errors.extend(link_validator.validate(blueprint, &link_edges, ctx, &mut diags));
    for edge in &link_edges {
        graph.add_reference(
            &refgraph::resource_id(&edge.from),
            &refgraph::resource_id(&edge.to),
            "link",
        );
    }

    for cycle in graph.find_cycles() {
        let mut rendered = cycle.join(" -> ");
        if let Some(first) = cycle.first() {
            rendered.push_str(" -> ");
            rendered.push_str(first);
        }
        let entry = cycle.first().map(String::as_str).unwrap_or_default();
        let error = match element_range(blueprint, entry) {
            Some(range) => LoadError::at(
                ReasonCode::ReferenceCycle,
                format!("reference cycle detected: {rendered}"),
                range,
            ),
            None => LoadError::new(
                ReasonCode::ReferenceCycle,
                format!("reference cycle detected: {rendered}"),
            ),
        };
        errors.push(error);
    }

    tracing::debug!(
        diagnostics = diags.len(),
        errors = errors.len(),
        "blueprint validation finished"
    );
    finish(diags, errors)
}

/// `true` when the run was cancelled; pushes the sentinel exactly once.
fn check_cancelled(ctx: &ValidationContext<'_>, errors: &mut Vec<LoadError>) -> bool {
    if !ctx.cancellation().is_cancelled() {
        return false;
    }
    if !errors
        .iter()
        .any(|error| error.reason == ReasonCode::Cancelled)
    {
        errors.push(LoadError::cancelled(None));
    }
    true
}

fn finish(mut diags: Diagnostics, errors: Vec<LoadError>) -> ValidationResult {
    diags.sort_by_position();
    ValidationResult {
        diagnostics: diags.into_vec(),
        error: if errors.is_empty() {
            None
        } else {
            Some(LoadError::multiple(errors))
        },
    }
}

/// The declaration position of an element, looked up by its stable ID.
fn element_range(blueprint: &Blueprint, element_id: &str) -> Option<SourceRange> {
    let (section, name) = element_id.split_once('.')?;
    match section {
        "variables" => blueprint.variables.entry(name)?.name_range,
        "values" => blueprint.values.entry(name)?.name_range,
        "datasources" => blueprint.data_sources.entry(name)?.name_range,
        "resources" => blueprint.resources.entry(name)?.name_range,
        "children" => blueprint.includes.entry(name)?.name_range,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Resource, TransformEntry},
        context::CancellationToken,
    };

    fn minimal_blueprint() -> Blueprint {
        let mut blueprint = Blueprint::new("2023-04-20");
        blueprint
            .resources
            .push("orders", Resource::new("aws/dynamodb/table"));
        blueprint
    }

    #[test]
    fn missing_version_aborts_early() {
        let blueprint = Blueprint::default();
        let ctx = ValidationContext::builder().build();
        let result = validate(&blueprint, &ctx);
        let error = result.error.expect("error");
        assert!(error.has_reason(ReasonCode::MissingVersion));
        // The missing-resources gate never ran.
        assert!(!error.has_reason(ReasonCode::MissingResources));
    }

    #[test]
    fn unsupported_version_aborts_early() {
        let mut blueprint = minimal_blueprint();
        blueprint.version = Some(crate::blueprint::StringField::new("2020-01-01"));
        let ctx = ValidationContext::builder().build();
        let result = validate(&blueprint, &ctx);
        assert!(result
            .error
            .expect("error")
            .has_reason(ReasonCode::InvalidVersion));
    }

    #[test]
    fn empty_blueprint_is_missing_resources() {
        let blueprint = Blueprint::new("2023-04-20");
        let ctx = ValidationContext::builder().build();
        let result = validate(&blueprint, &ctx);
        assert!(result
            .error
            .expect("error")
            .has_reason(ReasonCode::MissingResources));
    }

    #[test]
    fn substituted_transforms_error_per_entry() {
        let mut blueprint = minimal_blueprint();
        blueprint
            .transform
            .push(TransformEntry::new("serverless-2024"));
        blueprint
            .transform
            .push(TransformEntry::new("${variables.transform}"));
        blueprint
            .transform
            .push(TransformEntry::new("${values.other}"));
        let ctx = ValidationContext::builder().build();
        let result = validate(&blueprint, &ctx);
        let error = result.error.expect("error");
        let leaves = error.leaf_errors();
        assert_eq!(leaves.len(), 2);
        assert!(leaves
            .iter()
            .all(|leaf| leaf.reason == ReasonCode::InvalidSubstitution));
    }

    #[test]
    fn cancelled_run_returns_the_sentinel() {
        let blueprint = minimal_blueprint();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ValidationContext::builder()
            .with_cancellation(token)
            .build();
        let result = validate(&blueprint, &ctx);
        let error = result.error.expect("error");
        let leaves = error.leaf_errors();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].reason, ReasonCode::Cancelled);
    }
}
