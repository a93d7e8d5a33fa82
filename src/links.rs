//! The link-annotation validator.
//!
//! Resources link to each other through label selectors; each link pair is
//! reconciled against the provider's link annotation definitions, including
//! dynamic (`<resourceName>`-templated) annotation keys.
use crate::{
    blueprint::{Blueprint, Resource},
    context::ValidationContext,
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    positions::SourceRange,
    scalar::ScalarValue,
    schema::LinkAnnotationDefinition,
};
use ahash::{AHashMap, AHashSet};

/// The placeholder a dynamic annotation key carries for the linked
/// resource's name.
const RESOURCE_NAME_PLACEHOLDER: &str = "<resourceName>";

/// A directed link between two resources, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkEdge {
    pub from: String,
    pub to: String,
}

/// Derive the link edges implied by label selectors: resource A links to
/// every other resource whose labels carry all of A's `by_label` pairs.
/// Edges come out in depth-first order over the chains, starting from
/// resources nothing links to, so diagnostics are stable.
pub(crate) fn collect_link_edges(blueprint: &Blueprint) -> Vec<LinkEdge> {
    let ordered: Vec<&crate::blueprint::NamedEntry<Resource>> =
        blueprint.resources.in_source_order();

    let mut adjacency: AHashMap<&str, Vec<&str>> = AHashMap::new();
    let mut has_incoming: AHashSet<&str> = AHashSet::new();
    for entry in &ordered {
        let Some(selector) = &entry.item.link_selector else {
            continue;
        };
        if selector.by_label.is_empty() {
            continue;
        }
        for candidate in &ordered {
            if candidate.name == entry.name {
                continue;
            }
            let labels_match = candidate.item.metadata.as_ref().is_some_and(|metadata| {
                selector.by_label.iter().all(|wanted| {
                    metadata
                        .labels
                        .iter()
                        .any(|label| label.key == wanted.key && label.value == wanted.value)
                })
            });
            if labels_match {
                adjacency
                    .entry(entry.name.as_str())
                    .or_default()
                    .push(candidate.name.as_str());
                has_incoming.insert(candidate.name.as_str());
            }
        }
    }

    fn walk<'a>(
        adjacency: &AHashMap<&'a str, Vec<&'a str>>,
        start: &'a str,
        edges: &mut Vec<LinkEdge>,
        visited: &mut AHashSet<(&'a str, &'a str)>,
    ) {
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let Some(targets) = adjacency.get(current) else {
                continue;
            };
            for &target in targets {
                if visited.insert((current, target)) {
                    edges.push(LinkEdge {
                        from: current.to_owned(),
                        to: target.to_owned(),
                    });
                    stack.push(target);
                }
            }
        }
    }

    let mut edges = Vec::new();
    let mut visited: AHashSet<(&str, &str)> = AHashSet::new();
    for entry in &ordered {
        if !has_incoming.contains(entry.name.as_str()) {
            walk(&adjacency, entry.name.as_str(), &mut edges, &mut visited);
        }
    }
    // Chains with no root (pure cycles) still need their edges covered.
    for entry in &ordered {
        walk(&adjacency, entry.name.as_str(), &mut edges, &mut visited);
    }
    edges
}

/// Validates annotations for every link edge, caching compiled dynamic-key
/// regexes per definition name for the duration of the pass.
pub(crate) struct LinkAnnotationsValidator {
    regex_cache: AHashMap<String, Option<regex::Regex>>,
}

impl LinkAnnotationsValidator {
    pub(crate) fn new() -> LinkAnnotationsValidator {
        LinkAnnotationsValidator {
            regex_cache: AHashMap::new(),
        }
    }

    pub(crate) fn validate(
        &mut self,
        blueprint: &Blueprint,
        edges: &[LinkEdge],
        ctx: &ValidationContext<'_>,
        diags: &mut Diagnostics,
    ) -> Vec<LoadError> {
        let mut errors = Vec::new();
        for edge in edges {
            if ctx.cancellation().is_cancelled() {
                return errors;
            }
            let (Some(a), Some(b)) = (
                blueprint.resources.entry(&edge.from),
                blueprint.resources.entry(&edge.to),
            ) else {
                continue;
            };
            self.validate_edge(a, b, ctx, diags, &mut errors);
        }
        errors
    }

    fn validate_edge(
        &mut self,
        a: &crate::blueprint::NamedEntry<Resource>,
        b: &crate::blueprint::NamedEntry<Resource>,
        ctx: &ValidationContext<'_>,
        diags: &mut Diagnostics,
        errors: &mut Vec<LoadError>,
    ) {
        let type_a = &a.item.resource_type.value;
        let type_b = &b.item.resource_type.value;
        let fallback = a.name_range.unwrap_or_default();
        if !ctx.links().has_link(type_a, type_b) {
            diags.warning(
                format!(
                    "no link implementation is registered for \"{type_a}::{type_b}\" \
                     (resources \"{}\" and \"{}\")",
                    a.name, b.name
                ),
                fallback,
            );
            return;
        }
        let Some(definitions) = ctx.links().annotation_definitions(type_a, type_b) else {
            diags.warning(
                format!(
                    "the link implementation for \"{type_a}::{type_b}\" published no \
                     annotation definitions"
                ),
                fallback,
            );
            return;
        };
        let mut names: Vec<&String> = definitions.keys().collect();
        names.sort_unstable();

        for (resource, is_resource_a, other) in [(a, true, b), (b, false, a)] {
            for name in &names {
                let Some(definition) = definitions.get(name.as_str()) else {
                    continue;
                };
                if !definition.applies_to.accepts(is_resource_a) {
                    continue;
                }
                self.check_definition(resource, other, definition, diags, errors);
            }
        }
    }

    /// Reconcile one annotation definition against one endpoint's
    /// annotations. All matches of a dynamic key are validated
    /// independently.
    fn check_definition(
        &mut self,
        resource: &crate::blueprint::NamedEntry<Resource>,
        other: &crate::blueprint::NamedEntry<Resource>,
        definition: &LinkAnnotationDefinition,
        diags: &mut Diagnostics,
        errors: &mut Vec<LoadError>,
    ) {
        let prefix = format!("{}::", resource.item.resource_type.value);
        let Some(key_template) = definition.name.strip_prefix(&prefix) else {
            return;
        };
        let metadata = resource.item.metadata.as_ref();
        let metadata_range = metadata
            .and_then(|metadata| metadata.range)
            .or(resource.name_range)
            .unwrap_or_default();

        let annotations: &[crate::mapping::MappingEntry] =
            metadata.map_or(&[], |metadata| metadata.annotations.as_slice());

        let mut matches: Vec<&crate::mapping::MappingEntry> = Vec::new();
        if key_template.contains(RESOURCE_NAME_PLACEHOLDER) {
            if let Some(regex) = self.dynamic_key_regex(&definition.name, key_template) {
                matches = annotations
                    .iter()
                    .filter(|entry| regex.is_match(&entry.key))
                    .collect();
            }
        } else if let Some(entry) = annotations.iter().find(|entry| entry.key == key_template) {
            matches.push(entry);
        }

        let populated: Vec<&crate::mapping::MappingEntry> = matches
            .iter()
            .copied()
            .filter(|entry| !entry.value.is_empty())
            .collect();
        if definition.required && populated.is_empty() {
            let rendered = definition
                .name
                .replace(RESOURCE_NAME_PLACEHOLDER, &other.name);
            errors.push(LoadError::at(
                ReasonCode::InvalidResource,
                format!(
                    "the annotation \"{rendered}\" required for the link between \
                     \"{}\" and \"{}\" is missing or null in resource \"{}\"",
                    resource.name, other.name, resource.name
                ),
                metadata_range,
            ));
            return;
        }

        for entry in populated {
            let position = entry.key_range.unwrap_or(metadata_range);
            let scalar = match &entry.value {
                MappingNode::Scalar { value, .. } => Some(value.clone()),
                MappingNode::Interpolation { value, .. } => match value.as_pure_string() {
                    Some(text) => Some(ScalarValue::String(text.to_owned())),
                    None => {
                        diags.warning(
                            format!(
                                "the annotation \"{}\" of resource \"{}\" contains \
                                 substitutions and cannot be validated at this stage",
                                entry.key, resource.name
                            ),
                            position,
                        );
                        continue;
                    }
                },
                _ => None,
            };
            let Some(scalar) = scalar else {
                // Non-scalar annotation values are reported by the resource
                // validator.
                continue;
            };
            self.check_annotation_value(resource, definition, entry, &scalar, position, diags, errors);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_annotation_value(
        &self,
        resource: &crate::blueprint::NamedEntry<Resource>,
        definition: &LinkAnnotationDefinition,
        entry: &crate::mapping::MappingEntry,
        scalar: &ScalarValue,
        position: SourceRange,
        diags: &mut Diagnostics,
        errors: &mut Vec<LoadError>,
    ) {
        if scalar.kind() != definition.value_kind {
            errors.push(LoadError::at(
                ReasonCode::InvalidResource,
                format!(
                    "the annotation \"{}\" of resource \"{}\" must be of type {}, \
                     but {} was provided",
                    entry.key,
                    resource.name,
                    definition.value_kind,
                    scalar.kind()
                ),
                position,
            ));
            return;
        }
        if let Some(allowed) = &definition.allowed_values {
            if !allowed.contains(scalar) {
                let rendered = allowed
                    .iter()
                    .map(|value| format!("\"{value}\""))
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(LoadError::at(
                    ReasonCode::InvalidResource,
                    format!(
                        "the annotation \"{}\" of resource \"{}\" must be one of \
                         {rendered}, but \"{scalar}\" was provided",
                        entry.key, resource.name
                    ),
                    position,
                ));
                return;
            }
        }
        if let Some(validate) = &definition.validate {
            diags.extend(validate.run(scalar, position));
        }
    }

    /// Compile the anchored regex for a dynamic key, once per definition
    /// name. Definitions live as long as the registry, so the cache never
    /// needs eviction within a pass.
    fn dynamic_key_regex(&mut self, definition_name: &str, key_template: &str) -> Option<&regex::Regex> {
        self.regex_cache
            .entry(definition_name.to_owned())
            .or_insert_with(|| {
                let escaped = regex::escape(key_template);
                let pattern = format!(
                    "^{}$",
                    escaped.replace(RESOURCE_NAME_PLACEHOLDER, "[A-Za-z0-9_-]+")
                );
                regex::Regex::new(&pattern).ok()
            })
            .as_ref()
    }
}
