//! The reference graph collector.
//!
//! Every successful symbolic reference discovered while checking
//! substitutions lands here as a pair of symmetric edges on per-element
//! chain nodes. Nodes live in a flat arena addressed by stable string
//! element IDs, so the graph needs no cyclic ownership; the cycle DFS
//! operates on IDs alone.
use ahash::AHashMap;
use std::collections::BTreeSet;

/// Stable element ID for a variable.
#[must_use]
pub fn variable_id(name: &str) -> String {
    format!("variables.{name}")
}

/// Stable element ID for a named value.
#[must_use]
pub fn value_id(name: &str) -> String {
    format!("values.{name}")
}

/// Stable element ID for a data source.
#[must_use]
pub fn data_source_id(name: &str) -> String {
    format!("datasources.{name}")
}

/// Stable element ID for a resource.
#[must_use]
pub fn resource_id(name: &str) -> String {
    format!("resources.{name}")
}

/// Stable element ID for a child blueprint include.
#[must_use]
pub fn child_id(name: &str) -> String {
    format!("children.{name}")
}

/// Per-element record of what it references and what references it.
#[derive(Debug, Clone, Default)]
pub struct ChainNode {
    pub element_id: String,
    /// Outgoing references in the order they were discovered.
    pub references: Vec<String>,
    /// Incoming references in the order they were discovered.
    pub referenced_by: Vec<String>,
    /// Labels describing how the element participates in the graph
    /// (e.g. `substitution`, `dependsOn`, `link`).
    pub tags: BTreeSet<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// The union of reference chains for one validation run.
///
/// Append-only while substitution checks run; frozen (by taking `&self`)
/// for the final cycle detection.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    order: Vec<String>,
    nodes: AHashMap<String, ChainNode>,
}

impl ReferenceGraph {
    #[must_use]
    pub fn new() -> ReferenceGraph {
        ReferenceGraph::default()
    }

    fn ensure_node(&mut self, element_id: &str) {
        if !self.nodes.contains_key(element_id) {
            self.order.push(element_id.to_owned());
            self.nodes.insert(
                element_id.to_owned(),
                ChainNode {
                    element_id: element_id.to_owned(),
                    ..ChainNode::default()
                },
            );
        }
    }

    /// Record that `from` references `to`. Both directions are stored; the
    /// tag is attached to both endpoints. Duplicate edges collapse.
    pub fn add_reference(&mut self, from: &str, to: &str, tag: &str) {
        self.ensure_node(from);
        self.ensure_node(to);
        let from_node = self
            .nodes
            .get_mut(from)
            .expect("node inserted above");
        if !from_node.references.iter().any(|id| id == to) {
            from_node.references.push(to.to_owned());
        }
        from_node.tags.insert(tag.to_owned());
        let to_node = self.nodes.get_mut(to).expect("node inserted above");
        if !to_node.referenced_by.iter().any(|id| id == from) {
            to_node.referenced_by.push(from.to_owned());
        }
        to_node.tags.insert(tag.to_owned());
    }

    #[must_use]
    pub fn node(&self, element_id: &str) -> Option<&ChainNode> {
        self.nodes.get(element_id)
    }

    #[must_use]
    pub fn contains(&self, element_id: &str) -> bool {
        self.nodes.contains_key(element_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Depth-first search from `start` for any reachable element accepted by
    /// `matches`, excluding `start` itself. Returns the first hit in
    /// discovery order.
    #[must_use]
    pub fn find_reachable(
        &self,
        start: &str,
        matches: impl Fn(&str) -> bool,
    ) -> Option<String> {
        let mut stack: Vec<&str> = match self.nodes.get(start) {
            Some(node) => node.references.iter().map(String::as_str).rev().collect(),
            None => return None,
        };
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        visited.insert(start);
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if matches(current) {
                return Some(current.to_owned());
            }
            if let Some(node) = self.nodes.get(current) {
                for target in node.references.iter().rev() {
                    stack.push(target);
                }
            }
        }
        None
    }

    /// All cycles in the graph, each reported once and keyed on its entry
    /// element: the first member reached from the earliest start point in
    /// insertion order. Each cycle is the path of element IDs beginning at
    /// the entry.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut colors: AHashMap<&str, Color> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Color::White))
            .collect();
        let mut stack: Vec<&str> = Vec::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();
        let mut seen_entries: BTreeSet<&str> = BTreeSet::new();

        for start in &self.order {
            if colors.get(start.as_str()).copied() == Some(Color::White) {
                self.visit(start, &mut colors, &mut stack, &mut cycles, &mut seen_entries);
            }
        }
        cycles
    }

    fn visit<'a>(
        &'a self,
        current: &'a str,
        colors: &mut AHashMap<&'a str, Color>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
        seen_entries: &mut BTreeSet<&'a str>,
    ) {
        colors.insert(current, Color::Gray);
        stack.push(current);
        if let Some(node) = self.nodes.get(current) {
            for target in &node.references {
                match colors.get(target.as_str()).copied() {
                    Some(Color::White) => {
                        self.visit(target, colors, stack, cycles, seen_entries);
                    }
                    Some(Color::Gray) => {
                        // Back edge: the cycle is the stack suffix starting
                        // at the target.
                        if seen_entries.insert(target.as_str()) {
                            let entry_position = stack
                                .iter()
                                .position(|id| *id == target.as_str())
                                .expect("gray nodes are on the stack");
                            cycles.push(
                                stack[entry_position..]
                                    .iter()
                                    .map(|id| (*id).to_owned())
                                    .collect(),
                            );
                        }
                    }
                    Some(Color::Black) | None => {}
                }
            }
        }
        stack.pop();
        colors.insert(current, Color::Black);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_symmetric_and_deduplicated() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("resources.a", "variables.x", "substitution");
        graph.add_reference("resources.a", "variables.x", "substitution");

        let a = graph.node("resources.a").expect("node");
        assert_eq!(a.references, vec!["variables.x"]);
        let x = graph.node("variables.x").expect("node");
        assert_eq!(x.referenced_by, vec!["resources.a"]);
        assert!(x.tags.contains("substitution"));
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("resources.a", "variables.x", "substitution");
        graph.add_reference("resources.b", "variables.x", "substitution");
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn two_element_cycle_is_keyed_on_first_inserted() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("values.a", "values.b", "substitution");
        graph.add_reference("values.b", "values.a", "substitution");

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["values.a".to_owned(), "values.b".to_owned()]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("values.a", "values.a", "substitution");
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["values.a".to_owned()]);
    }

    #[test]
    fn cycle_across_tags_is_found_once() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("resources.a", "resources.b", "substitution");
        graph.add_reference("resources.b", "resources.c", "link");
        graph.add_reference("resources.c", "resources.a", "link");
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
        assert_eq!(cycles[0][0], "resources.a");
    }

    #[test]
    fn reachability_excludes_the_start() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("values.a", "values.b", "substitution");
        graph.add_reference("values.b", "resources.c", "substitution");

        let hit = graph.find_reachable("values.a", |id| id.starts_with("resources."));
        assert_eq!(hit.as_deref(), Some("resources.c"));
        assert!(graph
            .find_reachable("values.a", |id| id.starts_with("children."))
            .is_none());
    }

    #[test]
    fn element_id_formats() {
        assert_eq!(variable_id("x"), "variables.x");
        assert_eq!(value_id("x"), "values.x");
        assert_eq!(data_source_id("x"), "datasources.x");
        assert_eq!(resource_id("x"), "resources.x");
        assert_eq!(child_id("x"), "children.x");
    }
}
