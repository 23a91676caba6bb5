//! Order graph of a sort result
//!
//! Rebuilds the ordering constraints of a successful sort as a petgraph
//! directed graph (edge direction: dependency -> dependent), for DOT export
//! and for checking the order against the constraints.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::item::name_key;
use super::result::{SortResult, SortedNode};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("No order available, a cycle was detected: {0}")]
    CycleDetected(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),
}

/// Why one entry comes before another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Requirement (direct or declared through `required_by`)
    Requires,
    /// A container head opens before its content
    Opens,
    /// A container closes after each child
    Closes,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Constraint::Requires => "requires",
            Constraint::Opens => "opens",
            Constraint::Closes => "closes",
        })
    }
}

/// One constraint between two entries. Indexes are positions in the sorted
/// order and stay unambiguous when display names collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintEdge {
    pub from: String,
    pub from_index: usize,
    pub to: String,
    pub to_index: usize,
    pub constraint: Constraint,
}

/// Identity of an entry across sorts: its name key and whether it is a head
type EntryKey = (String, bool);

fn entry_key(node: &SortedNode) -> EntryKey {
    (name_key(node.full_name()), node.is_container_head())
}

/// Directed graph of the ordering constraints of a sort. Graph node `i` is
/// sorted entry `i`.
#[derive(Debug)]
pub struct OrderGraph {
    graph: DiGraph<String, Constraint>,
    entries: Vec<EntryKey>,
    /// Name lookup; items take precedence over heads sharing their name
    node_map: HashMap<String, NodeIndex>,
    shadowed_heads: Vec<String>,
}

impl OrderGraph {
    /// Builds the graph of a successful sort
    pub fn from_result(result: &SortResult) -> Result<Self, GraphError> {
        let sorted = result.sorted_items().ok_or_else(|| {
            GraphError::CycleDetected(result.cycle_description().unwrap_or_default())
        })?;

        let mut graph = DiGraph::new();
        let indices: Vec<NodeIndex> = sorted
            .iter()
            .map(|node| graph.add_node(node.full_name().to_string()))
            .collect();

        let mut node_map = HashMap::new();
        for node in sorted.iter().filter(|node| !node.is_container_head()) {
            node_map.insert(name_key(node.full_name()), indices[node.index()]);
        }

        let mut shadowed_heads = Vec::new();
        for node in sorted.iter().filter(|node| node.is_container_head()) {
            let key = name_key(node.full_name());
            if node_map.contains_key(&key) {
                debug!(name = node.full_name(), "head name shadowed by an item");
                shadowed_heads.push(node.full_name().to_string());
            } else {
                node_map.insert(key, indices[node.index()]);
            }
        }

        for node in sorted {
            let target = indices[node.index()];

            for &dep in node.requires_indexes() {
                graph.update_edge(indices[dep], target, Constraint::Requires);
            }

            if let Some(head) = node.head_index() {
                graph.update_edge(indices[head], target, Constraint::Opens);
            }

            let container_head = node
                .container_index()
                .and_then(|container| sorted[container].head_index());
            if let Some(head) = container_head {
                graph.update_edge(indices[head], target, Constraint::Opens);
            }

            for &child in node.children_indexes() {
                graph.update_edge(indices[child], target, Constraint::Closes);
            }
        }

        Ok(Self {
            graph,
            entries: sorted.iter().map(entry_key).collect(),
            node_map,
            shadowed_heads,
        })
    }

    /// Heads whose display name is also the name of an item. Name-based
    /// queries resolve such names to the item.
    pub fn shadowed_heads(&self) -> &[String] {
        &self.shadowed_heads
    }

    /// Returns the number of entries in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the number of constraints
    pub fn constraint_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every constraint, in insertion order
    pub fn edges(&self) -> Vec<ConstraintEdge> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                Some(ConstraintEdge {
                    from: self.graph[source].clone(),
                    from_index: source.index(),
                    to: self.graph[target].clone(),
                    to_index: target.index(),
                    constraint: *self.graph.edge_weight(edge)?,
                })
            })
            .collect()
    }

    /// Returns true if `to` transitively depends on `from`
    pub fn has_path(&self, from: &str, to: &str) -> Result<bool, GraphError> {
        let from = self.index(from)?;
        let to = self.index(to)?;
        Ok(has_path_connecting(&self.graph, from, to, None))
    }

    /// Direct dependencies of an entry
    pub fn dependencies(&self, name: &str) -> Result<Vec<String>, GraphError> {
        let idx = self.index(name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|dep| self.graph.node_weight(dep).cloned())
            .collect();
        deps.sort();
        Ok(deps)
    }

    /// A topological order of the graph (dependencies before dependents)
    pub fn topological_order(&self) -> Vec<String> {
        toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
            // Built from an acyclic sort, so no cycle can appear here
            .unwrap_or_default()
    }

    /// Constraints broken by the given order of entries (typically the
    /// result of another sort of the same items): pairs whose dependency
    /// does not come first
    pub fn violations(&self, order: &[SortedNode]) -> Vec<(String, String)> {
        let position: HashMap<EntryKey, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, node)| (entry_key(node), pos))
            .collect();

        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .filter_map(|(source, target)| {
                let before = position.get(&self.entries[source.index()])?;
                let after = position.get(&self.entries[target.index()])?;
                (before >= after)
                    .then(|| (self.graph[source].clone(), self.graph[target].clone()))
            })
            .collect()
    }

    /// Renders the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[Config::GraphContentOnly]))
            .lines()
            .map(|line| format!("    {}\n", line.trim()))
            .fold(String::from("digraph order {\n"), |mut dot, line| {
                dot.push_str(&line);
                dot
            })
            + "}\n"
    }

    fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(&name_key(name))
            .copied()
            .ok_or_else(|| GraphError::EntryNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sort, ItemDefinition, ItemHandle, SortOptions};

    fn graph_for(defs: Vec<ItemDefinition>) -> OrderGraph {
        let items: Vec<ItemHandle> = defs.into_iter().map(ItemDefinition::into_handle).collect();
        let result = sort(&items, &[], &SortOptions::default()).unwrap();
        OrderGraph::from_result(&result).unwrap()
    }

    #[test]
    fn requirement_edges() {
        let graph = graph_for(vec![
            ItemDefinition::new("A"),
            ItemDefinition::new("B").with_requires(["A"]),
        ]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.dependencies("B").unwrap(), vec!["A"]);
        assert!(graph.has_path("A", "B").unwrap());
        assert!(!graph.has_path("B", "A").unwrap());
    }

    #[test]
    fn container_edges() {
        let graph = graph_for(vec![
            ItemDefinition::container("C").with_children(["X"]),
            ItemDefinition::new("X"),
        ]);

        assert_eq!(graph.dependencies("X").unwrap(), vec!["C.Head"]);
        assert_eq!(graph.dependencies("C").unwrap(), vec!["C.Head", "X"]);
        assert_eq!(graph.constraint_count(), 3);
    }

    #[test]
    fn edges_carry_their_constraint() {
        let graph = graph_for(vec![
            ItemDefinition::container("C").with_children(["X"]),
            ItemDefinition::new("X"),
        ]);
        let edges = graph.edges();

        assert_eq!(edges.len(), 3);
        assert!(edges.contains(&ConstraintEdge {
            from: "X".to_string(),
            from_index: 1,
            to: "C".to_string(),
            to_index: 2,
            constraint: Constraint::Closes,
        }));
        assert!(edges
            .iter()
            .filter(|edge| edge.from == "C.Head")
            .all(|edge| edge.constraint == Constraint::Opens));
    }

    #[test]
    fn violations_of_a_wrong_order() {
        let items: Vec<ItemHandle> = vec![
            ItemDefinition::new("A").into_handle(),
            ItemDefinition::new("B").with_requires(["A"]).into_handle(),
        ];
        let result = sort(&items, &[], &SortOptions::default()).unwrap();
        let graph = OrderGraph::from_result(&result).unwrap();
        let sorted = result.sorted_items().unwrap();

        assert!(graph.violations(sorted).is_empty());

        let mut wrong = sorted.to_vec();
        wrong.reverse();
        assert_eq!(
            graph.violations(&wrong),
            vec![("A".to_string(), "B".to_string())]
        );
    }

    #[test]
    fn topological_order_respects_constraints() {
        let graph = graph_for(vec![
            ItemDefinition::new("C").with_requires(["B"]),
            ItemDefinition::new("B").with_requires(["A"]),
            ItemDefinition::new("A"),
        ]);
        let order = graph.topological_order();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();

        for edge in graph.edges() {
            assert!(position(&edge.from) < position(&edge.to));
        }
    }

    #[test]
    fn item_named_like_a_head_keeps_its_own_edges() {
        let items: Vec<ItemHandle> = vec![
            ItemDefinition::container("C").into_handle(),
            ItemDefinition::new("Dep").into_handle(),
            ItemDefinition::new("C.Head").with_requires(["Dep"]).into_handle(),
            ItemDefinition::new("Z").with_requires(["C.Head"]).into_handle(),
        ];
        let result = sort(&items, &[], &SortOptions::default()).unwrap();
        let graph = OrderGraph::from_result(&result).unwrap();

        // Order: C.Head (head), Dep, C, C.Head (item), Z
        let edges = graph.edges();
        let pairs: Vec<(usize, usize, Constraint)> = edges
            .iter()
            .map(|edge| (edge.from_index, edge.to_index, edge.constraint))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (0, 2, Constraint::Opens),
                (1, 3, Constraint::Requires),
                (3, 4, Constraint::Requires),
            ]
        );

        assert_eq!(graph.shadowed_heads(), ["C.Head".to_string()]);
        assert_eq!(graph.dependencies("C.Head").unwrap(), vec!["Dep"]);
        assert!(graph.has_path("Dep", "Z").unwrap());
        assert!(graph.violations(result.sorted_items().unwrap()).is_empty());
    }

    #[test]
    fn cycle_has_no_graph() {
        let items: Vec<ItemHandle> = vec![
            ItemDefinition::new("A").with_requires(["B"]).into_handle(),
            ItemDefinition::new("B").with_requires(["A"]).into_handle(),
        ];
        let result = sort(&items, &[], &SortOptions::default()).unwrap();

        assert!(matches!(
            OrderGraph::from_result(&result),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn unknown_entry_returns_error() {
        let graph = graph_for(vec![ItemDefinition::new("A")]);
        assert!(matches!(graph.has_path("A", "Z"), Err(GraphError::EntryNotFound(_))));
    }

    #[test]
    fn dot_output() {
        let graph = graph_for(vec![
            ItemDefinition::new("A"),
            ItemDefinition::new("B").with_requires(["A"]),
        ]);
        let dot = graph.to_dot();

        assert!(dot.starts_with("digraph order {"));
        assert!(dot.contains("\"A\""));
        assert!(dot.contains("requires"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
