//! Rank computation
//!
//! The rank of a node is the length of the longest dependency chain below it:
//! 0 without dependencies, otherwise 1 + the highest rank among them. Ranks
//! are computed depth-first on an explicit stack; meeting a node that is
//! still in progress means a cycle, and the first one found ends the run.

use tracing::{debug, trace};

use super::node::{NodeId, NodeKind, NodeTable};

/// Per-node state during the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RankState {
    Unvisited,
    InProgress,
    Done(usize),
}

/// Outcome of the rank computation
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Ranking {
    /// Rank of every node, indexed by node id
    Ranked(Vec<usize>),
    /// First cycle found; the first and last entries are the same node
    Cycle(Vec<NodeId>),
}

/// Nodes that `id` depends on, in traversal order
///
/// - a head waits for its container's head and for the requirements its
///   owner declared;
/// - a body waits for its own head, its container's head, the items that
///   declared it in `required_by`, and every child;
/// - a plain item waits for its container's head, its requirements and the
///   items that declared it in `required_by`.
///
/// Unresolved requirements contribute nothing.
pub(crate) fn dependencies(table: &NodeTable, id: NodeId) -> Vec<NodeId> {
    let node = table.node(id);
    let mut deps = Vec::new();

    let container_head = table
        .container_of(id)
        .and_then(|container| table.node(container).head());

    match node.kind {
        NodeKind::Head { owner } => {
            deps.extend(container_head);
            deps.extend(resolved(table, owner));
        }
        NodeKind::Body { head } => {
            deps.push(head);
            deps.extend(container_head);
            deps.extend(node.reverse_requires.iter().copied());
            deps.extend(node.children.iter().copied());
        }
        NodeKind::Item => {
            deps.extend(container_head);
            deps.extend(resolved(table, id));
            deps.extend(node.reverse_requires.iter().copied());
        }
    }

    deps
}

fn resolved(table: &NodeTable, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    table.node(id).requires.iter().filter_map(|r| r.target)
}

struct Frame {
    node: NodeId,
    deps: Vec<NodeId>,
    next: usize,
    highest: Option<usize>,
}

impl Frame {
    fn new(table: &NodeTable, node: NodeId) -> Self {
        Self {
            node,
            deps: dependencies(table, node),
            next: 0,
            highest: None,
        }
    }

    fn observe(&mut self, rank: usize) {
        self.highest = Some(self.highest.map_or(rank, |h| h.max(rank)));
    }
}

/// Ranks every node of the table, or returns the first cycle
pub(crate) fn compute(table: &NodeTable) -> Ranking {
    let mut states = vec![RankState::Unvisited; table.len()];
    let mut stack: Vec<Frame> = Vec::new();

    for start in table.ids() {
        if states[start] != RankState::Unvisited {
            continue;
        }
        states[start] = RankState::InProgress;
        stack.push(Frame::new(table, start));

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.deps.len() {
                let dep = frame.deps[frame.next];
                frame.next += 1;

                match states[dep] {
                    RankState::Done(rank) => frame.observe(rank),
                    RankState::InProgress => {
                        let cycle = cycle_from(&stack, dep);
                        debug!(length = cycle.len(), "cycle detected");
                        return Ranking::Cycle(cycle);
                    }
                    RankState::Unvisited => {
                        states[dep] = RankState::InProgress;
                        stack.push(Frame::new(table, dep));
                    }
                }
                continue;
            }

            let node = frame.node;
            let rank = frame.highest.map_or(0, |h| h + 1);
            stack.pop();
            trace!(node, rank, "ranked");
            states[node] = RankState::Done(rank);
            if let Some(parent) = stack.last_mut() {
                parent.observe(rank);
            }
        }
    }

    let ranks = states
        .into_iter()
        .map(|state| match state {
            RankState::Done(rank) => rank,
            // Every node is finished once the traversal completes
            RankState::Unvisited | RankState::InProgress => 0,
        })
        .collect();
    Ranking::Ranked(ranks)
}

/// The stack slice from `repeated` to the top, closed with `repeated` again
fn cycle_from(stack: &[Frame], repeated: NodeId) -> Vec<NodeId> {
    let start = stack
        .iter()
        .position(|frame| frame.node == repeated)
        .unwrap_or_default();
    let mut cycle: Vec<NodeId> = stack[start..].iter().map(|frame| frame.node).collect();
    cycle.push(repeated);
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registrar::register;
    use crate::domain::{ItemDefinition, ItemHandle};

    fn table_for(defs: Vec<ItemDefinition>) -> NodeTable {
        let items: Vec<ItemHandle> = defs.into_iter().map(ItemDefinition::into_handle).collect();
        register(&items, &[]).unwrap()
    }

    fn rank_of(table: &NodeTable, ranks: &[usize], name: &str) -> usize {
        ranks[table.find(&name.to_lowercase()).unwrap()]
    }

    fn ranks(table: &NodeTable) -> Vec<usize> {
        match compute(table) {
            Ranking::Ranked(ranks) => ranks,
            Ranking::Cycle(cycle) => panic!("unexpected cycle: {:?}", cycle),
        }
    }

    #[test]
    fn chain_ranks() {
        let table = table_for(vec![
            ItemDefinition::new("C").with_requires(["B"]),
            ItemDefinition::new("B").with_requires(["A"]),
            ItemDefinition::new("A"),
        ]);
        let ranks = ranks(&table);

        assert_eq!(rank_of(&table, &ranks, "A"), 0);
        assert_eq!(rank_of(&table, &ranks, "B"), 1);
        assert_eq!(rank_of(&table, &ranks, "C"), 2);
    }

    #[test]
    fn longest_path_wins() {
        let table = table_for(vec![
            ItemDefinition::new("A"),
            ItemDefinition::new("B").with_requires(["A"]),
            ItemDefinition::new("C").with_requires(["A", "B"]),
        ]);
        let ranks = ranks(&table);

        assert_eq!(rank_of(&table, &ranks, "C"), 2);
    }

    #[test]
    fn container_wraps_children() {
        let table = table_for(vec![
            ItemDefinition::container("C").with_children(["X", "Y"]),
            ItemDefinition::new("X").with_requires(["Y"]),
            ItemDefinition::new("Y"),
        ]);
        let ranks = ranks(&table);
        let c = table.find("c").unwrap();
        let head = table.node(c).head().unwrap();

        assert_eq!(ranks[head], 0);
        assert_eq!(rank_of(&table, &ranks, "Y"), 1);
        assert_eq!(rank_of(&table, &ranks, "X"), 2);
        assert_eq!(ranks[c], 3);
    }

    #[test]
    fn empty_container_follows_its_head() {
        let table = table_for(vec![ItemDefinition::container("C")]);
        let ranks = ranks(&table);

        assert_eq!(ranks, vec![1, 0]);
    }

    #[test]
    fn container_requirements_belong_to_head() {
        let table = table_for(vec![
            ItemDefinition::new("Dep"),
            ItemDefinition::container("C").with_requires(["Dep"]).with_children(["X"]),
            ItemDefinition::new("X"),
        ]);
        let ranks = ranks(&table);
        let head = table.node(table.find("c").unwrap()).head().unwrap();

        assert_eq!(ranks[head], 1);
        assert_eq!(rank_of(&table, &ranks, "X"), 2);
    }

    #[test]
    fn required_by_on_container_waits_for_content() {
        let table = table_for(vec![
            ItemDefinition::new("Before").with_required_by(["C"]),
            ItemDefinition::container("C").with_children(["X"]),
            ItemDefinition::new("X"),
        ]);
        let ranks = ranks(&table);
        let head = table.node(table.find("c").unwrap()).head().unwrap();

        // The head does not wait for reverse requirements, the body does
        assert_eq!(ranks[head], 0);
        assert!(rank_of(&table, &ranks, "C") > rank_of(&table, &ranks, "Before"));
    }

    #[test]
    fn missing_requirement_contributes_nothing() {
        let table = table_for(vec![ItemDefinition::new("A").with_requires(["Gone"])]);
        assert_eq!(ranks(&table), vec![0]);
    }

    #[test]
    fn two_node_cycle() {
        let table = table_for(vec![
            ItemDefinition::new("A").with_requires(["B"]),
            ItemDefinition::new("B").with_requires(["A"]),
        ]);
        let a = table.find("a").unwrap();
        let b = table.find("b").unwrap();

        assert_eq!(compute(&table), Ranking::Cycle(vec![a, b, a]));
    }

    #[test]
    fn cycle_is_trimmed_to_participants() {
        let table = table_for(vec![
            ItemDefinition::new("Root").with_requires(["A"]),
            ItemDefinition::new("A").with_requires(["B"]),
            ItemDefinition::new("B").with_requires(["C"]),
            ItemDefinition::new("C").with_requires(["A"]),
        ]);
        let id = |n: &str| table.find(n).unwrap();

        assert_eq!(
            compute(&table),
            Ranking::Cycle(vec![id("a"), id("b"), id("c"), id("a")])
        );
    }

    #[test]
    fn self_requirement_is_a_cycle() {
        let table = table_for(vec![ItemDefinition::new("A").with_requires(["A"])]);
        assert_eq!(compute(&table), Ranking::Cycle(vec![0, 0]));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let defs: Vec<_> = (0..20_000)
            .map(|i| {
                let def = ItemDefinition::new(format!("N{}", i));
                if i == 0 {
                    def
                } else {
                    def.with_requires([format!("N{}", i - 1).as_str()])
                }
            })
            .rev()
            .collect();
        let table = table_for(defs);
        let ranks = ranks(&table);

        assert_eq!(rank_of(&table, &ranks, "N19999"), 19_999);
    }
}
