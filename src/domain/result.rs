//! Sort results
//!
//! A [`SortResult`] is either an ordered list of [`SortedNode`]s or the first
//! cycle found, plus every issue recorded along the way. Callers must check
//! [`SortResult::is_complete`] before trusting the order.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::issue::Issue;
use super::item::{name_key, ItemHandle};
use super::node::{NodeId, NodeKind, NodeTable};
use super::rank::Ranking;

/// Cycles with more entries than this are explained with structural
/// relations first.
const SHORT_CYCLE_LEN: usize = 3;

/// One entry of a successful sort
#[derive(Debug, Clone, Serialize)]
pub struct SortedNode {
    index: usize,
    rank: usize,
    full_name: String,
    #[serde(skip)]
    item: ItemHandle,
    is_container: bool,
    is_container_head: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_index: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children_indexes: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requires: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requires_indexes: Vec<usize>,
}

impl SortedNode {
    /// Position in the final order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Item name, or `Name.Head` for a container head
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The item; a head exposes the container item it opens
    pub fn item(&self) -> &ItemHandle {
        &self.item
    }

    pub fn is_container(&self) -> bool {
        self.is_container
    }

    pub fn is_container_head(&self) -> bool {
        self.is_container_head
    }

    /// Name of the container this entry belongs to
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Index of the container body this entry belongs to
    pub fn container_index(&self) -> Option<usize> {
        self.container_index
    }

    /// Index of the head of this container
    pub fn head_index(&self) -> Option<usize> {
        self.head_index
    }

    /// Index of the container this head opens
    pub fn owner_index(&self) -> Option<usize> {
        self.owner_index
    }

    /// Names of the children of this container
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Indexes of the children, parallel to [`SortedNode::children`]
    pub fn children_indexes(&self) -> &[usize] {
        &self.children_indexes
    }

    /// Names of the resolved strong requirements that ordered this entry
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Indexes of the requirements, parallel to [`SortedNode::requires`].
    /// Unlike names, these never confuse an item with a container head
    /// whose display name it shares.
    pub fn requires_indexes(&self) -> &[usize] {
        &self.requires_indexes
    }

    /// Short label of the entry kind
    pub fn kind_label(&self) -> &'static str {
        if self.is_container_head {
            "head"
        } else if self.is_container {
            "container"
        } else {
            "item"
        }
    }
}

/// How two consecutive cycle entries relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleRelation {
    /// First entry of the cycle
    Start,
    /// The previous entry contains this one
    Contains,
    /// The previous entry is contained by this one
    ContainedBy,
    /// The previous entry requires this one
    Requires,
    /// This entry declared the previous one in its `required_by`
    RequiredByRequires,
}

impl CycleRelation {
    pub fn symbol(&self) -> &'static str {
        match self {
            CycleRelation::Start => "",
            CycleRelation::Contains => "⊐",
            CycleRelation::ContainedBy => "∈",
            CycleRelation::Requires => "⇀",
            CycleRelation::RequiredByRequires => "↽",
        }
    }
}

/// One entry of an explained cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleStep {
    relation: CycleRelation,
    full_name: String,
    #[serde(skip)]
    item: ItemHandle,
}

impl CycleStep {
    /// Relation between the previous entry and this one
    pub fn relation(&self) -> CycleRelation {
        self.relation
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn item(&self) -> &ItemHandle {
        &self.item
    }
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relation {
            CycleRelation::Start => f.write_str(&self.full_name),
            other => write!(f, "{} {}", other.symbol(), self.full_name),
        }
    }
}

/// Outcome of a sort
#[derive(Debug, Clone)]
pub struct SortResult {
    sorted: Option<Vec<SortedNode>>,
    cycle: Option<Vec<CycleStep>>,
    issues: Vec<Issue>,
}

impl SortResult {
    /// Ordered entries, absent when a cycle was detected
    pub fn sorted_items(&self) -> Option<&[SortedNode]> {
        self.sorted.as_deref()
    }

    /// Items of the first cycle found; the first and last are the same item
    pub fn cycle_detected(&self) -> Option<Vec<ItemHandle>> {
        self.cycle
            .as_ref()
            .map(|steps| steps.iter().map(|step| step.item.clone()).collect())
    }

    /// The cycle with the relation linking each entry to the previous one
    pub fn cycle_explained(&self) -> Option<&[CycleStep]> {
        self.cycle.as_deref()
    }

    /// The cycle as a single line (`A ⇀ B ⇀ A`)
    pub fn cycle_description(&self) -> Option<String> {
        self.cycle.as_ref().map(|steps| {
            steps
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    /// Every issue, including purely informational ones (missing optional
    /// requirements)
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Issues carrying at least one structural error flag
    pub fn structural_errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_structural_error())
    }

    pub fn structural_error_count(&self) -> usize {
        self.structural_errors().count()
    }

    pub fn has_structure_error(&self) -> bool {
        self.structural_error_count() > 0
    }

    /// Returns true when a strong requirement could not be resolved
    pub fn has_required_missing(&self) -> bool {
        self.issues.iter().any(|issue| issue.required_missing_count() > 0)
    }

    /// No cycle and no structural error: the order can be trusted
    pub fn is_complete(&self) -> bool {
        self.cycle.is_none() && !self.has_structure_error()
    }

    /// Finds a sorted entry by name (case-insensitive)
    ///
    /// An item whose name collides with a head display name (`C.Head`) wins
    /// over the head; use [`SortResult::find_head`] to reach the head.
    pub fn find(&self, name: &str) -> Option<&SortedNode> {
        let key = name_key(name);
        self.sorted
            .as_ref()?
            .iter()
            .filter(|node| name_key(&node.full_name) == key)
            .min_by_key(|node| node.is_container_head)
    }

    /// Finds the head of a container by the container's name
    pub fn find_head(&self, container: &str) -> Option<&SortedNode> {
        let key = name_key(container);
        let sorted = self.sorted.as_ref()?;
        sorted.iter().find(|node| {
            node.owner_index
                .is_some_and(|owner| name_key(&sorted[owner].full_name) == key)
        })
    }
}

/// Packages a ranking into a result
pub(crate) fn build(mut table: NodeTable, ranking: Ranking, reverse_names: bool) -> SortResult {
    let issues = table.take_issues();
    match ranking {
        Ranking::Ranked(ranks) => SortResult {
            sorted: Some(sorted_nodes(&table, &ranks, reverse_names)),
            cycle: None,
            issues,
        },
        Ranking::Cycle(nodes) => SortResult {
            sorted: None,
            cycle: Some(explain_cycle(&table, &nodes)),
            issues,
        },
    }
}

fn sorted_nodes(table: &NodeTable, ranks: &[usize], reverse_names: bool) -> Vec<SortedNode> {
    let mut order: Vec<NodeId> = table.ids().collect();
    order.sort_by(|&a, &b| {
        ranks[a].cmp(&ranks[b]).then_with(|| {
            let by_name = table.node(a).key.cmp(&table.node(b).key);
            if reverse_names {
                by_name.reverse()
            } else {
                by_name
            }
        })
    });

    let index_of: HashMap<NodeId, usize> = order
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();

    order
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            let node = table.node(id);
            let (head_index, owner_index) = match node.kind {
                NodeKind::Body { head } => (index_of.get(&head).copied(), None),
                NodeKind::Head { owner } => (None, index_of.get(&owner).copied()),
                NodeKind::Item => (None, None),
            };

            let container = table.container_of(id);
            let requires = effective_requires(table, id);

            SortedNode {
                index,
                rank: ranks[id],
                full_name: table.display_name(id),
                item: node.item.clone(),
                is_container: node.is_body(),
                is_container_head: node.is_head(),
                container: container.map(|c| table.display_name(c)),
                container_index: container.map(|c| index_of[&c]),
                head_index,
                owner_index,
                children: node.children.iter().map(|&c| table.display_name(c)).collect(),
                children_indexes: node.children.iter().map(|c| index_of[c]).collect(),
                requires: requires.iter().map(|&r| table.display_name(r)).collect(),
                requires_indexes: requires.iter().map(|r| index_of[r]).collect(),
            }
        })
        .collect()
}

/// Strong resolved requirements that actually order `id`
fn effective_requires(table: &NodeTable, id: NodeId) -> Vec<NodeId> {
    let node = table.node(id);
    let declared = |owner: NodeId| -> Vec<NodeId> {
        table
            .node(owner)
            .requires
            .iter()
            .filter(|r| r.strong)
            .filter_map(|r| r.target)
            .collect()
    };
    let reverse = || node.reverse_requires.iter().copied();

    match node.kind {
        NodeKind::Head { owner } => declared(owner),
        NodeKind::Body { .. } => reverse().collect(),
        NodeKind::Item => {
            let mut names = declared(id);
            names.extend(reverse());
            names
        }
    }
}

/// Maps cycle nodes to items and labels each link
fn explain_cycle(table: &NodeTable, nodes: &[NodeId]) -> Vec<CycleStep> {
    // A head and its body stand for the same item
    let mut entries: Vec<NodeId> = Vec::with_capacity(nodes.len());
    let mut previous: Option<NodeId> = None;
    for &node in nodes {
        let item = table.item_node(node);
        let same_item_other_node = previous
            .map(|p| p != node && table.item_node(p) == item)
            .unwrap_or(false);
        if !same_item_other_node {
            entries.push(item);
        }
        previous = Some(node);
    }

    let prefer_structural = entries.len() > SHORT_CYCLE_LEN;
    entries
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let relation = if i == 0 {
                CycleRelation::Start
            } else {
                relation(table, entries[i - 1], id, prefer_structural)
            };
            CycleStep {
                relation,
                full_name: table.display_name(id),
                item: table.node(id).item.clone(),
            }
        })
        .collect()
}

/// Relation through which `from` depends on `to`
fn relation(table: &NodeTable, from: NodeId, to: NodeId, prefer_structural: bool) -> CycleRelation {
    let from_node = table.node(from);
    let to_node = table.node(to);

    let contains = to_node.container == Some(from);
    let contained_by = from_node.container == Some(to);
    let requires = from_node.requires.iter().any(|r| r.target == Some(to));
    let required_by_requires = from_node.reverse_requires.contains(&to);

    let structural = [
        (contains, CycleRelation::Contains),
        (contained_by, CycleRelation::ContainedBy),
    ];
    let logical = [
        (requires, CycleRelation::Requires),
        (required_by_requires, CycleRelation::RequiredByRequires),
    ];

    let (first, second) = if prefer_structural {
        (structural, logical)
    } else {
        (logical, structural)
    };

    first
        .iter()
        .chain(second.iter())
        .find(|(applies, _)| *applies)
        .map(|&(_, relation)| relation)
        .unwrap_or(CycleRelation::Requires)
}
