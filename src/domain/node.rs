//! Node arena built by the registrar
//!
//! Every registered item owns one node; a container item owns two (its body
//! and its head). Nodes reference each other by [`NodeId`], an index into the
//! arena, so containment and requirements never need shared ownership.

use std::collections::{BTreeMap, HashMap};

use super::issue::Issue;
use super::item::ItemHandle;

/// Index of a node in the arena
pub(crate) type NodeId = usize;

/// Suffix appended to a container key to form its head key. The NUL
/// character keeps it apart from any name an item can declare.
const HEAD_KEY_SUFFIX: &str = "\u{0}head";

/// Suffix of the display name of a head node
pub const HEAD_NAME_SUFFIX: &str = ".Head";

/// Role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Item that is not a container
    Item,
    /// Container item; closes once all its content is ready
    Body { head: NodeId },
    /// Synthetic node opening a container
    Head { owner: NodeId },
}

/// A requirement declared by an item, deduplicated by name
#[derive(Debug, Clone)]
pub(crate) struct Requirement {
    pub name: String,
    pub key: String,
    pub strong: bool,
    pub target: Option<NodeId>,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub key: String,
    pub item: ItemHandle,
    pub kind: NodeKind,
    /// Body of the container this node belongs to (unused on heads)
    pub container: Option<NodeId>,
    /// Declared requirements (unused on heads)
    pub requires: Vec<Requirement>,
    /// Nodes that declared this one in their `required_by`
    pub reverse_requires: Vec<NodeId>,
    /// Content of a container body
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(key: String, item: ItemHandle, kind: NodeKind) -> Self {
        Self {
            key,
            item,
            kind,
            container: None,
            requires: Vec::new(),
            reverse_requires: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self.kind, NodeKind::Head { .. })
    }

    pub fn is_body(&self) -> bool {
        matches!(self.kind, NodeKind::Body { .. })
    }

    /// Head of this node when it is a container body
    pub fn head(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Body { head } => Some(head),
            _ => None,
        }
    }
}

/// Arena of nodes with name lookup and the issues recorded so far
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
    nodes: Vec<Node>,
    by_key: HashMap<String, NodeId>,
    issues: BTreeMap<NodeId, Issue>,
}

impl NodeTable {
    /// Adds a plain item node
    pub fn add_item(&mut self, key: String, item: ItemHandle) -> NodeId {
        let id = self.nodes.len();
        self.by_key.insert(key.clone(), id);
        self.nodes.push(Node::new(key, item, NodeKind::Item));
        id
    }

    /// Adds a container body together with its head; returns the body
    pub fn add_container(&mut self, key: String, item: ItemHandle) -> NodeId {
        let body = self.nodes.len();
        let head = body + 1;
        self.by_key.insert(key.clone(), body);
        let head_key = format!("{}{}", key, HEAD_KEY_SUFFIX);
        self.nodes.push(Node::new(key, item.clone(), NodeKind::Body { head }));
        self.nodes.push(Node::new(head_key, item, NodeKind::Head { owner: body }));
        body
    }

    /// Looks up a body or item node by name key
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    /// Maps a head to the body owning it; other nodes map to themselves
    pub fn item_node(&self, id: NodeId) -> NodeId {
        match self.nodes[id].kind {
            NodeKind::Head { owner } => owner,
            _ => id,
        }
    }

    /// Resolved container body of a node. A head belongs where its owner does.
    pub fn container_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[self.item_node(id)].container
    }

    /// Display name of a node (`Name.Head` for heads)
    pub fn display_name(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        if node.is_head() {
            format!("{}{}", node.item.full_name(), HEAD_NAME_SUFFIX)
        } else {
            node.item.full_name().to_string()
        }
    }

    /// Issue of the item owning `id`, created on first use
    pub fn issue_mut(&mut self, id: NodeId) -> &mut Issue {
        let id = self.item_node(id);
        let item = &self.nodes[id].item;
        self.issues
            .entry(id)
            .or_insert_with(|| Issue::new(item.clone()))
    }

    /// Issues in registration order, dropping empty ones
    pub fn take_issues(&mut self) -> Vec<Issue> {
        std::mem::take(&mut self.issues)
            .into_values()
            .filter(|issue| !issue.is_empty())
            .collect()
    }
}
