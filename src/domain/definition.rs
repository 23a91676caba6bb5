//! Plain data items
//!
//! [`ItemDefinition`] is the ready-made implementation of [`DependentItem`]:
//! it is what manifests deserialize into and what most callers build by hand.
//! References are written as names (`"Db"`, `"?Cache"`) or as inline
//! definitions, which become direct references.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::item::{DependentItem, Discoverer, ItemHandle, ItemRef};

/// Reference as written in a definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionRef {
    /// Name, optionally prefixed with `?`
    Name(String),
    /// Inline item, referenced directly
    Inline(Arc<ItemDefinition>),
}

impl DefinitionRef {
    fn to_item_ref(&self) -> ItemRef {
        match self {
            DefinitionRef::Name(name) => ItemRef::parse(name),
            DefinitionRef::Inline(def) => {
                let handle: ItemHandle = def.clone();
                ItemRef::Direct(handle)
            }
        }
    }
}

impl From<&str> for DefinitionRef {
    fn from(name: &str) -> Self {
        DefinitionRef::Name(name.to_string())
    }
}

impl From<String> for DefinitionRef {
    fn from(name: String) -> Self {
        DefinitionRef::Name(name)
    }
}

impl From<ItemDefinition> for DefinitionRef {
    fn from(def: ItemDefinition) -> Self {
        DefinitionRef::Inline(Arc::new(def))
    }
}

impl From<&Arc<ItemDefinition>> for DefinitionRef {
    fn from(def: &Arc<ItemDefinition>) -> Self {
        DefinitionRef::Inline(Arc::clone(def))
    }
}

/// A dependent item described by data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Full name of the item
    pub name: String,

    /// Items that must come first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<DefinitionRef>,

    /// Items that must come after this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_by: Vec<DefinitionRef>,

    /// Container of this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<DefinitionRef>,

    /// Children; present (even empty) for containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DefinitionRef>>,

    /// Related items registered along with this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Arc<ItemDefinition>>,
}

impl ItemDefinition {
    /// Creates a plain item with no relations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an empty container
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn with_requires<R>(mut self, refs: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<DefinitionRef>,
    {
        self.requires.extend(refs.into_iter().map(Into::into));
        self
    }

    pub fn with_required_by<R>(mut self, refs: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<DefinitionRef>,
    {
        self.required_by.extend(refs.into_iter().map(Into::into));
        self
    }

    pub fn in_container(mut self, container: impl Into<DefinitionRef>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Adds children, turning the item into a container
    pub fn with_children<R>(mut self, refs: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<DefinitionRef>,
    {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(refs.into_iter().map(Into::into));
        self
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = ItemDefinition>) -> Self {
        self.related.extend(related.into_iter().map(Arc::new));
        self
    }

    /// Wraps the definition into a shareable handle
    pub fn into_handle(self) -> ItemHandle {
        Arc::new(self)
    }
}

impl DependentItem for ItemDefinition {
    fn full_name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> Vec<ItemRef> {
        self.requires.iter().map(DefinitionRef::to_item_ref).collect()
    }

    fn required_by(&self) -> Vec<ItemRef> {
        self.required_by.iter().map(DefinitionRef::to_item_ref).collect()
    }

    fn container(&self) -> Option<ItemRef> {
        self.container.as_ref().map(DefinitionRef::to_item_ref)
    }

    fn children(&self) -> Option<Vec<ItemRef>> {
        self.children
            .as_ref()
            .map(|refs| refs.iter().map(DefinitionRef::to_item_ref).collect())
    }

    fn discoverer(&self) -> Option<&dyn Discoverer> {
        if self.related.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl Discoverer for ItemDefinition {
    fn related_items(&self) -> Vec<ItemHandle> {
        self.related
            .iter()
            .map(|def| {
                let handle: ItemHandle = def.clone();
                handle
            })
            .collect()
    }
}
