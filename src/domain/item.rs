//! Item interface consumed by the sorter
//!
//! Items are supplied by callers and are read-only from the sorter's point of
//! view. References between items are either direct handles or names that are
//! resolved once every item has been registered.

use std::fmt;
use std::sync::Arc;

/// Marker prefix for optional requirement names (`?Name`)
pub const OPTIONAL_MARKER: char = '?';

/// Shared handle to an item
pub type ItemHandle = Arc<dyn DependentItem>;

/// A named unit to be ordered
pub trait DependentItem: fmt::Debug + Send + Sync {
    /// Unique, case-insensitive name of the item
    fn full_name(&self) -> &str;

    /// Items that must come before this one
    fn requires(&self) -> Vec<ItemRef> {
        Vec::new()
    }

    /// Items that must come after this one (always strong)
    fn required_by(&self) -> Vec<ItemRef> {
        Vec::new()
    }

    /// The container this item belongs to, if any
    fn container(&self) -> Option<ItemRef> {
        None
    }

    /// Children of this item. `Some` (even empty) makes the item a container.
    fn children(&self) -> Option<Vec<ItemRef>> {
        None
    }

    /// Capability to yield related items that must be registered as well
    fn discoverer(&self) -> Option<&dyn Discoverer> {
        None
    }
}

/// Yields additional items to register
pub trait Discoverer: fmt::Debug + Send + Sync {
    fn related_items(&self) -> Vec<ItemHandle>;
}

/// Reference to another item
#[derive(Clone)]
pub enum ItemRef {
    /// Direct handle, registered eagerly
    Direct(ItemHandle),
    /// Name resolved after registration
    Named(String),
    /// Name resolved after registration; absence is not an error
    OptionalNamed(String),
}

impl ItemRef {
    /// Parses a name reference, mapping a leading `?` to an optional one
    pub fn parse(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match name.strip_prefix(OPTIONAL_MARKER) {
            Some(stripped) => ItemRef::OptionalNamed(stripped.to_string()),
            None => ItemRef::Named(name.to_string()),
        }
    }

    /// Creates a direct reference
    pub fn direct(item: &ItemHandle) -> Self {
        ItemRef::Direct(Arc::clone(item))
    }

    /// Returns the referenced name (without the optional marker)
    pub fn name(&self) -> &str {
        match self {
            ItemRef::Direct(item) => item.full_name(),
            ItemRef::Named(name) | ItemRef::OptionalNamed(name) => name,
        }
    }

    /// Returns true unless this is an optional name reference
    pub fn is_strong(&self) -> bool {
        !matches!(self, ItemRef::OptionalNamed(_))
    }
}

impl fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Direct(item) => write!(f, "Direct({})", item.full_name()),
            ItemRef::Named(name) => write!(f, "Named({})", name),
            ItemRef::OptionalNamed(name) => write!(f, "OptionalNamed({})", name),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::OptionalNamed(name) => write!(f, "{}{}", OPTIONAL_MARKER, name),
            other => f.write_str(other.name()),
        }
    }
}

impl From<&str> for ItemRef {
    fn from(name: &str) -> Self {
        ItemRef::parse(name)
    }
}

impl From<String> for ItemRef {
    fn from(name: String) -> Self {
        ItemRef::parse(name)
    }
}

impl From<&ItemHandle> for ItemRef {
    fn from(item: &ItemHandle) -> Self {
        ItemRef::direct(item)
    }
}

/// Case-insensitive identity of a name
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Identity of an item instance (the address behind its handle)
pub(crate) fn instance_id(item: &ItemHandle) -> usize {
    Arc::as_ptr(item) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain(&'static str);

    impl DependentItem for Plain {
        fn full_name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn parse_plain_name() {
        let r = ItemRef::parse("Db.Tables");
        assert!(matches!(r, ItemRef::Named(ref n) if n == "Db.Tables"));
        assert!(r.is_strong());
    }

    #[test]
    fn parse_optional_name() {
        let r = ItemRef::parse("?Cache");
        assert!(matches!(r, ItemRef::OptionalNamed(ref n) if n == "Cache"));
        assert!(!r.is_strong());
        assert_eq!(r.name(), "Cache");
        assert_eq!(r.to_string(), "?Cache");
    }

    #[test]
    fn direct_reference_uses_item_name() {
        let item: ItemHandle = Arc::new(Plain("App"));
        let r = ItemRef::from(&item);
        assert_eq!(r.name(), "App");
        assert!(r.is_strong());
    }

    #[test]
    fn name_key_is_case_insensitive() {
        assert_eq!(name_key("Db.Tables"), name_key("DB.TABLES"));
    }

    #[test]
    fn clones_share_instance_identity() {
        let a: ItemHandle = Arc::new(Plain("A"));
        let b: ItemHandle = Arc::new(Plain("A"));
        assert_eq!(instance_id(&a), instance_id(&Arc::clone(&a)));
        assert_ne!(instance_id(&a), instance_id(&b));
    }
}
