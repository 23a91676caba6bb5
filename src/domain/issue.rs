//! Structural issues collected while registering and resolving items
//!
//! Issues never stop a sort. Each one is keyed by the item it concerns and
//! accumulates flags plus the names that caused them.

use bitflags::bitflags;
use serde::Serialize;

use super::item::{ItemHandle, OPTIONAL_MARKER};

bitflags! {
    /// Kinds of structural error recorded on an item
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct IssueFlags: u8 {
        /// The container name does not match any item
        const MISSING_NAMED_CONTAINER = 0b0000_0001;
        /// The container reference designates an item that is not a container
        const EXISTING_ITEM_IS_NOT_A_CONTAINER = 0b0000_0010;
        /// The item is claimed by more than one container
        const MULTIPLE_CONTAINER = 0b0000_0100;
        /// A child name does not match any item
        const MISSING_NAMED_CHILD = 0b0000_1000;
        /// A strong requirement does not match any item
        const MISSING_DEPENDENCY = 0b0001_0000;
        /// Another item instance shares this item's name
        const HOMONYM = 0b0010_0000;
    }
}

impl IssueFlags {
    /// Returns a display label for each flag set
    pub fn labels(&self) -> Vec<&'static str> {
        self.iter_names()
            .map(|(name, _)| match name {
                "MISSING_NAMED_CONTAINER" => "missing named container",
                "EXISTING_ITEM_IS_NOT_A_CONTAINER" => "existing item is not a container",
                "MULTIPLE_CONTAINER" => "multiple container",
                "MISSING_NAMED_CHILD" => "missing named child",
                "MISSING_DEPENDENCY" => "missing dependency",
                "HOMONYM" => "homonym",
                _ => "unknown",
            })
            .collect()
    }
}

/// An unresolved requirement name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRequirement {
    pub name: String,
    pub strong: bool,
}

impl std::fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.strong {
            f.write_str(&self.name)
        } else {
            write!(f, "{}{}", OPTIONAL_MARKER, self.name)
        }
    }
}

/// Structural problems attached to one item
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    #[serde(skip)]
    item: ItemHandle,
    full_name: String,
    flags: IssueFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    invalid_container: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extraneous_containers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_children: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_requires: Vec<MissingRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_names")]
    homonyms: Vec<ItemHandle>,
}

fn serialize_names<S: serde::Serializer>(items: &[ItemHandle], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(items.iter().map(|item| item.full_name()))
}

impl Issue {
    pub(crate) fn new(item: ItemHandle) -> Self {
        Self {
            full_name: item.full_name().to_string(),
            item,
            flags: IssueFlags::empty(),
            invalid_container: None,
            extraneous_containers: Vec::new(),
            missing_children: Vec::new(),
            missing_requires: Vec::new(),
            homonyms: Vec::new(),
        }
    }

    /// The item this issue concerns
    pub fn item(&self) -> &ItemHandle {
        &self.item
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn flags(&self) -> IssueFlags {
        self.flags
    }

    /// Container name that could not be used (missing, or not a container)
    pub fn invalid_container(&self) -> Option<&str> {
        self.invalid_container.as_deref()
    }

    /// Containers that claimed this item after the first one
    pub fn extraneous_containers(&self) -> &[String] {
        &self.extraneous_containers
    }

    pub fn missing_children(&self) -> &[String] {
        &self.missing_children
    }

    /// Every unresolved requirement, strong and optional
    pub fn missing_requires(&self) -> &[MissingRequirement] {
        &self.missing_requires
    }

    /// Other item instances sharing this item's name
    ///
    /// Only the first instance registered under a name takes part in the
    /// sort. The instances listed here do not appear in the sorted order;
    /// their container, children, requirements and related items are
    /// ignored.
    pub fn homonyms(&self) -> &[ItemHandle] {
        &self.homonyms
    }

    /// Number of unresolved strong requirements
    pub fn required_missing_count(&self) -> usize {
        self.missing_requires.iter().filter(|m| m.strong).count()
    }

    /// Returns true when at least one structural error flag is set
    pub fn is_structural_error(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Returns true when nothing at all was recorded
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.missing_requires.is_empty()
    }

    pub(crate) fn set_missing_container(&mut self, name: &str) {
        self.flags |= IssueFlags::MISSING_NAMED_CONTAINER;
        self.invalid_container = Some(name.to_string());
    }

    pub(crate) fn set_not_a_container(&mut self, name: &str) {
        self.flags |= IssueFlags::EXISTING_ITEM_IS_NOT_A_CONTAINER;
        self.invalid_container = Some(name.to_string());
    }

    pub(crate) fn add_extraneous_container(&mut self, name: &str) {
        self.flags |= IssueFlags::MULTIPLE_CONTAINER;
        if !self.extraneous_containers.iter().any(|n| n == name) {
            self.extraneous_containers.push(name.to_string());
        }
    }

    pub(crate) fn add_missing_child(&mut self, name: &str) {
        self.flags |= IssueFlags::MISSING_NAMED_CHILD;
        self.missing_children.push(name.to_string());
    }

    pub(crate) fn add_missing_requirement(&mut self, name: &str, strong: bool) {
        if strong {
            self.flags |= IssueFlags::MISSING_DEPENDENCY;
        }
        self.missing_requires.push(MissingRequirement {
            name: name.to_string(),
            strong,
        });
    }

    pub(crate) fn add_homonym(&mut self, other: ItemHandle) {
        self.flags |= IssueFlags::HOMONYM;
        self.homonyms.push(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemDefinition;
    use std::sync::Arc;

    fn issue() -> Issue {
        Issue::new(Arc::new(ItemDefinition::new("App")))
    }

    #[test]
    fn new_issue_is_empty() {
        let issue = issue();
        assert!(issue.is_empty());
        assert!(!issue.is_structural_error());
        assert_eq!(issue.full_name(), "App");
    }

    #[test]
    fn optional_missing_is_not_structural() {
        let mut issue = issue();
        issue.add_missing_requirement("Cache", false);

        assert!(!issue.is_empty());
        assert!(!issue.is_structural_error());
        assert_eq!(issue.required_missing_count(), 0);
        assert_eq!(issue.missing_requires()[0].to_string(), "?Cache");
    }

    #[test]
    fn strong_missing_sets_flag() {
        let mut issue = issue();
        issue.add_missing_requirement("Db", true);

        assert!(issue.flags().contains(IssueFlags::MISSING_DEPENDENCY));
        assert_eq!(issue.required_missing_count(), 1);
    }

    #[test]
    fn extraneous_containers_are_deduplicated() {
        let mut issue = issue();
        issue.add_extraneous_container("Other");
        issue.add_extraneous_container("Other");

        assert_eq!(issue.extraneous_containers(), ["Other".to_string()]);
        assert!(issue.flags().contains(IssueFlags::MULTIPLE_CONTAINER));
    }

    #[test]
    fn flag_labels() {
        let flags = IssueFlags::HOMONYM | IssueFlags::MISSING_NAMED_CHILD;
        assert_eq!(flags.labels(), vec!["missing named child", "homonym"]);
    }
}
