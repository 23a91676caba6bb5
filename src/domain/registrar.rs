//! Registration of items into the node table
//!
//! Items are walked once each. Direct references are registered right away
//! (through a worklist, so deep chains of inline items do not recurse); name
//! references are collected and resolved in a post-pass once every item is
//! known. Structural problems are recorded as issues and never abort.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::item::{instance_id, name_key, Discoverer, ItemHandle, ItemRef};
use super::node::{NodeId, NodeTable, Requirement};
use super::sorter::SorterError;

/// Builds the node table for a set of items and discoverers
pub(crate) fn register(
    items: &[ItemHandle],
    discoverers: &[&dyn Discoverer],
) -> Result<NodeTable, SorterError> {
    let mut registrar = Registrar::default();

    for item in items {
        registrar.ensure_registered(item)?;
    }
    registrar.drain()?;

    for discoverer in discoverers {
        for item in discoverer.related_items() {
            registrar.ensure_registered(&item)?;
        }
        registrar.drain()?;
    }

    Ok(registrar.finish())
}

#[derive(Default)]
struct Registrar {
    table: NodeTable,
    /// Instance address to node, so a handle seen twice is walked once
    by_instance: HashMap<usize, NodeId>,
    /// Registered items whose references are not walked yet
    pending: VecDeque<(NodeId, ItemHandle)>,
    deferred_containers: Vec<(NodeId, String)>,
    deferred_children: Vec<(NodeId, String)>,
    deferred_required_by: Vec<(NodeId, String)>,
}

impl Registrar {
    /// Returns the node of `item`, creating it (and queuing its references)
    /// on first sight
    fn ensure_registered(&mut self, item: &ItemHandle) -> Result<NodeId, SorterError> {
        let instance = instance_id(item);
        if let Some(&id) = self.by_instance.get(&instance) {
            return Ok(id);
        }

        let name = item.full_name();
        if name.is_empty() {
            return Err(SorterError::EmptyName);
        }

        let key = name_key(name);
        if let Some(id) = self.table.find(&key) {
            debug!(item = name, "homonym detected, keeping the first instance");
            self.table.issue_mut(id).add_homonym(item.clone());
            self.by_instance.insert(instance, id);
            return Ok(id);
        }

        let id = if item.children().is_some() {
            self.table.add_container(key, item.clone())
        } else {
            self.table.add_item(key, item.clone())
        };
        debug!(item = name, node = id, "registered");

        self.by_instance.insert(instance, id);
        self.pending.push_back((id, item.clone()));
        Ok(id)
    }

    /// Walks the references of every pending item
    fn drain(&mut self) -> Result<(), SorterError> {
        while let Some((id, item)) = self.pending.pop_front() {
            self.walk(id, &item)?;
        }
        Ok(())
    }

    fn walk(&mut self, id: NodeId, item: &ItemHandle) -> Result<(), SorterError> {
        if let Some(container) = item.container() {
            match container {
                ItemRef::Direct(target) => {
                    let target_id = self.ensure_registered(&target)?;
                    self.claim(id, target_id);
                }
                named => {
                    let name = checked_name(item, &named)?;
                    self.deferred_containers.push((id, name));
                }
            }
        }

        if let Some(children) = item.children() {
            for child in children {
                match child {
                    ItemRef::Direct(target) => {
                        let child_id = self.ensure_registered(&target)?;
                        self.claim(child_id, id);
                    }
                    named => {
                        let name = checked_name(item, &named)?;
                        self.deferred_children.push((id, name));
                    }
                }
            }
        }

        for requirement in item.requires() {
            let strong = requirement.is_strong();
            let name = match requirement {
                ItemRef::Direct(target) => {
                    self.ensure_registered(&target)?;
                    target.full_name().to_string()
                }
                named => checked_name(item, &named)?,
            };
            self.add_requirement(id, name, strong);
        }

        for reverse in item.required_by() {
            match reverse {
                ItemRef::Direct(target) => {
                    let target_id = self.ensure_registered(&target)?;
                    self.add_reverse_requirement(target_id, id);
                }
                named => {
                    let name = checked_name(item, &named)?;
                    self.deferred_required_by.push((id, name));
                }
            }
        }

        if let Some(discoverer) = item.discoverer() {
            for related in discoverer.related_items() {
                self.ensure_registered(&related)?;
            }
        }

        Ok(())
    }

    /// Binds `child` to `container`. The first claim wins; a different later
    /// claim is recorded on the child.
    fn claim(&mut self, child: NodeId, container: NodeId) {
        if !self.table.node(container).is_body() {
            let name = self.table.display_name(container);
            self.table.issue_mut(child).set_not_a_container(&name);
            return;
        }

        match self.table.node(child).container {
            None => self.table.node_mut(child).container = Some(container),
            Some(existing) if existing == container => {}
            Some(_) => {
                let name = self.table.display_name(container);
                debug!(child = child, container = %name, "item already has a container");
                self.table.issue_mut(child).add_extraneous_container(&name);
            }
        }
    }

    /// Records a requirement. A strong one promotes an optional one with the
    /// same name; an optional one never demotes a strong one.
    fn add_requirement(&mut self, id: NodeId, name: String, strong: bool) {
        let key = name_key(&name);
        let node = self.table.node_mut(id);
        if let Some(existing) = node.requires.iter_mut().find(|r| r.key == key) {
            if strong && !existing.strong {
                existing.strong = true;
                existing.name = name;
            }
            return;
        }

        node.requires.push(Requirement {
            name,
            key,
            strong,
            target: None,
        });
    }

    /// `source` declared `target` in its `required_by`: `target` requires `source`
    fn add_reverse_requirement(&mut self, target: NodeId, source: NodeId) {
        let node = self.table.node_mut(target);
        if !node.reverse_requires.contains(&source) {
            node.reverse_requires.push(source);
        }
    }

    /// Resolves deferred names and requirements, then fills children lists
    fn finish(mut self) -> NodeTable {
        for (id, name) in std::mem::take(&mut self.deferred_containers) {
            match self.table.find(&name_key(&name)) {
                None => {
                    debug!(container = %name, "missing named container");
                    self.table.issue_mut(id).set_missing_container(&name);
                }
                Some(target) if !self.table.node(target).is_body() => {
                    self.table.issue_mut(id).set_not_a_container(&name);
                }
                Some(target) => self.claim(id, target),
            }
        }

        for (container, name) in std::mem::take(&mut self.deferred_children) {
            match self.table.find(&name_key(&name)) {
                None => {
                    debug!(child = %name, "missing named child");
                    self.table.issue_mut(container).add_missing_child(&name);
                }
                Some(child) => self.claim(child, container),
            }
        }

        for (source, name) in std::mem::take(&mut self.deferred_required_by) {
            match self.table.find(&name_key(&name)) {
                Some(target) => self.add_reverse_requirement(target, source),
                None => debug!(required_by = %name, "ignoring unknown required-by target"),
            }
        }

        self.resolve_requirements();
        self.fill_children();
        self.table
    }

    fn resolve_requirements(&mut self) {
        for id in self.table.ids() {
            let mut missing = Vec::new();
            let mut requires = std::mem::take(&mut self.table.node_mut(id).requires);
            for requirement in &mut requires {
                requirement.target = self.table.find(&requirement.key);
                if requirement.target.is_none() {
                    missing.push((requirement.name.clone(), requirement.strong));
                }
            }
            self.table.node_mut(id).requires = requires;

            for (name, strong) in missing {
                debug!(requirement = %name, strong, "unresolved requirement");
                self.table.issue_mut(id).add_missing_requirement(&name, strong);
            }
        }
    }

    fn fill_children(&mut self) {
        for id in self.table.ids() {
            if self.table.node(id).is_head() {
                continue;
            }
            if let Some(container) = self.table.node(id).container {
                self.table.node_mut(container).children.push(id);
            }
        }
    }
}

/// Extracts the target name of a name reference, rejecting empty ones
fn checked_name(item: &ItemHandle, reference: &ItemRef) -> Result<String, SorterError> {
    let name = reference.name();
    if name.is_empty() {
        return Err(SorterError::EmptyReference {
            item: item.full_name().to_string(),
        });
    }
    Ok(name.to_string())
}
