// SPDX-License-Identifier: LGPL-3.0-only
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use super::{prop, ExportError, ExportSink, ItemId, PropertyValue, ServerId, Status, DISPLAY_MENUBAR};

/// One exported item.
#[derive(Debug, Clone, Default)]
pub struct ExportItem {
    /// Current properties.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Attached children in order.
    pub children: Vec<ItemId>,
    /// Attached parent.
    pub parent: Option<ItemId>,
}

/// One export server.
#[derive(Debug, Clone)]
pub struct ExportServer {
    /// Advertised object path.
    pub path: String,
    /// Root item.
    pub root: Option<ItemId>,
    /// Attention state.
    pub status: Status,
    /// Layout revision, bumped on every structural change.
    pub revision: u32,
}

/// Operation counters, mostly useful to tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Items allocated.
    pub created: usize,
    /// Items freed.
    pub destroyed: usize,
    /// Child attachments.
    pub inserted: usize,
    /// Child detachments.
    pub deleted: usize,
    /// Submenus presented on request.
    pub shown: usize,
}

/// A change a protocol layer has to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportChange {
    /// The children of `parent` changed.
    Layout {
        /// Affected server.
        server: ServerId,
        /// Parent item whose children changed.
        parent: ItemId,
    },
    /// A property was set or removed.
    Property {
        /// Affected server.
        server: ServerId,
        /// Item whose property changed.
        item: ItemId,
        /// Property name.
        key: String,
        /// Whether the property was removed.
        removed: bool,
    },
    /// The server status changed.
    Status(ServerId),
    /// The server asked the shell to present a submenu.
    Show {
        /// Affected server.
        server: ServerId,
        /// Item to present.
        item: ItemId,
        /// Event timestamp.
        timestamp: u32,
    },
}

/// In-memory export sink.
///
/// Used directly by tests and as the shared model a protocol layer serves
/// from. When created with [ExportTree::with_change_log] every mutation that
/// is reachable from a server root is also recorded as an [ExportChange].
#[derive(Debug, Default)]
pub struct ExportTree {
    next_item: u64,
    next_server: u64,
    items: HashMap<ItemId, ExportItem>,
    servers: IndexMap<ServerId, ExportServer>,
    stats: ExportStats,
    record: bool,
    changes: Vec<ExportChange>,
}

impl ExportTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree that records changes.
    pub fn with_change_log() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Look an item up.
    pub fn item(&self, item: ItemId) -> Option<&ExportItem> {
        self.items.get(&item)
    }

    /// Attached children of `item`.
    pub fn children(&self, item: ItemId) -> &[ItemId] {
        self.items
            .get(&item)
            .map(|i| i.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are alive.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look a server up.
    pub fn server(&self, server: ServerId) -> Option<&ExportServer> {
        self.servers.get(&server)
    }

    /// Find the server advertised at `path`.
    pub fn server_by_path(&self, path: &str) -> Option<ServerId> {
        self.servers
            .iter()
            .find(|(_, s)| s.path == path)
            .map(|(id, _)| *id)
    }

    /// All servers.
    pub fn servers(&self) -> impl Iterator<Item = (ServerId, &ExportServer)> {
        self.servers.iter().map(|(id, s)| (*id, s))
    }

    /// Operation counters.
    pub fn stats(&self) -> ExportStats {
        self.stats
    }

    /// The server whose tree contains `item`.
    pub fn server_of(&self, item: ItemId) -> Option<ServerId> {
        let mut current = item;
        while let Some(parent) = self.items.get(&current)?.parent {
            current = parent;
        }
        self.servers
            .iter()
            .find(|(_, s)| s.root == Some(current))
            .map(|(id, _)| *id)
    }

    /// Drain recorded changes.
    pub fn take_changes(&mut self) -> Vec<ExportChange> {
        std::mem::take(&mut self.changes)
    }

    fn layout_changed(&mut self, parent: ItemId) {
        let Some(server) = self.server_of(parent) else {
            return;
        };
        if let Some(entry) = self.servers.get_mut(&server) {
            entry.revision = entry.revision.wrapping_add(1).max(1);
        }
        if self.record {
            self.changes.push(ExportChange::Layout { server, parent });
        }
    }

    fn property_changed(&mut self, item: ItemId, key: &str, removed: bool) {
        if !self.record {
            return;
        }
        if let Some(server) = self.server_of(item) {
            self.changes.push(ExportChange::Property {
                server,
                item,
                key: key.to_string(),
                removed,
            });
        }
    }

    fn check_child(&self, child: ItemId) -> Result<(), ExportError> {
        let entry = self.items.get(&child).ok_or(ExportError::UnknownItem(child))?;
        if entry.parent.is_some() {
            return Err(ExportError::AlreadyParented(child));
        }
        Ok(())
    }
}

impl ExportSink for ExportTree {
    fn create_server(&mut self, path: &str) -> Result<ServerId, ExportError> {
        self.next_server += 1;
        let id = ServerId(self.next_server);
        self.servers.insert(
            id,
            ExportServer {
                path: path.to_string(),
                root: None,
                status: Status::Normal,
                revision: 1,
            },
        );
        Ok(id)
    }

    fn destroy_server(&mut self, server: ServerId) {
        self.servers.shift_remove(&server);
    }

    fn set_root(&mut self, server: ServerId, item: ItemId) -> Result<(), ExportError> {
        if !self.items.contains_key(&item) {
            return Err(ExportError::UnknownItem(item));
        }
        let entry = self
            .servers
            .get_mut(&server)
            .ok_or(ExportError::UnknownServer(server))?;
        entry.root = Some(item);
        if let Some(root) = self.items.get_mut(&item) {
            root.properties.insert(
                prop::CHILDREN_DISPLAY.to_string(),
                PropertyValue::from(DISPLAY_MENUBAR),
            );
        }
        self.layout_changed(item);
        Ok(())
    }

    fn set_status(&mut self, server: ServerId, status: Status) {
        if let Some(entry) = self.servers.get_mut(&server) {
            if entry.status != status {
                entry.status = status;
                if self.record {
                    self.changes.push(ExportChange::Status(server));
                }
            }
        }
    }

    fn create_item(&mut self) -> Result<ItemId, ExportError> {
        self.next_item += 1;
        let id = ItemId(self.next_item);
        self.items.insert(id, ExportItem::default());
        self.stats.created += 1;
        Ok(id)
    }

    fn destroy_item(&mut self, item: ItemId) {
        let Some(entry) = self.items.remove(&item) else {
            return;
        };
        self.stats.destroyed += 1;
        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.items.get_mut(&parent) {
                parent_entry.children.retain(|c| *c != item);
            }
            self.layout_changed(parent);
        }
        for child in entry.children {
            if let Some(child_entry) = self.items.get_mut(&child) {
                child_entry.parent = None;
            }
        }
    }

    fn set_property(&mut self, item: ItemId, key: &str, value: PropertyValue) {
        let Some(entry) = self.items.get_mut(&item) else {
            return;
        };
        if entry.properties.get(key) == Some(&value) {
            return;
        }
        entry.properties.insert(key.to_string(), value);
        self.property_changed(item, key, false);
    }

    fn remove_property(&mut self, item: ItemId, key: &str) {
        let Some(entry) = self.items.get_mut(&item) else {
            return;
        };
        if entry.properties.remove(key).is_some() {
            self.property_changed(item, key, true);
        }
    }

    fn property(&self, item: ItemId, key: &str) -> Option<PropertyValue> {
        self.items.get(&item)?.properties.get(key).cloned()
    }

    fn property_keys(&self, item: ItemId) -> Vec<String> {
        self.items
            .get(&item)
            .map(|i| i.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn insert_child(&mut self, parent: ItemId, child: ItemId, position: usize) -> Result<(), ExportError> {
        self.check_child(child)?;
        let entry = self.items.get_mut(&parent).ok_or(ExportError::UnknownItem(parent))?;
        if position > entry.children.len() {
            return Err(ExportError::Position {
                parent,
                position,
                len: entry.children.len(),
            });
        }
        entry.children.insert(position, child);
        if let Some(child_entry) = self.items.get_mut(&child) {
            child_entry.parent = Some(parent);
        }
        self.stats.inserted += 1;
        self.layout_changed(parent);
        Ok(())
    }

    fn append_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError> {
        let len = self.children(parent).len();
        self.insert_child(parent, child, len)
    }

    fn delete_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError> {
        let entry = self.items.get_mut(&parent).ok_or(ExportError::UnknownItem(parent))?;
        let Some(position) = entry.children.iter().position(|c| *c == child) else {
            return Err(ExportError::NotAChild { parent, child });
        };
        entry.children.remove(position);
        if let Some(child_entry) = self.items.get_mut(&child) {
            child_entry.parent = None;
        }
        self.stats.deleted += 1;
        self.layout_changed(parent);
        Ok(())
    }

    fn show_to_user(&mut self, item: ItemId, timestamp: u32) {
        if !self.items.contains_key(&item) {
            return;
        }
        self.stats.shown += 1;
        if self.record {
            if let Some(server) = self.server_of(item) {
                self.changes.push(ExportChange::Show {
                    server,
                    item,
                    timestamp,
                });
            }
        }
    }

    fn contains(&self, item: ItemId) -> bool {
        self.items.contains_key(&item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_delete_keep_order() {
        let mut tree = ExportTree::new();
        let root = tree.create_item().unwrap();
        let a = tree.create_item().unwrap();
        let b = tree.create_item().unwrap();
        let c = tree.create_item().unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(root, c).unwrap();
        tree.insert_child(root, b, 1).unwrap();
        assert_eq!(tree.children(root), &[a, b, c]);

        tree.delete_child(root, b).unwrap();
        assert_eq!(tree.children(root), &[a, c]);
        assert_eq!(
            tree.delete_child(root, b),
            Err(ExportError::NotAChild { parent: root, child: b })
        );
        assert_eq!(tree.insert_child(root, a, 0), Err(ExportError::AlreadyParented(a)));
    }

    #[test]
    fn test_changes_only_recorded_under_a_server() {
        let mut tree = ExportTree::with_change_log();
        let server = tree.create_server("/com/canonical/menu/1").unwrap();
        let root = tree.create_item().unwrap();
        let detached = tree.create_item().unwrap();
        tree.set_property(detached, prop::LABEL, "x".into());
        assert!(tree.take_changes().is_empty());

        tree.set_root(server, root).unwrap();
        tree.append_child(root, detached).unwrap();
        tree.set_property(detached, prop::LABEL, "y".into());
        let changes = tree.take_changes();
        assert!(changes.contains(&ExportChange::Layout { server, parent: root }));
        assert!(changes.contains(&ExportChange::Property {
            server,
            item: detached,
            key: prop::LABEL.to_string(),
            removed: false,
        }));
        assert!(tree.server(server).unwrap().revision > 1);
    }
}
