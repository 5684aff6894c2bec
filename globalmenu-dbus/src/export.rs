// SPDX-License-Identifier: LGPL-3.0-only
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use globalmenu_core::export::{ExportError, ExportSink, ExportTree, ItemId, PropertyValue, ServerId, Status};

/// Export sink shared between the engine thread and the bus thread.
///
/// The engine mutates the tree through [ExportSink]; the bus thread answers
/// dbusmenu calls from the same tree and drains its change log into signals.
#[derive(Debug, Clone)]
pub struct DbusExport {
    tree: Arc<Mutex<ExportTree>>,
}

impl Default for DbusExport {
    fn default() -> Self {
        Self::new()
    }
}

impl DbusExport {
    /// Create an empty export with change recording enabled.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(ExportTree::with_change_log())),
        }
    }

    /// Lock the shared tree. A poisoned lock is recovered, the tree has no
    /// invariants a panicking reader could have broken halfway.
    pub fn lock(&self) -> MutexGuard<'_, ExportTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExportSink for DbusExport {
    fn create_server(&mut self, path: &str) -> Result<ServerId, ExportError> {
        self.lock().create_server(path)
    }

    fn destroy_server(&mut self, server: ServerId) {
        self.lock().destroy_server(server)
    }

    fn set_root(&mut self, server: ServerId, item: ItemId) -> Result<(), ExportError> {
        self.lock().set_root(server, item)
    }

    fn set_status(&mut self, server: ServerId, status: Status) {
        self.lock().set_status(server, status)
    }

    fn create_item(&mut self) -> Result<ItemId, ExportError> {
        self.lock().create_item()
    }

    fn destroy_item(&mut self, item: ItemId) {
        self.lock().destroy_item(item)
    }

    fn set_property(&mut self, item: ItemId, key: &str, value: PropertyValue) {
        self.lock().set_property(item, key, value)
    }

    fn remove_property(&mut self, item: ItemId, key: &str) {
        self.lock().remove_property(item, key)
    }

    fn property(&self, item: ItemId, key: &str) -> Option<PropertyValue> {
        self.lock().property(item, key)
    }

    fn property_keys(&self, item: ItemId) -> Vec<String> {
        self.lock().property_keys(item)
    }

    fn insert_child(&mut self, parent: ItemId, child: ItemId, position: usize) -> Result<(), ExportError> {
        self.lock().insert_child(parent, child, position)
    }

    fn append_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError> {
        self.lock().append_child(parent, child)
    }

    fn delete_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError> {
        self.lock().delete_child(parent, child)
    }

    fn show_to_user(&mut self, item: ItemId, timestamp: u32) {
        self.lock().show_to_user(item, timestamp)
    }

    fn contains(&self, item: ItemId) -> bool {
        self.lock().contains(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globalmenu_core::export::prop;

    #[test]
    fn test_clones_share_one_tree() {
        let mut engine = DbusExport::new();
        let bus = engine.clone();
        let server = engine.create_server("/com/canonical/menu/2A").unwrap();
        let root = engine.create_item().unwrap();
        engine.set_root(server, root).unwrap();
        engine.set_property(root, prop::LABEL, "Root".into());

        let tree = bus.lock();
        assert_eq!(tree.server_by_path("/com/canonical/menu/2A"), Some(server));
        assert_eq!(tree.property(root, prop::LABEL), Some(PropertyValue::from("Root")));
    }

    #[test]
    fn test_changes_are_recorded() {
        let mut export = DbusExport::new();
        let server = export.create_server("/com/canonical/menu/1").unwrap();
        let root = export.create_item().unwrap();
        export.set_root(server, root).unwrap();
        export.lock().take_changes();

        export.set_status(server, Status::Notice);
        assert_eq!(export.lock().take_changes(), vec![globalmenu_core::export::ExportChange::Status(server)]);
    }
}
