// SPDX-License-Identifier: LGPL-3.0-only
//! Conversions between the export tree and dbusmenu wire types.

use std::collections::{BTreeMap, HashMap};

use globalmenu_core::export::{ExportChange, ExportTree, ItemId, PropertyValue, ServerId};
use zbus::zvariant::{OwnedValue, Structure, Value};

/// Wire id of a server's root item.
pub const ROOT_ID: i32 = 0;

/// Submenu layout structure for the dbusmenu protocol, `(ia{sv}av)`.
#[derive(Debug, serde::Serialize, zbus::zvariant::Type)]
pub struct SubMenuLayout {
    /// Wire id of the parent.
    pub id: i32,
    /// Properties of the parent.
    pub fields: HashMap<String, OwnedValue>,
    /// Child layouts as `(ia{sv}av)` structures.
    pub submenus: Vec<OwnedValue>,
}

/// Convert a value to an [OwnedValue]. Fails only for file descriptors,
/// which menus never carry.
pub fn owned_value<T>(value: T) -> Option<OwnedValue>
where
    Value<'static>: From<T>,
{
    OwnedValue::try_from(Value::from(value)).ok()
}

/// Wire representation of an export property.
pub fn property_value(value: &PropertyValue) -> Option<OwnedValue> {
    match value {
        PropertyValue::Bool(v) => owned_value(*v),
        PropertyValue::Int(v) => owned_value(*v),
        PropertyValue::Str(v) => owned_value(v.clone()),
        PropertyValue::Bytes(v) => owned_value(v.clone()),
        PropertyValue::Shortcut(v) => owned_value(v.clone()),
    }
}

/// Wire id of `item` within `server`.
pub fn wire_id(tree: &ExportTree, server: ServerId, item: ItemId) -> Option<i32> {
    if tree.server(server)?.root == Some(item) {
        return Some(ROOT_ID);
    }
    i32::try_from(item.0).ok()
}

/// Item behind wire `id`, if it belongs to `server`.
pub fn item_for(tree: &ExportTree, server: ServerId, id: i32) -> Option<ItemId> {
    if id == ROOT_ID {
        return tree.server(server)?.root;
    }
    let item = ItemId(u64::try_from(id).ok()?);
    (tree.server_of(item) == Some(server)).then_some(item)
}

/// Properties of `item`, restricted to `filter` unless it is empty.
pub fn item_properties(tree: &ExportTree, item: ItemId, filter: &[String]) -> HashMap<String, OwnedValue> {
    let Some(entry) = tree.item(item) else {
        return HashMap::new();
    };
    entry
        .properties
        .iter()
        .filter(|(key, _)| filter.is_empty() || filter.iter().any(|f| f == *key))
        .filter_map(|(key, value)| Some((key.clone(), property_value(value)?)))
        .collect()
}

// -1 recurses fully, 0 stops, N descends N more levels
fn next_depth(depth: i32) -> i32 {
    if depth < 0 {
        -1
    } else {
        depth - 1
    }
}

fn layout_node(tree: &ExportTree, server: ServerId, item: ItemId, depth: i32, filter: &[String]) -> Option<OwnedValue> {
    let id = wire_id(tree, server, item)?;
    let children: Vec<OwnedValue> = if depth == 0 {
        Vec::new()
    } else {
        tree.children(item)
            .iter()
            .filter_map(|child| layout_node(tree, server, *child, next_depth(depth), filter))
            .collect()
    };
    owned_value(Structure::from((id, item_properties(tree, item, filter), children)))
}

/// Layout below wire id `parent`, `depth` levels deep.
pub fn layout(tree: &ExportTree, server: ServerId, parent: i32, depth: i32, filter: &[String]) -> Option<SubMenuLayout> {
    let item = item_for(tree, server, parent)?;
    let submenus = if depth == 0 {
        Vec::new()
    } else {
        tree.children(item)
            .iter()
            .filter_map(|child| layout_node(tree, server, *child, next_depth(depth), filter))
            .collect()
    };
    Some(SubMenuLayout {
        id: parent,
        fields: item_properties(tree, item, filter),
        submenus,
    })
}

/// Signals one server owes the bus after a batch of export changes.
#[derive(Debug, Default)]
pub struct ServerSignals {
    /// `LayoutUpdated(revision, parent)`, deduplicated by parent.
    pub layouts: Vec<(u32, i32)>,
    /// Updated property values per wire id.
    pub updated: BTreeMap<i32, HashMap<String, OwnedValue>>,
    /// Removed property names per wire id.
    pub removed: BTreeMap<i32, Vec<String>>,
    /// The `Status` property changed.
    pub status: bool,
    /// `ItemActivationRequested(id, timestamp)`.
    pub activations: Vec<(i32, u32)>,
}

impl ServerSignals {
    /// Updated properties in wire shape.
    pub fn updated_properties(&mut self) -> Vec<(i32, HashMap<String, OwnedValue>)> {
        std::mem::take(&mut self.updated).into_iter().collect()
    }

    /// Removed properties in wire shape.
    pub fn removed_properties(&mut self) -> Vec<(i32, Vec<String>)> {
        std::mem::take(&mut self.removed).into_iter().collect()
    }
}

/// Drain the change log of `tree` into per-server signal batches. Values are
/// read at drain time, so several changes of one property collapse into one.
pub fn collect_signals(tree: &mut ExportTree) -> HashMap<ServerId, ServerSignals> {
    let mut out: HashMap<ServerId, ServerSignals> = HashMap::new();
    for change in tree.take_changes() {
        match change {
            ExportChange::Layout { server, parent } => {
                let Some(id) = wire_id(tree, server, parent) else {
                    continue;
                };
                let revision = tree.server(server).map(|s| s.revision).unwrap_or_default();
                let signals = out.entry(server).or_default();
                signals.layouts.retain(|(_, p)| *p != id);
                signals.layouts.push((revision, id));
            },
            ExportChange::Property {
                server,
                item,
                key,
                removed,
            } => {
                let Some(id) = wire_id(tree, server, item) else {
                    continue;
                };
                let value = tree
                    .item(item)
                    .and_then(|entry| entry.properties.get(&key))
                    .and_then(property_value);
                let signals = out.entry(server).or_default();
                match value {
                    Some(value) if !removed => {
                        if let Some(keys) = signals.removed.get_mut(&id) {
                            keys.retain(|k| *k != key);
                        }
                        signals.updated.entry(id).or_default().insert(key, value);
                    },
                    _ => {
                        if let Some(props) = signals.updated.get_mut(&id) {
                            props.remove(&key);
                        }
                        let keys = signals.removed.entry(id).or_default();
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    },
                }
            },
            ExportChange::Status(server) => out.entry(server).or_default().status = true,
            ExportChange::Show {
                server,
                item,
                timestamp,
            } => {
                if let Some(id) = wire_id(tree, server, item) {
                    out.entry(server).or_default().activations.push((id, timestamp));
                }
            },
        }
    }
    out.retain(|server, _| tree.server(*server).is_some());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use globalmenu_core::export::{prop, ExportSink, Status};

    fn sample() -> (ExportTree, ServerId, ItemId, ItemId, ItemId) {
        let mut tree = ExportTree::with_change_log();
        let server = tree.create_server("/com/canonical/menu/1").unwrap();
        let root = tree.create_item().unwrap();
        tree.set_root(server, root).unwrap();
        tree.set_property(root, prop::CHILDREN_DISPLAY, "menubar".into());
        let file = tree.create_item().unwrap();
        tree.set_property(file, prop::LABEL, "_File".into());
        tree.append_child(root, file).unwrap();
        let quit = tree.create_item().unwrap();
        tree.set_property(quit, prop::LABEL, "_Quit".into());
        tree.set_property(quit, prop::ENABLED, false.into());
        tree.append_child(file, quit).unwrap();
        tree.take_changes();
        (tree, server, root, file, quit)
    }

    #[test]
    fn test_root_maps_to_zero() {
        let (tree, server, root, file, _) = sample();
        assert_eq!(wire_id(&tree, server, root), Some(ROOT_ID));
        assert_eq!(item_for(&tree, server, ROOT_ID), Some(root));
        let id = wire_id(&tree, server, file).unwrap();
        assert_eq!(item_for(&tree, server, id), Some(file));
        assert_eq!(item_for(&tree, server, 9999), None);
    }

    #[test]
    fn test_layout_depth() {
        let (tree, server, _, file, _) = sample();
        let full = layout(&tree, server, ROOT_ID, -1, &[]).unwrap();
        assert_eq!(full.submenus.len(), 1);
        assert_eq!(full.fields.get("children-display"), owned_value("menubar").as_ref());

        let shallow = layout(&tree, server, ROOT_ID, 0, &[]).unwrap();
        assert!(shallow.submenus.is_empty());

        let id = wire_id(&tree, server, file).unwrap();
        let sub = layout(&tree, server, id, 1, &["label".to_string()]).unwrap();
        assert_eq!(sub.submenus.len(), 1);
        assert_eq!(sub.fields.len(), 1);
    }

    #[test]
    fn test_property_filter() {
        let (tree, _, _, _, quit) = sample();
        let all = item_properties(&tree, quit, &[]);
        assert_eq!(all.len(), 2);
        let some = item_properties(&tree, quit, &["enabled".to_string(), "icon-data".to_string()]);
        assert_eq!(some.len(), 1);
        assert_eq!(some.get("enabled"), owned_value(false).as_ref());
    }

    #[test]
    fn test_changes_collapse_per_server() {
        let (mut tree, server, _, file, quit) = sample();
        tree.set_property(quit, prop::LABEL, "E_xit".into());
        tree.set_property(quit, prop::LABEL, "_Exit".into());
        tree.remove_property(quit, prop::ENABLED);
        let extra = tree.create_item().unwrap();
        tree.append_child(file, extra).unwrap();
        tree.set_status(server, Status::Notice);
        tree.show_to_user(file, 42);

        let mut signals = collect_signals(&mut tree);
        let batch = signals.get_mut(&server).unwrap();
        let quit_id = wire_id(&tree, server, quit).unwrap();
        let file_id = wire_id(&tree, server, file).unwrap();

        assert_eq!(batch.layouts.len(), 1);
        assert_eq!(batch.layouts[0].1, file_id);
        assert!(batch.status);
        assert_eq!(batch.activations, vec![(file_id, 42)]);
        let updated = batch.updated_properties();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].1.get("label"), owned_value("_Exit").as_ref());
        assert_eq!(batch.removed_properties(), vec![(quit_id, vec!["enabled".to_string()])]);
        assert!(collect_signals(&mut tree).is_empty());
    }
}
