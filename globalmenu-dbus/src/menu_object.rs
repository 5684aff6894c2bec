// SPDX-License-Identifier: LGPL-3.0-only
//! `com.canonical.dbusmenu` served from the shared export tree.

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use globalmenu_core::export::ServerId;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedValue;
use zbus::fdo;

use crate::bridge::MenuEvent;
use crate::export::DbusExport;
use crate::types::{item_for, item_properties, layout, SubMenuLayout};

/// One exported menu bar on the bus.
pub struct MenuObject {
    export: DbusExport,
    server: ServerId,
    events: Sender<MenuEvent>,
}

impl MenuObject {
    pub(crate) fn new(export: DbusExport, server: ServerId, events: Sender<MenuEvent>) -> Self {
        Self { export, server, events }
    }

    fn send(&self, event: MenuEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Menu event dropped, nobody is listening");
        }
    }

    fn unknown(id: i32) -> fdo::Error {
        fdo::Error::InvalidArgs(format!("Unknown menu item {id}"))
    }
}

#[interface(name = "com.canonical.dbusmenu")]
impl MenuObject {
    #[zbus(name = "GetLayout")]
    async fn get_layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        property_names: Vec<String>,
    ) -> fdo::Result<(u32, SubMenuLayout)> {
        let tree = self.export.lock();
        let revision = tree.server(self.server).map(|s| s.revision).unwrap_or_default();
        let layout = layout(&tree, self.server, parent_id, recursion_depth, &property_names)
            .ok_or_else(|| Self::unknown(parent_id))?;
        log::trace!(
            "GetLayout parent={parent_id} depth={recursion_depth} revision={revision} submenus={}",
            layout.submenus.len()
        );
        Ok((revision, layout))
    }

    #[zbus(name = "GetGroupProperties")]
    async fn get_group_properties(
        &self,
        ids: Vec<i32>,
        property_names: Vec<String>,
    ) -> Vec<(i32, HashMap<String, OwnedValue>)> {
        let tree = self.export.lock();
        ids.into_iter()
            .filter_map(|id| {
                let item = item_for(&tree, self.server, id)?;
                Some((id, item_properties(&tree, item, &property_names)))
            })
            .collect()
    }

    #[zbus(name = "GetProperty")]
    async fn get_property(&self, id: i32, name: String) -> fdo::Result<OwnedValue> {
        let tree = self.export.lock();
        let item = item_for(&tree, self.server, id).ok_or_else(|| Self::unknown(id))?;
        let filter = [name];
        item_properties(&tree, item, &filter)
            .remove(&filter[0])
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("Menu item {id} has no property '{}'", filter[0])))
    }

    #[zbus(name = "Event")]
    async fn event(&self, id: i32, event_id: String, _data: OwnedValue, timestamp: u32) -> fdo::Result<()> {
        let item = {
            let tree = self.export.lock();
            item_for(&tree, self.server, id).ok_or_else(|| Self::unknown(id))?
        };
        log::debug!("dbusmenu event '{event_id}' for {id}");
        self.send(MenuEvent::Event {
            item,
            name: event_id,
            timestamp,
        });
        Ok(())
    }

    #[zbus(name = "EventGroup")]
    async fn event_group(&self, events: Vec<(i32, String, OwnedValue, u32)>) -> Vec<i32> {
        let mut unknown = Vec::new();
        for (id, event_id, _data, timestamp) in events {
            let item = {
                let tree = self.export.lock();
                item_for(&tree, self.server, id)
            };
            match item {
                Some(item) => self.send(MenuEvent::Event {
                    item,
                    name: event_id,
                    timestamp,
                }),
                None => unknown.push(id),
            }
        }
        unknown
    }

    /// The engine answers asynchronously through layout signals, so the
    /// reply never asks for a refetch.
    #[zbus(name = "AboutToShow")]
    async fn about_to_show(&self, id: i32) -> fdo::Result<bool> {
        let item = {
            let tree = self.export.lock();
            item_for(&tree, self.server, id).ok_or_else(|| Self::unknown(id))?
        };
        self.send(MenuEvent::AboutToShow { item });
        Ok(false)
    }

    #[zbus(name = "AboutToShowGroup")]
    async fn about_to_show_group(&self, ids: Vec<i32>) -> (Vec<i32>, Vec<i32>) {
        let mut unknown = Vec::new();
        for id in ids {
            let item = {
                let tree = self.export.lock();
                item_for(&tree, self.server, id)
            };
            match item {
                Some(item) => self.send(MenuEvent::AboutToShow { item }),
                None => unknown.push(id),
            }
        }
        (Vec::new(), unknown)
    }

    #[zbus(signal)]
    #[zbus(name = "LayoutUpdated")]
    pub async fn layout_updated(emitter: &SignalEmitter<'_>, revision: u32, parent: i32) -> zbus::Result<()>;

    #[zbus(signal)]
    #[zbus(name = "ItemsPropertiesUpdated")]
    pub async fn items_properties_updated(
        emitter: &SignalEmitter<'_>,
        updated: Vec<(i32, HashMap<String, OwnedValue>)>,
        removed: Vec<(i32, Vec<String>)>,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    #[zbus(name = "ItemActivationRequested")]
    pub async fn item_activation_requested(emitter: &SignalEmitter<'_>, id: i32, timestamp: u32) -> zbus::Result<()>;

    #[zbus(property)]
    #[zbus(name = "Status")]
    fn status(&self) -> String {
        let tree = self.export.lock();
        tree.server(self.server)
            .map(|s| s.status.as_str())
            .unwrap_or("normal")
            .to_string()
    }

    #[zbus(property)]
    #[zbus(name = "TextDirection")]
    fn text_direction(&self) -> String {
        "ltr".to_string()
    }

    #[zbus(property)]
    #[zbus(name = "Version")]
    fn version(&self) -> u32 {
        3
    }
}
