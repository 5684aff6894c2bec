// SPDX-License-Identifier: LGPL-3.0-only
use super::MenuTree;
use crate::content::Document;
use crate::export::{prop, ExportSink, PropertyValue};
use crate::icon::{decode_icon, resolve_icon};
use crate::node::NodeId;

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    /// Idle continuation of [MenuTree::sync_icon]. Superseded requests are
    /// recognized by their serial and do nothing.
    pub(crate) fn load_icon(&mut self, id: NodeId, serial: u64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.icon.serial != serial {
            log::trace!("Icon request {serial} for {id:?} is stale");
            return;
        }
        node.icon.task = None;
        let content = node.content;
        let favicon = node.state.with_favicon;
        if !self.doc.is_in_document(content) {
            log::trace!("Icon request {serial} for {id:?} outlived its content");
            return;
        }

        if !self.services.prefs.menus_have_icons && !favicon {
            self.remove_property(id, prop::ICON_DATA);
            return;
        }

        let spec = match resolve_icon(&self.doc, content) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                self.remove_property(id, prop::ICON_DATA);
                return;
            },
            Err(err) => {
                log::debug!("Node {id:?}: no usable icon: {err}");
                self.remove_property(id, prop::ICON_DATA);
                return;
            },
        };
        let Some(source) = self.services.icons.as_deref() else {
            self.remove_property(id, prop::ICON_DATA);
            return;
        };

        let max_size = self.services.prefs.max_icon_size;
        match source
            .fetch(&spec.uri)
            .and_then(|bytes| decode_icon(&bytes, spec.region, max_size))
        {
            Ok(png) => self.set_property(id, prop::ICON_DATA, PropertyValue::Bytes(png)),
            Err(err) => {
                log::warn!("Failed to load icon '{}': {err}", spec.uri);
                self.remove_property(id, prop::ICON_DATA);
            },
        }
    }
}
