// SPDX-License-Identifier: LGPL-3.0-only
//! Content to export property synchronization shared by every node kind.

use super::{MenuTree, Task};
use crate::content::{attr, class, is_hidden, ContentId, Document};
use crate::export::{prop, ExportSink};
use crate::label::format_label;
use crate::node::{Guard, NodeId, NodeKind};

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    pub(crate) fn update_class_info(&mut self, id: NodeId) {
        let Some(content) = self.content(id) else {
            return;
        };
        let keyboard = self.doc.has_class(content, class::SHOW_ONLY_FOR_KEYBOARD);
        let favicon = self.doc.has_class(content, class::MENUITEM_WITH_FAVICON);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.show_only_for_keyboard = keyboard;
            node.state.with_favicon = favicon;
        }
    }

    /// Push the label, optionally reflected from a `source` element (the
    /// command) onto the node's own content first.
    pub(crate) fn sync_label(&mut self, id: NodeId, source: Option<ContentId>) {
        let Some(content) = self.content(id) else {
            return;
        };
        let command_label = source.and_then(|s| self.doc.attribute(s, attr::LABEL));
        let command_key = source.and_then(|s| self.doc.attribute(s, attr::ACCESSKEY));
        if (command_label.is_some() || command_key.is_some())
            && !self.guarded(id, Guard::Label, |tree| {
                if let Some(label) = &command_label {
                    tree.write_attribute(content, attr::LABEL, Some(label.as_str()));
                }
                if let Some(key) = &command_key {
                    tree.write_attribute(content, attr::ACCESSKEY, Some(key.as_str()));
                }
            })
        {
            return;
        }
        let label = command_label
            .or_else(|| self.doc.attribute(content, attr::LABEL))
            .unwrap_or_default();
        let access_key = command_key
            .or_else(|| self.doc.attribute(content, attr::ACCESSKEY))
            .unwrap_or_default();

        let text = format_label(
            &label,
            &access_key,
            self.services.case(),
            self.services.prefs.max_label_chars,
        );
        self.set_property(id, prop::LABEL, text.into());
    }

    pub(crate) fn sync_sensitivity(&mut self, id: NodeId, source: Option<ContentId>) {
        let Some(content) = self.content(id) else {
            return;
        };
        let disabled = self
            .doc
            .attribute_is(source.unwrap_or(content), attr::DISABLED, "true");
        if source.is_some()
            && !self.guarded(id, Guard::Sensitivity, |tree| {
                tree.write_attribute(content, attr::DISABLED, disabled.then_some("true"))
            })
        {
            return;
        }
        self.set_property(id, prop::ENABLED, (!disabled).into());
    }

    pub(crate) fn sync_visibility(&mut self, id: NodeId) {
        let Some(content) = self.content(id) else {
            return;
        };
        let visible = !is_hidden(&self.doc, content);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.content_visible = visible;
        }
        self.update_visibility(id);
    }

    /// Recompute `visible` from cached state without touching content.
    pub(crate) fn update_visibility(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let keyboard_ok = !node.state.show_only_for_keyboard
            || node.bar.map(|bar| self.opened_by_keyboard(bar)).unwrap_or(false);
        let visible = node.state.content_visible && keyboard_ok;
        self.set_property(id, prop::VISIBLE, visible.into());
    }

    /// Start a fresh icon request, superseding any outstanding one.
    pub(crate) fn sync_icon(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.kind.has_icon() {
            return;
        }
        node.icon.serial += 1;
        let serial = node.icon.serial;
        if let Some(task) = node.icon.task.take() {
            self.scheduler.cancel(task);
        }
        let task = self.scheduler.post_idle(Task::LoadIcon { node: id, serial });
        if let Some(node) = self.nodes.get_mut(&id) {
            node.icon.task = Some(task);
        }
    }

    /// Full resynchronization. Clears `dirty`.
    pub(crate) fn refresh(&mut self, id: NodeId) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.dirty = false;
        }
        match kind {
            NodeKind::Menu => {
                self.update_class_info(id);
                self.sync_label(id, None);
                self.sync_sensitivity(id, None);
                self.sync_visibility(id);
                self.sync_icon(id);
            },
            NodeKind::Item => self.refresh_item(id),
            NodeKind::Separator => {
                self.update_class_info(id);
                self.sync_visibility(id);
            },
            NodeKind::Bar | NodeKind::Dummy => {},
        }
    }

    /// Mark `id` stale. On-screen nodes resynchronize right away.
    pub fn invalidate(&mut self, id: NodeId) {
        match self.kind(id) {
            Some(NodeKind::Menu) => self.invalidate_menu(id),
            Some(NodeKind::Item) | Some(NodeKind::Separator) => {
                let Some(node) = self.nodes.get_mut(&id) else {
                    return;
                };
                node.state.dirty = true;
                if node.state.on_screen {
                    self.refresh(id);
                }
            },
            Some(NodeKind::Bar) | Some(NodeKind::Dummy) | None => {},
        }
    }

    /// The parent of `id` is about to show it.
    pub(crate) fn container_opening(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.state.on_screen = true;
        let (kind, dirty, needs_rebuild) = (node.kind, node.state.dirty, node.state.needs_rebuild);
        if kind == NodeKind::Dummy {
            return;
        }
        if kind == NodeKind::Menu && dirty && !needs_rebuild {
            for child in self.children(id).to_vec() {
                self.invalidate(child);
            }
        }
        if dirty {
            self.refresh(id);
        } else {
            self.update_visibility(id);
        }
    }

    /// The parent of `id` closed.
    pub(crate) fn container_closing(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.on_screen = false;
        }
    }
}
