// SPDX-License-Identifier: LGPL-3.0-only
//! The menu bar: root of one window's exported menu.

use super::MenuTree;
use crate::broker::WindowId;
use crate::content::{attr, is_ancestor, tag, ContentId, Document};
use crate::error::{MenuError, Result};
use crate::export::{ExportSink, Status};
use crate::keys::{key_code, KeyEvent, KeyOutcome, Modifiers};
use crate::label::keys_match;
use crate::node::{BarData, HiddenElement, Node, NodeId, NodeKind, NodeState, Payload, RegistrationState};

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    /// Export `content` as the menu bar of `window` and hide the in-window
    /// bar.
    pub fn create_bar(&mut self, window: WindowId, content: ContentId) -> Result<NodeId> {
        if window.0 == 0 {
            return Err(MenuError::InvalidWindow(window));
        }
        let path = window.menu_path();
        let server = self.export.create_server(&path)?;
        let item = match self.export.create_item() {
            Ok(item) => item,
            Err(err) => {
                self.export.destroy_server(server);
                return Err(err.into());
            },
        };
        if let Err(err) = self.export.set_root(server, item) {
            self.export.destroy_item(item);
            self.export.destroy_server(server);
            return Err(err.into());
        }

        let access_key = self.services.prefs.menu_access_key;
        let id = self.allocate_id();
        self.nodes.insert(
            id,
            Node {
                kind: NodeKind::Bar,
                content,
                item,
                parent: None,
                bar: None,
                state: NodeState {
                    on_screen: true,
                    content_visible: true,
                    ready: true,
                    ..NodeState::default()
                },
                icon: Default::default(),
                payload: Payload::Bar(Box::new(BarData {
                    window,
                    server,
                    path,
                    children: Vec::new(),
                    access_key,
                    access_mask: Modifiers::for_access_key(access_key),
                    opened_by_keyboard: false,
                    registration: RegistrationState::Unregistered,
                    hidden: None,
                })),
            },
        );
        self.items.insert(item, id);

        if let Err(err) = self.init_bar(id, content) {
            self.destroy_bar(id);
            return Err(err);
        }
        log::info!("Exported menu bar for window {window}");
        Ok(id)
    }

    fn init_bar(&mut self, id: NodeId, content: ContentId) -> Result<()> {
        self.router.register(content, id)?;
        for child in self.doc.children(content) {
            let index = self.children(id).len();
            self.insert_bar_child(id, child, index)?;
        }
        self.router.register_fallback(id)?;
        self.hide_in_window_bar(id);
        Ok(())
    }

    /// Tear down bar `id`, restoring the in-window bar.
    pub fn destroy_bar(&mut self, id: NodeId) {
        if self.kind(id) != Some(NodeKind::Bar) {
            return;
        }
        self.show_in_window_bar(id);
        self.destroy_node(id, false);
    }

    fn insert_bar_child(&mut self, id: NodeId, content: ContentId, index: usize) -> Result<NodeId> {
        let node = self.nodes.get(&id).ok_or(MenuError::UnknownNode(id))?;
        let len = node.children().len();
        if index > len {
            return Err(MenuError::IndexOutOfRange { node: id, index, len });
        }
        let bar_item = node.item;
        let child = self.create_child(content, id, None)?;
        let child_item = self.item(child).ok_or(MenuError::UnknownNode(child))?;
        let placed = if index == len {
            self.export.append_child(bar_item, child_item)
        } else {
            self.export.insert_child(bar_item, child_item, index)
        };
        if let Err(err) = placed {
            self.destroy_node(child, false);
            return Err(err.into());
        }
        if let Some(children) = self.nodes.get_mut(&id).and_then(Node::children_mut) {
            children.insert(index, child);
        }
        self.container_opening(child);
        Ok(child)
    }

    fn remove_bar_child(&mut self, id: NodeId, index: usize) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(MenuError::UnknownNode(id))?;
        let bar_item = node.item;
        let children = node.children_mut().ok_or(MenuError::NotAContainer(id))?;
        if index >= children.len() {
            return Err(MenuError::IndexOutOfRange {
                node: id,
                index,
                len: children.len(),
            });
        }
        let child = children.remove(index);
        self.discard_child(bar_item, child);
        Ok(())
    }

    pub(crate) fn bar_child_inserted(&mut self, id: NodeId, container: ContentId, child: ContentId, index: usize) {
        let Some(content) = self.content(id) else {
            return;
        };
        if container != content {
            if self.in_window_bar_hidden(id) && is_ancestor(&self.doc, container, content) {
                self.hide_in_window_bar(id);
            }
            return;
        }
        if let Err(err) = self.insert_bar_child(id, child, index) {
            log::warn!("Menu bar {id:?} is out of sync: {err}");
        }
    }

    pub(crate) fn bar_child_removed(&mut self, id: NodeId, container: ContentId, index: usize) {
        let Some(content) = self.content(id) else {
            return;
        };
        if container != content {
            if self.in_window_bar_hidden(id) && is_ancestor(&self.doc, container, content) {
                self.hide_in_window_bar(id);
            }
            return;
        }
        if let Err(err) = self.remove_bar_child(id, index) {
            log::warn!("Menu bar {id:?} is out of sync: {err}");
        }
    }

    // In-window bar

    fn in_window_bar_hidden(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(Node::bar)
            .is_some_and(|bar| bar.hidden.is_some())
    }

    fn should_parent_stay_visible(&self, content: ContentId) -> bool {
        let Some(parent) = self.doc.parent(content) else {
            return true;
        };
        let siblings = self.doc.children(parent);
        if siblings.len() <= 1 {
            return false;
        }
        siblings
            .into_iter()
            .filter(|sibling| *sibling != content)
            .any(|sibling| self.doc.tag(sibling).as_deref() != Some(tag::TOOLBARSPRING))
    }

    /// Hide the in-window bar by hiding the highest ancestor that has no
    /// visible siblings.
    pub(crate) fn hide_in_window_bar(&mut self, id: NodeId) {
        self.show_in_window_bar(id);
        let Some(mut target) = self.content(id) else {
            return;
        };
        while !self.should_parent_stay_visible(target) {
            match self.doc.parent(target) {
                Some(parent) => target = parent,
                None => break,
            }
        }
        let previous = self.doc.attribute(target, attr::HIDDEN);
        if let Some(bar) = self.nodes.get_mut(&id).and_then(Node::bar_mut) {
            bar.hidden = Some(HiddenElement {
                content: target,
                previous,
            });
        }
        self.write_attribute(target, attr::HIDDEN, Some("true"));
    }

    /// Undo [MenuTree::hide_in_window_bar] exactly.
    pub(crate) fn show_in_window_bar(&mut self, id: NodeId) {
        let Some(hidden) = self.nodes.get_mut(&id).and_then(Node::bar_mut).and_then(|bar| bar.hidden.take()) else {
            return;
        };
        self.write_attribute(hidden.content, attr::HIDDEN, hidden.previous.as_deref());
    }

    /// Element hidden on behalf of bar `id`.
    pub fn hidden_element(&self, id: NodeId) -> Option<ContentId> {
        self.nodes.get(&id)?.bar()?.hidden.as_ref().map(|hidden| hidden.content)
    }

    // Registration

    pub(crate) fn set_registration(&mut self, id: NodeId, state: RegistrationState) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.state.registered = state == RegistrationState::Registered;
        if let Some(bar) = node.bar_mut() {
            bar.registration = state;
        }
    }

    /// Outcome of the registration request of bar `id`.
    pub(crate) fn registration_finished(&mut self, id: NodeId, registered: bool) {
        if registered {
            self.set_registration(id, RegistrationState::Registered);
        } else {
            self.set_registration(id, RegistrationState::Unregistered);
            self.show_in_window_bar(id);
        }
    }

    // Keyboard

    fn bar_keys(&self, id: NodeId) -> Option<(u32, Modifiers)> {
        let bar = self.nodes.get(&id)?.bar()?;
        Some((bar.access_key, bar.access_mask))
    }

    fn set_status(&mut self, id: NodeId, status: Status) {
        if let Some(server) = self.nodes.get(&id).and_then(Node::bar).map(|bar| bar.server) {
            self.export.set_status(server, status);
        }
    }

    pub(crate) fn bar_key_down(&mut self, id: NodeId, event: &KeyEvent) -> KeyOutcome {
        let Some((access_key, mask)) = self.bar_keys(id) else {
            return KeyOutcome::Ignored;
        };
        if event.should_handle() && event.key_code == access_key && (event.modifiers - mask).is_empty() {
            self.set_status(id, Status::Notice);
        }
        KeyOutcome::Ignored
    }

    pub(crate) fn bar_key_up(&mut self, id: NodeId, event: &KeyEvent) -> KeyOutcome {
        let Some((access_key, _)) = self.bar_keys(id) else {
            return KeyOutcome::Ignored;
        };
        if event.should_handle() && event.key_code == access_key {
            self.set_status(id, Status::Normal);
        }
        KeyOutcome::Ignored
    }

    pub(crate) fn bar_key_press(&mut self, id: NodeId, event: &KeyEvent) -> KeyOutcome {
        if !event.should_handle() {
            return KeyOutcome::Ignored;
        }
        let Some((_, mask)) = self.bar_keys(id) else {
            return KeyOutcome::Ignored;
        };
        let children = self.children(id).to_vec();

        let found = if !mask.is_empty() && event.modifiers == mask {
            event.char_code.and_then(|typed| {
                children.iter().copied().find(|child| {
                    self.content(*child)
                        .and_then(|content| self.doc.attribute(content, attr::ACCESSKEY))
                        .and_then(|key| key.chars().next())
                        .map(|key| keys_match(typed, key, self.services.case()))
                        .unwrap_or(false)
                })
            })
        } else if event.key_code == key_code::F10 {
            children
                .iter()
                .copied()
                .find(|child| self.kind(*child) == Some(NodeKind::Menu) && self.can_open(*child))
        } else {
            None
        };

        let Some(menu) = found else {
            return KeyOutcome::Ignored;
        };
        if let Some(bar) = self.nodes.get_mut(&id).and_then(Node::bar_mut) {
            bar.opened_by_keyboard = true;
        }
        self.invalidate(menu);
        self.open_menu_delayed(menu);
        KeyOutcome::Consumed
    }

    pub(crate) fn bar_focus(&mut self, id: NodeId) {
        if let Some(bar) = self.nodes.get_mut(&id).and_then(Node::bar_mut) {
            bar.opened_by_keyboard = false;
        }
    }

    pub(crate) fn bar_blur(&mut self, id: NodeId) {
        self.set_status(id, Status::Normal);
    }
}
