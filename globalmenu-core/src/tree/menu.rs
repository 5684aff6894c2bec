// SPDX-License-Identifier: LGPL-3.0-only
//! Submenus: lazy builds, incremental structure updates with item recycling
//! and the open/close protocol.

use std::time::Instant;

use super::{MenuTree, Task};
use crate::content::{attr, is_hidden, tag, ContentId, Document, DomEventKind};
use crate::error::{MenuError, Result};
use crate::export::{self, prop, ExportSink};
use crate::node::{Node, NodeId, NodeKind};
use crate::notify::Notification;
use crate::recycle::{RecycleList, Removal};

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    fn resolve_popup(&mut self, content: ContentId) -> Option<ContentId> {
        if self.doc.resolve_tag(content).as_deref() == Some(tag::MENUPOPUP) {
            return Some(content);
        }
        self.doc
            .children(content)
            .into_iter()
            .find(|child| self.doc.resolve_tag(*child).as_deref() == Some(tag::MENUPOPUP))
    }

    /// Discard the children of `id` and rebuild them from its popup.
    pub(crate) fn build(&mut self, id: NodeId) -> Result<()> {
        let (_, content) = self.node_key(id)?;

        while !self.children(id).is_empty() {
            if let Err(err) = self.remove_menu_child(id, 0) {
                self.mark_needs_rebuild(id);
                return Err(err);
            }
        }
        self.set_property(id, prop::CHILDREN_DISPLAY, export::DISPLAY_SUBMENU.into());

        let old_popup = self
            .nodes
            .get_mut(&id)
            .and_then(Node::menu_mut)
            .and_then(|menu| menu.popup.take());
        if let Some(old) = old_popup.filter(|p| *p != content) {
            if let Err(err) = self.router.unregister(old, id) {
                log::warn!("Menu {id:?}: {err}");
            }
        }

        let Some(popup) = self.resolve_popup(content) else {
            log::debug!("Menu {id:?} has no popup");
            self.flush_recycle(id);
            return Ok(());
        };
        if popup != content {
            if let Err(err) = self.router.register(popup, id) {
                self.mark_needs_rebuild(id);
                return Err(err.into());
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.needs_rebuild = false;
            if let Some(menu) = node.menu_mut() {
                menu.popup = Some(popup);
            }
        }

        for child in self.doc.children(popup) {
            if let Err(err) = self.append_menu_child(id, child) {
                self.mark_needs_rebuild(id);
                return Err(err);
            }
        }
        self.flush_recycle(id);
        Ok(())
    }

    fn mark_needs_rebuild(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.needs_rebuild = true;
        }
    }

    pub(crate) fn append_menu_child(&mut self, id: NodeId, content: ContentId) -> Result<NodeId> {
        let index = self.children(id).len();
        self.insert_menu_child(id, content, index)
    }

    /// Insert a proxy for `content` at logical `index`, reusing the head of
    /// the recycle run when the kinds are compatible.
    pub(crate) fn insert_menu_child(&mut self, id: NodeId, content: ContentId, index: usize) -> Result<NodeId> {
        let node = self.nodes.get(&id).ok_or(MenuError::UnknownNode(id))?;
        let menu = node.menu().ok_or(MenuError::NotAContainer(id))?;
        let len = menu.children.len();
        if index > len {
            return Err(MenuError::IndexOutOfRange { node: id, index, len });
        }
        let parent_item = node.item;
        let candidate = menu.recycle.as_ref().and_then(|list| list.candidate(index));

        let kind = NodeKind::for_tag(self.doc.resolve_tag(content).as_deref());
        let mut adopt = None;
        if let Some(candidate) = candidate {
            if export::is_separator(&self.export, candidate) == (kind == NodeKind::Separator) {
                adopt = self
                    .nodes
                    .get_mut(&id)
                    .and_then(Node::menu_mut)
                    .and_then(|menu| menu.recycle.as_mut())
                    .and_then(RecycleList::reclaim);
            } else {
                self.flush_recycle(id);
            }
        }

        let child = self.create_child(content, id, adopt)?;
        if adopt.is_none() {
            let child_item = self.item(child).ok_or(MenuError::UnknownNode(child))?;
            let placed = if index == len {
                self.export.append_child(parent_item, child_item)
            } else {
                let position = self
                    .nodes
                    .get_mut(&id)
                    .and_then(Node::menu_mut)
                    .and_then(|menu| menu.recycle.as_mut())
                    .map(|list| list.insertion_position(index))
                    .unwrap_or(index);
                self.export.insert_child(parent_item, child_item, position)
            };
            if let Err(err) = placed {
                self.destroy_node(child, false);
                return Err(err.into());
            }
        }

        let Some(node) = self.nodes.get_mut(&id) else {
            return Ok(child);
        };
        let open = node.state.open_or_opening;
        if let Some(children) = node.children_mut() {
            children.insert(index, child);
        }
        if open {
            self.container_opening(child);
        }
        Ok(child)
    }

    /// Drop the proxy at logical `index`, parking its export item on the
    /// recycle run.
    pub(crate) fn remove_menu_child(&mut self, id: NodeId, index: usize) -> Result<()> {
        let node = self.nodes.get(&id).ok_or(MenuError::UnknownNode(id))?;
        let menu = node.menu().ok_or(MenuError::NotAContainer(id))?;
        let len = menu.children.len();
        if index >= len {
            return Err(MenuError::IndexOutOfRange { node: id, index, len });
        }
        let child = menu.children[index];
        let child_item = self.item(child).ok_or(MenuError::UnknownNode(child))?;

        let classified = menu.recycle.as_ref().map(|list| list.classify_removal(index));
        if classified == Some(Removal::Flush) {
            self.flush_recycle(id);
        }

        let Some(menu) = self.nodes.get_mut(&id).and_then(Node::menu_mut) else {
            return Err(MenuError::NotAContainer(id));
        };
        menu.children.remove(index);
        menu.recycle
            .get_or_insert_with(|| RecycleList::new(index))
            .record_removal(index, child_item);
        let schedule = menu.flush_task.is_none();
        if schedule {
            let task = self.scheduler.post_idle(Task::FlushRecycle { menu: id });
            if let Some(menu) = self.nodes.get_mut(&id).and_then(Node::menu_mut) {
                menu.flush_task = Some(task);
            }
        }

        self.destroy_node(child, true);
        Ok(())
    }

    /// Delete every item parked on the recycle run of `id`.
    pub(crate) fn flush_recycle(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let parent_item = node.item;
        let Some(menu) = node.menu_mut() else {
            return;
        };
        let task = menu.flush_task.take();
        let items = menu.recycle.take().map(|mut list| list.drain()).unwrap_or_default();
        if let Some(task) = task {
            self.scheduler.cancel(task);
        }
        if !items.is_empty() {
            log::trace!("Menu {id:?}: flushing {} recycled items", items.len());
        }
        for item in items {
            self.drop_item(parent_item, item);
        }
    }

    pub(crate) fn invalidate_menu(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.state.dirty = true;
        if !node.state.on_screen {
            return;
        }
        let needs_rebuild = node.state.needs_rebuild;
        let open = node.state.open_or_opening;
        let parent = node.parent;
        let parent_is_bar = parent
            .map(|parent| self.kind(parent) == Some(NodeKind::Bar))
            .unwrap_or(false);

        if needs_rebuild {
            if parent_is_bar {
                if let Err(err) = self.build(id) {
                    log::warn!("Menu {id:?}: rebuild failed: {err}");
                }
                self.refresh(id);
            }
            return;
        }

        self.refresh(id);
        for child in self.children(id).to_vec() {
            self.invalidate(child);
            if parent_is_bar && !open {
                self.container_opening(child);
                self.container_closing(child);
            }
        }
    }

    // Observers

    pub(crate) fn menu_attribute_changed(&mut self, id: NodeId, content: ContentId, attribute: &str) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.state.events_blocked() || attribute == attr::OPEN || attribute == attr::MENUACTIVE {
            return;
        }
        if node.state.dirty {
            return;
        }
        if !node.state.on_screen {
            self.invalidate(id);
            return;
        }

        if content == node.content {
            match attribute {
                attr::LABEL | attr::ACCESSKEY => self.sync_label(id, None),
                attr::DISABLED => self.sync_sensitivity(id, None),
                attr::CLASS => self.update_class_info(id),
                _ => {},
            }
            self.sync_visibility(id);
            self.sync_icon(id);
        }

        for child in self.children(id).to_vec() {
            self.invalidate(child);
        }
    }

    pub(crate) fn menu_child_inserted(&mut self, id: NodeId, container: ContentId, child: ContentId, index: usize) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.state.needs_rebuild {
            return;
        }
        if !node.state.open_or_opening {
            node.state.needs_rebuild = true;
            return;
        }
        let popup = node.menu().and_then(|menu| menu.popup);
        if popup == Some(container) {
            if let Err(err) = self.insert_menu_child(id, child, index) {
                log::warn!("Menu {id:?}: insert failed, rebuilding later: {err}");
                self.mark_needs_rebuild(id);
            }
        } else if let Err(err) = self.build(id) {
            log::warn!("Menu {id:?}: rebuild failed: {err}");
        }
    }

    pub(crate) fn menu_child_removed(&mut self, id: NodeId, container: ContentId, child: ContentId, index: usize) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.state.needs_rebuild {
            return;
        }
        if !node.state.open_or_opening {
            node.state.needs_rebuild = true;
            return;
        }
        let popup = node.menu().and_then(|menu| menu.popup);
        let proxied = node.children().get(index).copied();
        if popup == Some(container) {
            if proxied.and_then(|c| self.content(c)) != Some(child) {
                log::warn!("Menu {id:?}: removal at {index} does not match, rebuilding later");
                self.mark_needs_rebuild(id);
                return;
            }
            if let Err(err) = self.remove_menu_child(id, index) {
                log::warn!("Menu {id:?}: remove failed, rebuilding later: {err}");
                self.mark_needs_rebuild(id);
            }
        } else if let Err(err) = self.build(id) {
            log::warn!("Menu {id:?}: rebuild failed: {err}");
        }
    }

    // Open/close protocol

    pub(crate) fn about_to_open(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.state.ready {
            node.state.ready = true;
            log::debug!("Menu {id:?}: absorbing first about-to-open");
            return;
        }
        if node.state.needs_rebuild {
            if let Err(err) = self.build(id) {
                log::warn!("Menu {id:?}: build failed: {err}");
            }
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.state.open_or_opening = true;
        let content = node.content;
        let Some(popup) = node.menu().and_then(|menu| menu.popup) else {
            return;
        };

        for child in self.children(id).to_vec() {
            self.container_opening(child);
        }

        self.write_attribute(content, attr::MENUACTIVE, Some("true"));
        self.fire(content, DomEventKind::MenuItemActive);
        self.fire(popup, DomEventKind::PopupShowing);

        let popup_id = self.doc.attribute(popup, attr::ID);
        self.notifier.broadcast(Notification::PopupOpen(popup_id));
    }

    pub(crate) fn on_open(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let content = node.content;
        if !node.state.open_or_opening {
            self.about_to_open(id);
        }
        self.write_attribute(content, attr::OPEN, Some("true"));
        if let Some(popup) = self.popup(id) {
            self.fire(popup, DomEventKind::PopupShown);
        }
    }

    pub(crate) fn on_close(&mut self, id: NodeId) {
        let Some(content) = self.content(id) else {
            return;
        };
        self.write_attribute(content, attr::OPEN, None);
        for child in self.children(id).to_vec() {
            self.container_closing(child);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.open_or_opening = false;
        }
        let Some(popup) = self.popup(id) else {
            return;
        };
        self.fire(popup, DomEventKind::PopupHiding);
        self.fire(popup, DomEventKind::PopupHidden);

        self.write_attribute(content, attr::MENUACTIVE, None);
        self.fire(content, DomEventKind::MenuItemInactive);
    }

    pub(crate) fn can_open(&self, id: NodeId) -> bool {
        let Some(content) = self.content(id) else {
            return false;
        };
        !is_hidden(&self.doc, content) && !self.doc.attribute_is(content, attr::DISABLED, "true")
    }

    /// Ask the shell to show menu `id` after the configured delay.
    pub(crate) fn open_menu_delayed(&mut self, id: NodeId) -> bool {
        if !self.can_open(id) {
            return false;
        }
        let Some(item) = self.item(id) else {
            return false;
        };
        let delay = self.services.prefs.open_delay;
        self.scheduler.post_delayed(Instant::now(), delay, Task::ShowMenu { menu: id, item });
        true
    }
}
