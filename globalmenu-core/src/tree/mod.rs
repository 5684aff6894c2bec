// SPDX-License-Identifier: LGPL-3.0-only
//! The proxy tree.
//!
//! Nodes live in an arena keyed by [NodeId]; parents own their children by
//! id, back-references are plain ids. Every continuation that comes back
//! from the scheduler looks its node up again and does nothing if it is gone.

mod bar;
mod icon;
mod item;
mod menu;
mod sync;

use std::collections::HashMap;
use std::time::Instant;

use crate::content::{ContentId, Document, DomEvent, DomEventKind, Mutation};
use crate::error::{MenuError, Result};
use crate::export::{self, ExportSink, ItemId};
use crate::node::{Guard, Node, NodeId, NodeKind, NodeState, Payload, RegistrationState};
use crate::notify::{Notification, Notifier};
use crate::router::ChangeRouter;
use crate::scheduler::Scheduler;
use crate::services::Services;

pub use item::shortcut_for_key;

/// Continuations queued on the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Task {
    FlushRecycle { menu: NodeId },
    LoadIcon { node: NodeId, serial: u64 },
    ShowMenu { menu: NodeId, item: ItemId },
}

/// The proxy tree together with the document and sink it synchronizes.
pub struct MenuTree<D, E> {
    pub(crate) doc: D,
    pub(crate) export: E,
    pub(crate) router: ChangeRouter<NodeId>,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) items: HashMap<ItemId, NodeId>,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) services: Services,
    pub(crate) notifier: Notifier,
    next_node: u64,
}

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    /// Create an empty tree.
    pub fn new(doc: D, export: E, services: Services) -> Self {
        Self {
            doc,
            export,
            router: ChangeRouter::new(),
            nodes: HashMap::new(),
            items: HashMap::new(),
            scheduler: Scheduler::new(),
            services,
            notifier: Notifier::default(),
            next_node: 0,
        }
    }

    /// The host document.
    pub fn document(&self) -> &D {
        &self.doc
    }

    /// The host document, mutably. Host edits made here must be followed by
    /// [MenuTree::process_mutations].
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    /// The export sink.
    pub fn export(&self) -> &E {
        &self.export
    }

    /// The export sink, mutably.
    pub fn export_mut(&mut self) -> &mut E {
        &mut self.export
    }

    /// Injected services.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The change router.
    pub fn router(&self) -> &ChangeRouter<NodeId> {
        &self.router
    }

    /// Number of live proxy nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no proxy node is alive.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is alive.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Kind of `id`.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.kind)
    }

    /// Synchronization state of `id`.
    pub fn state(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(&id).map(|n| &n.state)
    }

    /// Export item of `id`.
    pub fn item(&self, id: NodeId) -> Option<ItemId> {
        self.nodes.get(&id).map(|n| n.item)
    }

    /// Content node of `id`.
    pub fn content(&self, id: NodeId) -> Option<ContentId> {
        self.nodes.get(&id).map(|n| n.content)
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.parent
    }

    /// Owning bar of `id`.
    pub fn owning_bar(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.bar
    }

    /// Children of `id` in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(Node::children).unwrap_or(&[])
    }

    /// First live proxy created for `content`.
    pub fn find_node(&self, content: ContentId) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.content == content)
            .map(|(id, _)| *id)
            .min()
    }

    /// Proxy node currently backed by `item`.
    pub fn node_for_item(&self, item: ItemId) -> Option<NodeId> {
        self.items.get(&item).copied()
    }

    /// Popup content supplying the children of menu `id`.
    pub fn popup(&self, id: NodeId) -> Option<ContentId> {
        self.nodes.get(&id)?.menu()?.popup
    }

    /// Items waiting on the recycle list of menu `id`.
    pub fn recycle_len(&self, id: NodeId) -> usize {
        self.nodes
            .get(&id)
            .and_then(Node::menu)
            .and_then(|m| m.recycle.as_ref())
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Registration state of bar `id`.
    pub fn registration(&self, id: NodeId) -> Option<RegistrationState> {
        Some(self.nodes.get(&id)?.bar()?.registration)
    }

    /// Whether the last open of bar `id` came from the keyboard.
    pub fn opened_by_keyboard(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(Node::bar)
            .map(|b| b.opened_by_keyboard)
            .unwrap_or(false)
    }

    /// Export path of bar `id`.
    pub fn bar_path(&self, id: NodeId) -> Option<&str> {
        Some(self.nodes.get(&id)?.bar()?.path.as_str())
    }

    /// Idle continuations waiting to run.
    pub fn pending_idle(&self) -> usize {
        self.scheduler.idle_len()
    }

    /// Timer continuations waiting to run.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.timer_len()
    }

    /// Earliest timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub(crate) fn subscribe(&mut self) -> std::sync::mpsc::Receiver<Notification> {
        self.notifier.subscribe()
    }

    // Notification routing

    /// Route an attribute change on `node`.
    pub fn attribute_changed(&mut self, node: ContentId, attribute: &str) {
        for observer in self.router.observers_for(node) {
            let Some(kind) = self.kind(observer) else {
                continue;
            };
            match kind {
                NodeKind::Bar => {},
                NodeKind::Menu => self.menu_attribute_changed(observer, node, attribute),
                NodeKind::Item => self.item_attribute_changed(observer, node, attribute),
                NodeKind::Separator => self.separator_attribute_changed(observer, node, attribute),
                NodeKind::Dummy => protocol_violation(observer, "attribute change routed to a dummy"),
            }
        }
    }

    /// Route the insertion of `child` into `container` at `index`.
    pub fn child_inserted(&mut self, container: ContentId, child: ContentId, index: usize) {
        for observer in self.router.observers_for(container) {
            match self.kind(observer) {
                Some(NodeKind::Bar) => self.bar_child_inserted(observer, container, child, index),
                Some(NodeKind::Menu) => self.menu_child_inserted(observer, container, child, index),
                Some(NodeKind::Separator) => protocol_violation(observer, "child inserted into a separator"),
                Some(NodeKind::Item) | Some(NodeKind::Dummy) | None => {},
            }
        }
    }

    /// Route the removal of `child` from `container` at `index`.
    pub fn child_removed(&mut self, container: ContentId, child: ContentId, index: usize) {
        for observer in self.router.observers_for(container) {
            match self.kind(observer) {
                Some(NodeKind::Bar) => self.bar_child_removed(observer, container, index),
                Some(NodeKind::Menu) => self.menu_child_removed(observer, container, child, index),
                Some(NodeKind::Separator) => protocol_violation(observer, "child removed from a separator"),
                Some(NodeKind::Item) | Some(NodeKind::Dummy) | None => {},
            }
        }
    }

    /// Route a bulk append as one insertion per child.
    pub fn children_appended(&mut self, container: ContentId, first_index: usize) {
        let children = self.doc.children(container);
        for (index, child) in children.into_iter().enumerate().skip(first_index) {
            self.child_inserted(container, child, index);
        }
    }

    /// Route one host mutation.
    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::AttributeChanged { node, attribute } => self.attribute_changed(node, &attribute),
            Mutation::ChildInserted {
                container,
                child,
                index,
            } => self.child_inserted(container, child, index),
            Mutation::ChildRemoved {
                container,
                child,
                index,
            } => self.child_removed(container, child, index),
            Mutation::ChildrenAppended {
                container,
                first_index,
            } => self.children_appended(container, first_index),
        }
    }

    /// Drain and route everything the host changed.
    pub fn process_mutations(&mut self) -> usize {
        let mut routed = 0;
        loop {
            let batch = self.doc.take_mutations();
            if batch.is_empty() {
                return routed;
            }
            routed += batch.len();
            for mutation in batch {
                self.apply(mutation);
            }
        }
    }

    // Continuations

    /// Run the current idle batch.
    pub fn run_idle(&mut self) -> usize {
        let tasks = self.scheduler.take_idle();
        let count = tasks.len();
        for task in tasks {
            self.run_task(task);
        }
        count
    }

    /// Run every timer due at `now`.
    pub fn run_timers(&mut self, now: Instant) -> usize {
        let tasks = self.scheduler.take_due(now);
        let count = tasks.len();
        for task in tasks {
            self.run_task(task);
        }
        count
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::FlushRecycle { menu } => {
                if let Some(data) = self.nodes.get_mut(&menu).and_then(Node::menu_mut) {
                    data.flush_task = None;
                    self.flush_recycle(menu);
                }
            },
            Task::LoadIcon { node, serial } => self.load_icon(node, serial),
            Task::ShowMenu { menu, item } => {
                if self.items.get(&item) == Some(&menu) && self.export.contains(item) {
                    self.export.show_to_user(item, 0);
                } else {
                    log::debug!("Delayed open of {item:?} dropped, item is gone");
                }
            },
        }
    }

    // Export events

    /// The shell is about to show the submenu of `item`. Always answers
    /// `false`; layout changes are announced separately.
    pub fn about_to_show(&mut self, item: ItemId) -> bool {
        if let Some(id) = self.node_for_item(item) {
            if self.kind(id) == Some(NodeKind::Menu) {
                self.about_to_open(id);
            }
        }
        false
    }

    /// A named event from the shell for `item`.
    pub fn handle_event(&mut self, item: ItemId, event: &str, timestamp: u32) {
        let Some(id) = self.node_for_item(item) else {
            log::debug!("Event '{event}' for unknown item {item:?}");
            return;
        };
        match (self.kind(id), event) {
            (Some(NodeKind::Menu), "opened") => self.on_open(id),
            (Some(NodeKind::Menu), "closed") => self.on_close(id),
            (Some(NodeKind::Menu), "about-to-show") => self.about_to_open(id),
            (Some(NodeKind::Item), "clicked") => self.activate_item(id),
            (kind, event) => log::debug!("Ignoring '{event}' for {kind:?} {id:?} at {timestamp}"),
        }
    }

    // Node lifecycle

    fn allocate_id(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    pub(crate) fn create_child(&mut self, content: ContentId, parent: NodeId, adopt: Option<ItemId>) -> Result<NodeId> {
        let kind = NodeKind::for_tag(self.doc.resolve_tag(content).as_deref());
        self.create_node(kind, content, parent, adopt)
    }

    fn create_node(&mut self, kind: NodeKind, content: ContentId, parent: NodeId, adopt: Option<ItemId>) -> Result<NodeId> {
        debug_assert!(kind != NodeKind::Bar, "bars are created through create_bar");
        let parent_node = self.nodes.get(&parent).ok_or(MenuError::UnknownNode(parent))?;
        let bar = match parent_node.kind {
            NodeKind::Bar => Some(parent),
            _ => parent_node.bar,
        };
        let parent_item = parent_node.item;

        let item = match adopt {
            Some(item) => {
                export::retain_properties(&mut self.export, item, kind.managed_properties());
                item
            },
            None => self.export.create_item()?,
        };

        let id = self.allocate_id();
        let payload = match kind {
            NodeKind::Menu => Payload::Menu(Default::default()),
            NodeKind::Item => Payload::Item(Default::default()),
            NodeKind::Bar | NodeKind::Separator | NodeKind::Dummy => Payload::Leaf,
        };
        self.nodes.insert(
            id,
            Node {
                kind,
                content,
                item,
                parent: Some(parent),
                bar,
                state: NodeState::default(),
                icon: Default::default(),
                payload,
            },
        );
        self.items.insert(item, id);

        if let Err(err) = self.initialize(id) {
            if adopt.is_some() {
                if let Err(detach) = self.export.delete_child(parent_item, item) {
                    log::warn!("Failed to detach recycled item {item:?}: {detach}");
                }
            }
            self.destroy_node(id, false);
            return Err(err);
        }
        Ok(id)
    }

    fn initialize(&mut self, id: NodeId) -> Result<()> {
        let (kind, content) = self.node_key(id)?;
        match kind {
            NodeKind::Menu => {
                let ready = match self.parent(id) {
                    Some(parent) if self.kind(parent) == Some(NodeKind::Bar) => {
                        self.registration(parent) == Some(RegistrationState::Registered)
                    },
                    _ => true,
                };
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.state.needs_rebuild = true;
                    node.state.ready = ready;
                }
                self.router.register(content, id)?;
                self.set_property(id, export::prop::CHILDREN_DISPLAY, export::DISPLAY_SUBMENU.into());
                self.refresh(id);
            },
            NodeKind::Item => {
                self.router.register(content, id)?;
                self.refresh(id);
            },
            NodeKind::Separator => {
                self.router.register(content, id)?;
                self.set_property(id, export::prop::TYPE, export::TYPE_SEPARATOR.into());
                self.refresh(id);
            },
            NodeKind::Dummy => {
                self.set_property(id, export::prop::VISIBLE, false.into());
            },
            NodeKind::Bar => {},
        }
        Ok(())
    }

    /// Destroy `id` and everything below it. With `keep_item` the export
    /// item survives (it is being recycled) but loses its children.
    pub(crate) fn destroy_node(&mut self, id: NodeId, keep_item: bool) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if self.items.get(&node.item) == Some(&id) {
            self.items.remove(&node.item);
        }
        if let Some(task) = node.icon.task {
            self.scheduler.cancel(task);
        }

        match node.payload {
            Payload::Menu(mut menu) => {
                if let Some(popup) = menu.popup.filter(|p| *p != node.content) {
                    self.unwatch(popup, id);
                }
                self.unwatch(node.content, id);
                for child in menu.children {
                    self.discard_child(node.item, child);
                }
                if let Some(task) = menu.flush_task {
                    self.scheduler.cancel(task);
                }
                if let Some(mut list) = menu.recycle.take() {
                    for item in list.drain() {
                        self.drop_item(node.item, item);
                    }
                }
            },
            Payload::Bar(bar) => {
                // a bar that failed to initialize may lack either registration
                if self.router.is_registered(node.content, id) {
                    self.unwatch(node.content, id);
                }
                if self.router.has_fallback(id) {
                    self.unwatch_fallback(id);
                }
                for child in bar.children {
                    self.discard_child(node.item, child);
                }
                self.export.destroy_server(bar.server);
            },
            Payload::Item(item) => {
                self.unwatch(node.content, id);
                if let Some(command) = item.command {
                    self.unwatch(command, id);
                }
            },
            Payload::Leaf => {
                if node.kind == NodeKind::Separator {
                    self.unwatch(node.content, id);
                }
            },
        }

        if !keep_item {
            self.export.destroy_item(node.item);
        }
    }

    pub(crate) fn discard_child(&mut self, parent_item: ItemId, child: NodeId) {
        if let Some(child_item) = self.item(child) {
            if let Err(err) = self.export.delete_child(parent_item, child_item) {
                log::warn!("Failed to detach {child_item:?}: {err}");
            }
        }
        self.destroy_node(child, false);
    }

    pub(crate) fn drop_item(&mut self, parent_item: ItemId, item: ItemId) {
        if let Err(err) = self.export.delete_child(parent_item, item) {
            log::warn!("Failed to detach recycled {item:?}: {err}");
        }
        self.export.destroy_item(item);
    }

    fn unwatch_fallback(&mut self, id: NodeId) {
        if let Err(err) = self.router.unregister_fallback(id) {
            log::warn!("Menu bar {id:?}: {err}");
        }
    }

    fn unwatch(&mut self, content: ContentId, id: NodeId) {
        if let Err(err) = self.router.unregister(content, id) {
            log::warn!("Node {id:?}: {err}");
        }
    }

    // Helpers shared by the node kinds

    pub(crate) fn node_key(&self, id: NodeId) -> Result<(NodeKind, ContentId)> {
        self.nodes
            .get(&id)
            .map(|n| (n.kind, n.content))
            .ok_or(MenuError::UnknownNode(id))
    }

    pub(crate) fn set_property(&mut self, id: NodeId, key: &str, value: export::PropertyValue) {
        if let Some(item) = self.item(id) {
            self.export.set_property(item, key, value);
        }
    }

    pub(crate) fn remove_property(&mut self, id: NodeId, key: &str) {
        if let Some(item) = self.item(id) {
            self.export.remove_property(item, key);
        }
    }

    /// Write an attribute on behalf of the engine and route the resulting
    /// notification synchronously. Unchanged values are not written.
    pub(crate) fn write_attribute(&mut self, content: ContentId, name: &str, value: Option<&str>) {
        if self.doc.attribute(content, name).as_deref() == value {
            return;
        }
        match value {
            Some(value) => self.doc.set_attribute(content, name, value),
            None => self.doc.remove_attribute(content, name),
        }
        self.attribute_changed(content, name);
    }

    /// Run `f` with `guard` held on `id`. Returns `false` without running
    /// `f` if the guard is already held or the node is gone.
    pub(crate) fn guarded(&mut self, id: NodeId, guard: Guard, f: impl FnOnce(&mut Self)) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if !node.state.guard_held(guard) => node.state.set_guard(guard, true),
            _ => return false,
        }
        f(self);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.set_guard(guard, false);
        }
        true
    }

    /// Dispatch a synthesized event, then route whatever its listeners did.
    pub(crate) fn fire(&mut self, target: ContentId, kind: DomEventKind) -> bool {
        let allowed = self.doc.dispatch_event(target, &DomEvent::new(kind));
        self.process_mutations();
        allowed
    }
}

fn protocol_violation(id: NodeId, what: &str) {
    log::warn!("Node {id:?}: {what}");
    debug_assert!(false, "Node {id:?}: {what}");
}
