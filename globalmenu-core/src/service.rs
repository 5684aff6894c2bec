// SPDX-License-Identifier: LGPL-3.0-only
//! Process-wide menu service.
//!
//! Owns the proxy tree, the registration broker and the window to bar map.
//! Hosts forward document mutations, shell events, key events and export
//! events here and drive the idle/timer continuations from their loop.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use indexmap::IndexMap;

use crate::broker::{BrokerEvent, RegistrationBroker, ShellTransport, WindowId};
use crate::content::{class, ContentId, Document, Mutation};
use crate::error::{MenuError, Result};
use crate::export::{ExportSink, ItemId};
use crate::keys::{KeyEvent, KeyOutcome};
use crate::node::{NodeId, RegistrationState};
use crate::notify::Notification;
use crate::services::Services;
use crate::tree::MenuTree;

/// The menu service.
pub struct MenuService<D, E, S> {
    tree: MenuTree<D, E>,
    broker: RegistrationBroker<S>,
    bars: IndexMap<WindowId, NodeId>,
}

impl<D: Document, E: ExportSink, S: ShellTransport> MenuService<D, E, S> {
    /// Create a service. It stays offline until the shell transport reports
    /// the registrar, see [MenuService::dispatch_shell_events].
    pub fn new(document: D, export: E, shell: S, services: Services) -> Self {
        Self {
            tree: MenuTree::new(document, export, services),
            broker: RegistrationBroker::new(shell),
            bars: IndexMap::new(),
        }
    }

    /// The proxy tree.
    pub fn tree(&self) -> &MenuTree<D, E> {
        &self.tree
    }

    /// The proxy tree, mutably.
    pub fn tree_mut(&mut self) -> &mut MenuTree<D, E> {
        &mut self.tree
    }

    /// The host document.
    pub fn document(&self) -> &D {
        self.tree.document()
    }

    /// The host document, mutably.
    pub fn document_mut(&mut self) -> &mut D {
        self.tree.document_mut()
    }

    /// The export sink.
    pub fn export(&self) -> &E {
        self.tree.export()
    }

    /// The registration broker.
    pub fn broker(&self) -> &RegistrationBroker<S> {
        &self.broker
    }

    /// The registration broker, mutably.
    pub fn broker_mut(&mut self) -> &mut RegistrationBroker<S> {
        &mut self.broker
    }

    /// Subscribe to service notifications.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.tree.subscribe()
    }

    /// Whether the shell is available.
    pub fn is_online(&self) -> bool {
        self.broker.is_online()
    }

    /// Bar exported for `window`.
    pub fn bar(&self, window: WindowId) -> Option<NodeId> {
        self.bars.get(&window).copied()
    }

    /// Windows with an exported bar, in creation order.
    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.bars.keys().copied()
    }

    /// Export `content` as the global menu bar of `window` and start
    /// registering it with the shell.
    pub fn create_menu_bar(&mut self, window: WindowId, content: ContentId) -> Result<NodeId> {
        if !self.broker.is_online() {
            return Err(MenuError::Offline);
        }
        if window.0 == 0 {
            return Err(MenuError::InvalidWindow(window));
        }
        if self.bars.contains_key(&window) {
            return Err(MenuError::WindowHasMenu(window));
        }
        if !self.tree.document().is_in_document(content) {
            return Err(MenuError::MissingArgument(content, "menubar in the document"));
        }
        if self.tree.document().has_class(content, class::MENUBAR_KEEP_IN_WINDOW) {
            return Err(MenuError::KeepInWindow(content));
        }

        let bar = self.tree.create_bar(window, content)?;
        let path = self.tree.bar_path(bar).map(str::to_owned).unwrap_or_else(|| window.menu_path());
        if let Err(err) = self.broker.register(window, &path) {
            self.tree.destroy_bar(bar);
            return Err(err);
        }
        self.tree.set_registration(bar, RegistrationState::Pending);
        self.bars.insert(window, bar);
        Ok(bar)
    }

    /// Destroy the bar of `window`, cancelling its registration.
    pub fn destroy_menu_bar(&mut self, window: WindowId) -> Result<()> {
        let bar = self.bars.shift_remove(&window).ok_or(MenuError::NoMenuBar(window))?;
        self.broker.unregister(window);
        self.tree.destroy_bar(bar);
        log::info!("Destroyed menu bar of window {window}");
        Ok(())
    }

    /// Poll the shell transport and apply what it reported.
    pub fn dispatch_shell_events(&mut self) -> usize {
        let events = self.broker.poll();
        let count = events.len();
        for event in events {
            match event {
                BrokerEvent::AvailabilityChanged(online) => self.availability_changed(online),
                BrokerEvent::Completed { window, result } => {
                    let Some(bar) = self.bars.get(&window).copied() else {
                        continue;
                    };
                    match result {
                        Ok(()) => {
                            log::info!("Window {window} registered with the shell");
                            self.tree.registration_finished(bar, true);
                        },
                        Err(err) => {
                            log::warn!("Failed to register window {window}: {err}");
                            self.tree.registration_finished(bar, false);
                        },
                    }
                },
            }
        }
        count
    }

    /// Force the availability, for hosts that watch the registrar themselves.
    pub fn set_online(&mut self, online: bool) {
        if self.broker.set_online(online) {
            self.availability_changed(online);
        }
    }

    fn availability_changed(&mut self, online: bool) {
        if online {
            log::info!("Global menu shell is online");
            self.tree.notifier.broadcast(Notification::Online);
            return;
        }
        log::info!("Global menu shell went away, destroying {} bars", self.bars.len());
        for (window, bar) in std::mem::take(&mut self.bars) {
            self.broker.cancel(window);
            self.tree.destroy_bar(bar);
        }
        self.tree.notifier.broadcast(Notification::Offline);
    }

    // Document notifications

    /// See [MenuTree::attribute_changed].
    pub fn attribute_changed(&mut self, node: ContentId, attribute: &str) {
        self.tree.attribute_changed(node, attribute);
    }

    /// See [MenuTree::child_inserted].
    pub fn child_inserted(&mut self, container: ContentId, child: ContentId, index: usize) {
        self.tree.child_inserted(container, child, index);
    }

    /// See [MenuTree::child_removed].
    pub fn child_removed(&mut self, container: ContentId, child: ContentId, index: usize) {
        self.tree.child_removed(container, child, index);
    }

    /// See [MenuTree::children_appended].
    pub fn children_appended(&mut self, container: ContentId, first_index: usize) {
        self.tree.children_appended(container, first_index);
    }

    /// Route one mutation.
    pub fn apply(&mut self, mutation: Mutation) {
        self.tree.apply(mutation);
    }

    /// Drain and route every queued host mutation.
    pub fn process_mutations(&mut self) -> usize {
        self.tree.process_mutations()
    }

    // Export events

    /// The shell is about to show the submenu of `item`.
    pub fn about_to_show(&mut self, item: ItemId) -> bool {
        self.tree.about_to_show(item)
    }

    /// Forward an event (`opened`, `closed`, `clicked`) for `item`.
    pub fn handle_item_event(&mut self, item: ItemId, event: &str, timestamp: u32) {
        self.tree.handle_event(item, event, timestamp);
    }

    // Window events

    /// A key went down in `window`.
    pub fn key_down(&mut self, window: WindowId, event: &KeyEvent) -> KeyOutcome {
        match self.bar(window) {
            Some(bar) => self.tree.bar_key_down(bar, event),
            None => KeyOutcome::Ignored,
        }
    }

    /// A key went up in `window`.
    pub fn key_up(&mut self, window: WindowId, event: &KeyEvent) -> KeyOutcome {
        match self.bar(window) {
            Some(bar) => self.tree.bar_key_up(bar, event),
            None => KeyOutcome::Ignored,
        }
    }

    /// A key was typed in `window`.
    pub fn key_press(&mut self, window: WindowId, event: &KeyEvent) -> KeyOutcome {
        match self.bar(window) {
            Some(bar) => self.tree.bar_key_press(bar, event),
            None => KeyOutcome::Ignored,
        }
    }

    /// `window` gained focus.
    pub fn focus(&mut self, window: WindowId) {
        if let Some(bar) = self.bar(window) {
            self.tree.bar_focus(bar);
        }
    }

    /// `window` lost focus.
    pub fn blur(&mut self, window: WindowId) {
        if let Some(bar) = self.bar(window) {
            self.tree.bar_blur(bar);
        }
    }

    // Continuations

    /// Run the current idle batch.
    pub fn run_idle(&mut self) -> usize {
        self.tree.run_idle()
    }

    /// Run timers due at `now`.
    pub fn run_timers(&mut self, now: Instant) -> usize {
        self.tree.run_timers(now)
    }

    /// Earliest timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tree.next_deadline()
    }
}
