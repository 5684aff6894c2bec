// SPDX-License-Identifier: LGPL-3.0-only
//! Bus thread serving the export tree and talking to the registrar.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use globalmenu_core::broker::{RequestId, ShellError, ShellEvent, ShellTransport, WindowId};
use globalmenu_core::export::{ItemId, ServerId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use zbus::blocking::Connection;
use zbus::block_on;

use crate::export::DbusExport;
use crate::menu_object::MenuObject;
use crate::registrar::{watch_owner, AppMenuRegistrar};
use crate::types::collect_signals;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Errors starting the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The session bus is unreachable.
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// A helper thread could not be spawned.
    #[error("Failed to spawn bridge thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A request from the shell to the engine, received on a menu object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    /// `AboutToShow(id)`.
    AboutToShow {
        /// Target item.
        item: ItemId,
    },
    /// `Event(id, name, data, timestamp)`.
    Event {
        /// Target item.
        item: ItemId,
        /// `opened`, `closed`, `clicked` and so on.
        name: String,
        /// Event timestamp.
        timestamp: u32,
    },
}

/// Commands sent to the bridge thread.
pub(crate) enum Command {
    Register {
        request: RequestId,
        window: WindowId,
        path: String,
        token: CancellationToken,
    },
    Unregister(WindowId),
    Shutdown,
}

/// The D-Bus bridge.
pub struct Bridge {
    tx: Sender<Command>,
    events: Receiver<MenuEvent>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
    watch: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Connect to the session bus and start serving `export`.
    ///
    /// Returns the bridge and the shell transport to hand to the
    /// [globalmenu_core::MenuService].
    pub fn start(export: DbusExport) -> Result<(Self, DbusShell), BridgeError> {
        let connection = Connection::session()?;
        log::info!("Global menu bridge connected as {:?}", connection.unique_name());

        let (tx, cmd_rx) = mpsc::channel();
        let (menu_tx, menu_rx) = mpsc::channel();
        let (shell_tx, shell_rx) = mpsc::channel();
        let shutdown = CancellationToken::new();

        let watch = watch_owner(connection.clone(), shell_tx.clone(), shutdown.clone())?;
        let handle = thread::Builder::new()
            .name("globalmenu-dbus".into())
            .spawn(move || {
                let mut worker = Worker {
                    connection,
                    export,
                    menu_tx,
                    shell_tx,
                    served: HashMap::new(),
                };
                if let Err(err) = worker.run(cmd_rx) {
                    log::error!("Global menu bridge thread exited: {err}");
                }
            })?;

        let shell = DbusShell {
            tx: tx.clone(),
            rx: shell_rx,
            failed: Vec::new(),
        };
        let bridge = Self {
            tx,
            events: menu_rx,
            shutdown,
            handle: Some(handle),
            watch: Some(watch),
        };
        Ok((bridge, shell))
    }

    /// Drain requests received from the shell.
    pub fn poll_events(&self) -> Vec<MenuEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Global menu bridge thread panicked");
            }
        }
        if let Some(watch) = self.watch.take() {
            if watch.join().is_err() {
                log::error!("Registrar watch thread panicked");
            }
        }
    }
}

struct Worker {
    connection: Connection,
    export: DbusExport,
    menu_tx: Sender<MenuEvent>,
    shell_tx: Sender<ShellEvent>,
    served: HashMap<ServerId, String>,
}

impl Worker {
    fn run(&mut self, cmd_rx: Receiver<Command>) -> zbus::Result<()> {
        let registrar = AppMenuRegistrar::new(&self.connection)?;
        loop {
            let command = cmd_rx.recv_timeout(POLL_INTERVAL);
            // objects must exist before the shell is told about them
            self.sync_servers()?;
            match command {
                Ok(Command::Register {
                    request,
                    window,
                    path,
                    token,
                }) => {
                    if token.is_cancelled() {
                        log::debug!("Skipping cancelled registration of window {window}");
                        continue;
                    }
                    let result = registrar.register_window(window, &path);
                    if let Err(err) = &result {
                        log::warn!("RegisterWindow({window}, {path}) failed: {err}");
                    }
                    let _ = self.shell_tx.send(ShellEvent::Registered { request, result });
                },
                Ok(Command::Unregister(window)) => {
                    if let Err(err) = registrar.unregister_window(window) {
                        log::debug!("UnregisterWindow({window}) failed: {err}");
                    }
                },
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {},
            }
            self.emit_signals();
        }

        let object_server = self.connection.object_server();
        for (_, path) in self.served.drain() {
            object_server.remove::<MenuObject, _>(path.as_str())?;
        }
        Ok(())
    }

    fn sync_servers(&mut self) -> zbus::Result<()> {
        let current: Vec<(ServerId, String)> = self
            .export
            .lock()
            .servers()
            .map(|(id, server)| (id, server.path.clone()))
            .collect();
        let live: HashSet<ServerId> = current.iter().map(|(id, _)| *id).collect();
        let object_server = self.connection.object_server();

        let gone: Vec<ServerId> = self.served.keys().filter(|id| !live.contains(id)).copied().collect();
        for id in gone {
            if let Some(path) = self.served.remove(&id) {
                object_server.remove::<MenuObject, _>(path.as_str())?;
                log::debug!("Stopped serving {path}");
            }
        }
        for (id, path) in current {
            if self.served.contains_key(&id) {
                continue;
            }
            let object = MenuObject::new(self.export.clone(), id, self.menu_tx.clone());
            object_server.at(path.as_str(), object)?;
            log::debug!("Serving dbusmenu at {path}");
            self.served.insert(id, path);
        }
        Ok(())
    }

    fn emit_signals(&self) {
        let batches = collect_signals(&mut self.export.lock());
        let object_server = self.connection.object_server();
        for (server, mut signals) in batches {
            let Some(path) = self.served.get(&server) else {
                continue;
            };
            let iface = match object_server.interface::<_, MenuObject>(path.as_str()) {
                Ok(iface) => iface,
                Err(err) => {
                    log::warn!("No menu object at {path}: {err}");
                    continue;
                },
            };
            let emitter = iface.signal_emitter();

            for (revision, parent) in signals.layouts.drain(..) {
                if let Err(err) = block_on(MenuObject::layout_updated(emitter, revision, parent)) {
                    log::warn!("Failed to emit layout update: {err}");
                }
            }
            let updated = signals.updated_properties();
            let removed = signals.removed_properties();
            if !updated.is_empty() || !removed.is_empty() {
                if let Err(err) = block_on(MenuObject::items_properties_updated(emitter, updated, removed)) {
                    log::warn!("Failed to emit items properties updated: {err}");
                }
            }
            if signals.status {
                if let Err(err) = block_on(iface.get().status_changed(emitter)) {
                    log::warn!("Failed to emit status change: {err}");
                }
            }
            for (id, timestamp) in signals.activations {
                if let Err(err) = block_on(MenuObject::item_activation_requested(emitter, id, timestamp)) {
                    log::warn!("Failed to emit activation request: {err}");
                }
            }
        }
    }
}

/// [ShellTransport] over the bridge thread.
pub struct DbusShell {
    tx: Sender<Command>,
    rx: Receiver<ShellEvent>,
    failed: Vec<ShellEvent>,
}

impl ShellTransport for DbusShell {
    fn register_window(&mut self, request: RequestId, window: WindowId, path: &str, token: CancellationToken) {
        let command = Command::Register {
            request,
            window,
            path: path.to_string(),
            token,
        };
        if self.tx.send(command).is_err() {
            self.failed.push(ShellEvent::Registered {
                request,
                result: Err(ShellError::Disconnected),
            });
        }
    }

    fn unregister_window(&mut self, window: WindowId) {
        if self.tx.send(Command::Unregister(window)).is_err() {
            log::debug!("Bridge gone, not unregistering window {window}");
        }
    }

    fn poll_events(&mut self) -> Vec<ShellEvent> {
        let mut events = std::mem::take(&mut self.failed);
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
