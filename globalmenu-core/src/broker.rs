// SPDX-License-Identifier: LGPL-3.0-only
//! Asynchronous, cancellable registration of menu bars with the shell.
//!
//! The broker owns the transport and the bookkeeping of outstanding requests.
//! Every request carries a [CancellationToken]; a reply for a cancelled or
//! forgotten request is dropped before anything looks at the bar it was for.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::{MenuError, Result};

/// Native top-level window handle (an X11 XID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl WindowId {
    /// Export path advertised for this window.
    pub fn menu_path(self) -> String {
        format!("/com/canonical/menu/{:X}", self.0)
    }
}

/// Handle to one registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Failures reported by a shell transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// The bus call failed.
    #[error("Shell call failed: {0}")]
    Call(String),

    /// The transport is gone.
    #[error("Shell transport disconnected")]
    Disconnected,
}

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// A `RegisterWindow` call completed.
    Registered {
        /// The request this answers.
        request: RequestId,
        /// Outcome of the call.
        result: std::result::Result<(), ShellError>,
    },
    /// The registrar name gained (`true`) or lost (`false`) its owner.
    Availability(bool),
}

/// Wire access to the shell's registrar.
pub trait ShellTransport {
    /// Start `RegisterWindow(window, path)`. The reply arrives later through
    /// [ShellTransport::poll_events]; `token` may be cancelled meanwhile.
    fn register_window(&mut self, request: RequestId, window: WindowId, path: &str, token: CancellationToken);

    /// Fire-and-forget `UnregisterWindow(window)`.
    fn unregister_window(&mut self, window: WindowId);

    /// Drain events observed since the last call.
    fn poll_events(&mut self) -> Vec<ShellEvent>;
}

/// A broker event after cancellation filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A live request completed.
    Completed {
        /// Window the request was for.
        window: WindowId,
        /// Outcome of the call.
        result: std::result::Result<(), ShellError>,
    },
    /// The shell availability changed.
    AvailabilityChanged(bool),
}

#[derive(Debug)]
struct Pending {
    window: WindowId,
    token: CancellationToken,
}

/// Registration broker.
pub struct RegistrationBroker<S> {
    transport: S,
    online: bool,
    next_request: u64,
    pending: HashMap<RequestId, Pending>,
}

impl<S: ShellTransport> RegistrationBroker<S> {
    /// Wrap `transport`. The shell counts as offline until the transport
    /// reports otherwise.
    pub fn new(transport: S) -> Self {
        Self {
            transport,
            online: false,
            next_request: 0,
            pending: HashMap::new(),
        }
    }

    /// Whether the registrar currently has an owner.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// The transport.
    pub fn transport(&self) -> &S {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut S {
        &mut self.transport
    }

    /// Number of outstanding requests.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Issue one `RegisterWindow` call for `window`.
    pub fn register(&mut self, window: WindowId, path: &str) -> Result<RequestId> {
        if !self.online {
            return Err(MenuError::Offline);
        }
        self.next_request += 1;
        let request = RequestId(self.next_request);
        let token = CancellationToken::new();
        self.pending.insert(
            request,
            Pending {
                window,
                token: token.clone(),
            },
        );
        log::debug!("Registering window {window} at {path} ({request:?})");
        self.transport.register_window(request, window, path, token);
        Ok(request)
    }

    /// Cancel every outstanding request for `window`.
    pub fn cancel(&mut self, window: WindowId) -> usize {
        let cancelled: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.window == window)
            .map(|(id, _)| *id)
            .collect();
        for id in &cancelled {
            if let Some(pending) = self.pending.remove(id) {
                pending.token.cancel();
            }
        }
        cancelled.len()
    }

    /// Tell the shell `window` no longer exports a menu.
    pub fn unregister(&mut self, window: WindowId) {
        self.cancel(window);
        if self.online {
            self.transport.unregister_window(window);
        }
    }

    /// Record a new availability. Going offline cancels everything.
    /// Returns whether the state changed.
    pub fn set_online(&mut self, online: bool) -> bool {
        if self.online == online {
            return false;
        }
        self.online = online;
        if !online {
            for (_, pending) in self.pending.drain() {
                pending.token.cancel();
            }
        }
        true
    }

    /// Poll the transport and filter out replies nobody waits for anymore.
    pub fn poll(&mut self) -> Vec<BrokerEvent> {
        let mut out = Vec::new();
        for event in self.transport.poll_events() {
            match event {
                ShellEvent::Availability(online) => {
                    if self.set_online(online) {
                        out.push(BrokerEvent::AvailabilityChanged(online));
                    }
                },
                ShellEvent::Registered { request, result } => {
                    let Some(pending) = self.pending.remove(&request) else {
                        log::debug!("Dropping reply for forgotten request {request:?}");
                        continue;
                    };
                    if pending.token.is_cancelled() {
                        log::debug!("Dropping reply for cancelled request {request:?}");
                        continue;
                    }
                    out.push(BrokerEvent::Completed {
                        window: pending.window,
                        result,
                    });
                },
            }
        }
        out
    }
}
