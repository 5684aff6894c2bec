// SPDX-License-Identifier: LGPL-3.0-only
#![warn(missing_docs)]

//! Core synchronization engine for globalmenu.
//!
//! The engine keeps a tree of proxy menu objects in lockstep with a live
//! XUL-style content tree and mirrors it onto an export sink (libdbusmenu
//! semantics). Everything here runs on a single logical thread; asynchronous
//! work is modelled as continuations queued on a [scheduler::Scheduler].

/// Shell registration broker.
pub mod broker;
/// Runtime preferences read by the engine.
pub mod config;
/// Host content tree seam.
pub mod content;
/// Error types.
pub mod error;
/// Export sink seam and the in-memory export tree.
pub mod export;
/// Icon resolution and decoding.
pub mod icon;
/// Keyboard accelerator types.
pub mod keys;
/// Access-key label formatting.
pub mod label;
/// Proxy node definitions.
pub mod node;
/// Broadcast notifications for the host application.
pub mod notify;
/// Deferred reuse of detached export items.
pub mod recycle;
/// Content change routing.
pub mod router;
/// Idle and timer continuations.
pub mod scheduler;
/// Top-level service owning bars and the broker.
pub mod service;
/// Injected service handles.
pub mod services;
/// The proxy tree and its synchronization algorithms.
pub mod tree;

pub use broker::{RegistrationBroker, ShellEvent, ShellTransport, WindowId};
pub use content::{ContentId, Document, MemoryDocument, Mutation};
pub use error::MenuError;
pub use export::{ExportSink, ExportTree, ItemId, PropertyValue};
pub use node::{NodeId, NodeKind};
pub use service::MenuService;
pub use services::Services;
