// SPDX-License-Identifier: LGPL-3.0-only
use thiserror::Error;

use crate::broker::WindowId;
use crate::content::ContentId;
use crate::export::ExportError;
use crate::node::NodeId;
use crate::router::RouterError;

/// Errors raised by engine operations.
#[derive(Error, Debug)]
pub enum MenuError {
    /// The export sink rejected an operation.
    #[error("Export failure: {0}")]
    Export(#[from] ExportError),

    /// Observer registration was inconsistent.
    #[error("Router failure: {0}")]
    Router(#[from] RouterError),

    /// The node does not exist (anymore).
    #[error("Unknown menu node {0:?}")]
    UnknownNode(NodeId),

    /// The operation needs a container node.
    #[error("Menu node {0:?} is not a container")]
    NotAContainer(NodeId),

    /// The content node lacks something the proxy needs.
    #[error("Content {0:?} is missing required {1}")]
    MissingArgument(ContentId, &'static str),

    /// A child index was outside the container.
    #[error("Child index {index} out of range for {node:?} ({len} children)")]
    IndexOutOfRange {
        /// Container node.
        node: NodeId,
        /// Requested index.
        index: usize,
        /// Current child count.
        len: usize,
    },

    /// The shell is not available.
    #[error("The menu service is offline")]
    Offline,

    /// The window already exports a menu bar.
    #[error("Window {0} already has a menu bar")]
    WindowHasMenu(WindowId),

    /// The window has no menu bar.
    #[error("Window {0} has no menu bar")]
    NoMenuBar(WindowId),

    /// A zero window handle.
    #[error("Invalid window handle {0}")]
    InvalidWindow(WindowId),

    /// The menubar opted out of global export.
    #[error("Menubar {0:?} is marked to stay in the window")]
    KeepInWindow(ContentId),
}

/// Result alias for engine operations.
pub type Result<T, E = MenuError> = std::result::Result<T, E>;
