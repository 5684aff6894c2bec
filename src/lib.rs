#![warn(missing_docs)]

//! Mirror XUL menu bars onto the desktop shell's global menu.
//!
//! The engine lives in [core]; [services] provides settings and icon
//! loading; with the `dbus` feature, [dbus] serves the result over the
//! session bus.

pub use globalmenu_core as core;
#[cfg(feature = "dbus")]
pub use globalmenu_dbus as dbus;
pub use globalmenu_services as services;

/// A "prelude" for hosts of the menu engine.
///
/// ```rust
/// use globalmenu::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::MenuPreferences;
    pub use crate::core::content::{ContentId, Document, MemoryDocument, Mutation};
    pub use crate::core::export::{ExportSink, ExportTree, ItemId, PropertyValue};
    pub use crate::core::keys::{KeyEvent, KeyOutcome};
    pub use crate::core::notify::Notification;
    pub use crate::core::{MenuError, MenuService, NodeId, Services, ShellTransport, WindowId};

    pub use crate::services::{FileIconSource, SettingsRegistry};

    #[cfg(feature = "dbus")]
    pub use crate::dbus::{pump, Bridge, DbusExport, DbusMenuService};
}
