// SPDX-License-Identifier: LGPL-3.0-only
//! The export sink: the menu-protocol objects mirroring proxy nodes.

mod tree;

use thiserror::Error;

pub use tree::{ExportChange, ExportItem, ExportServer, ExportStats, ExportTree};

/// Handle to an exported menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Handle to an export server (one per menu bar path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

/// dbusmenu property names.
pub mod prop {
    /// Label with `_` mnemonics.
    pub const LABEL: &str = "label";
    /// Sensitivity.
    pub const ENABLED: &str = "enabled";
    /// Visibility.
    pub const VISIBLE: &str = "visible";
    /// PNG encoded icon.
    pub const ICON_DATA: &str = "icon-data";
    /// `separator` for separators.
    pub const TYPE: &str = "type";
    /// `submenu` for menus, `menubar` for the root.
    pub const CHILDREN_DISPLAY: &str = "children-display";
    /// Keyboard shortcut.
    pub const SHORTCUT: &str = "shortcut";
    /// `checkmark` or `radio`.
    pub const TOGGLE_TYPE: &str = "toggle-type";
    /// 1 when checked, 0 otherwise.
    pub const TOGGLE_STATE: &str = "toggle-state";
}

/// Value of `type` for separators.
pub const TYPE_SEPARATOR: &str = "separator";
/// Value of `children-display` for submenus.
pub const DISPLAY_SUBMENU: &str = "submenu";
/// Value of `children-display` for the bar root.
pub const DISPLAY_MENUBAR: &str = "menubar";
/// Value of `toggle-type` for checkboxes.
pub const TOGGLE_CHECKMARK: &str = "checkmark";
/// Value of `toggle-type` for radio items.
pub const TOGGLE_RADIO: &str = "radio";

/// A property value on an exported item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Boolean property.
    Bool(bool),
    /// Integer property.
    Int(i32),
    /// String property.
    Str(String),
    /// Binary property (icon data).
    Bytes(Vec<u8>),
    /// Shortcut chords.
    Shortcut(Vec<Vec<String>>),
}

impl PropertyValue {
    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload, if any.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

/// Attention state of an export server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Regular rendering.
    #[default]
    Normal,
    /// The shell should draw attention (accelerator held).
    Notice,
}

impl Status {
    /// Protocol string.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Notice => "notice",
        }
    }
}

/// Errors raised by an export sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The item does not exist.
    #[error("Unknown export item {0:?}")]
    UnknownItem(ItemId),

    /// The server does not exist.
    #[error("Unknown export server {0:?}")]
    UnknownServer(ServerId),

    /// The insertion position is past the end.
    #[error("Position {position} out of range for {parent:?} ({len} children)")]
    Position {
        /// Parent item.
        parent: ItemId,
        /// Requested position.
        position: usize,
        /// Current child count.
        len: usize,
    },

    /// The child already has a parent.
    #[error("Export item {0:?} already has a parent")]
    AlreadyParented(ItemId),

    /// The child is not attached to this parent.
    #[error("Export item {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Parent item.
        parent: ItemId,
        /// Child item.
        child: ItemId,
    },

    /// Item allocation failed.
    #[error("Export item allocation failed")]
    Allocation,
}

/// Operations the engine performs on exported menu items.
///
/// One call per semantic operation; implementations may batch the resulting
/// protocol traffic.
pub trait ExportSink {
    /// Create a server advertised at `path`.
    fn create_server(&mut self, path: &str) -> Result<ServerId, ExportError>;

    /// Tear a server down.
    fn destroy_server(&mut self, server: ServerId);

    /// Set the root item of `server`.
    fn set_root(&mut self, server: ServerId, item: ItemId) -> Result<(), ExportError>;

    /// Set the attention state of `server`.
    fn set_status(&mut self, server: ServerId, status: Status);

    /// Allocate a detached item.
    fn create_item(&mut self) -> Result<ItemId, ExportError>;

    /// Free a detached item.
    fn destroy_item(&mut self, item: ItemId);

    /// Set a property.
    fn set_property(&mut self, item: ItemId, key: &str, value: PropertyValue);

    /// Remove a property.
    fn remove_property(&mut self, item: ItemId, key: &str);

    /// Read a property.
    fn property(&self, item: ItemId, key: &str) -> Option<PropertyValue>;

    /// Names of all properties set on `item`.
    fn property_keys(&self, item: ItemId) -> Vec<String>;

    /// Attach `child` under `parent` at `position`.
    fn insert_child(&mut self, parent: ItemId, child: ItemId, position: usize) -> Result<(), ExportError>;

    /// Attach `child` as the last child of `parent`.
    fn append_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError>;

    /// Detach `child` from `parent`.
    fn delete_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), ExportError>;

    /// Ask the shell to present the submenu of `item`.
    fn show_to_user(&mut self, item: ItemId, timestamp: u32);

    /// Whether `item` is alive.
    fn contains(&self, item: ItemId) -> bool;
}

/// Drop every property of `item` not listed in `keep`.
pub fn retain_properties<E: ExportSink + ?Sized>(sink: &mut E, item: ItemId, keep: &[&str]) {
    for key in sink.property_keys(item) {
        if !keep.contains(&key.as_str()) {
            sink.remove_property(item, &key);
        }
    }
}

/// Whether `item` is exported as a separator.
pub fn is_separator<E: ExportSink + ?Sized>(sink: &E, item: ItemId) -> bool {
    sink.property(item, prop::TYPE).as_ref().and_then(PropertyValue::as_str) == Some(TYPE_SEPARATOR)
}
