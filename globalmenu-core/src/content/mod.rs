// SPDX-License-Identifier: LGPL-3.0-only
//! The narrow view of the host document the engine consumes.
//!
//! Writes issued through [Document] are *silent*: the host must not report
//! them back as [Mutation]s. The engine routes the resulting change
//! notifications itself, synchronously, so that its re-entrancy guards see
//! them exactly as a live mutation observer would deliver them.

mod memory;

pub use memory::MemoryDocument;

/// Handle to a node in the host content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub u64);

/// Attribute names the engine reads or writes.
pub mod attr {
    /// Visible label text.
    pub const LABEL: &str = "label";
    /// Access key character.
    pub const ACCESSKEY: &str = "accesskey";
    /// `"true"` disables the element.
    pub const DISABLED: &str = "disabled";
    /// `"true"` hides the element.
    pub const HIDDEN: &str = "hidden";
    /// `"true"` collapses the element.
    pub const COLLAPSED: &str = "collapsed";
    /// Explicit icon URI.
    pub const IMAGE: &str = "image";
    /// Whitespace separated class list.
    pub const CLASS: &str = "class";
    /// Reflects the open state of a menu.
    pub const OPEN: &str = "open";
    /// Reflects the active state of a menu.
    pub const MENUACTIVE: &str = "_moz-menuactive";
    /// Item type (`checkbox`, `radio`).
    pub const TYPE: &str = "type";
    /// Toggle state.
    pub const CHECKED: &str = "checked";
    /// Id of a command element.
    pub const COMMAND: &str = "command";
    /// Id of a key element.
    pub const KEY: &str = "key";
    /// Virtual key name on a key element.
    pub const KEYCODE: &str = "keycode";
    /// Modifier list on a key element.
    pub const MODIFIERS: &str = "modifiers";
    /// `"false"` stops clicks from toggling state.
    pub const AUTOCHECK: &str = "autocheck";
    /// Radio group name.
    pub const NAME: &str = "name";
    /// Element id.
    pub const ID: &str = "id";
}

/// Element tags the engine recognizes.
pub mod tag {
    /// Menu bar root.
    pub const MENUBAR: &str = "menubar";
    /// Submenu.
    pub const MENU: &str = "menu";
    /// Command item.
    pub const MENUITEM: &str = "menuitem";
    /// Separator.
    pub const MENUSEPARATOR: &str = "menuseparator";
    /// Popup container supplying submenu children.
    pub const MENUPOPUP: &str = "menupopup";
    /// Layout filler ignored when deciding whether a toolbar is empty.
    pub const TOOLBARSPRING: &str = "toolbarspring";
}

/// Class names with special meaning.
pub mod class {
    /// Visible only when the bar was opened from the keyboard.
    pub const SHOW_ONLY_FOR_KEYBOARD: &str = "show-only-for-keyboard";
    /// Keeps its icon even when menu icons are disabled.
    pub const MENUITEM_WITH_FAVICON: &str = "menuitem-with-favicon";
    /// Opts a menubar out of global export.
    pub const MENUBAR_KEEP_IN_WINDOW: &str = "menubar-keep-in-window";
}

/// DOM events the engine synthesizes toward the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    /// A menu became active.
    MenuItemActive,
    /// A menu stopped being active.
    MenuItemInactive,
    /// A popup is about to show.
    PopupShowing,
    /// A popup was shown.
    PopupShown,
    /// A popup is about to hide.
    PopupHiding,
    /// A popup was hidden.
    PopupHidden,
    /// An item was activated.
    Command,
}

impl DomEventKind {
    /// The DOM event type string.
    pub fn name(self) -> &'static str {
        match self {
            DomEventKind::MenuItemActive => "DOMMenuItemActive",
            DomEventKind::MenuItemInactive => "DOMMenuItemInactive",
            DomEventKind::PopupShowing => "popupshowing",
            DomEventKind::PopupShown => "popupshown",
            DomEventKind::PopupHiding => "popuphiding",
            DomEventKind::PopupHidden => "popuphidden",
            DomEventKind::Command => "command",
        }
    }
}

/// A synthesized, trusted DOM event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomEvent {
    /// Event type.
    pub kind: DomEventKind,
    /// Whether the event bubbles.
    pub bubbles: bool,
    /// Whether listeners may cancel it.
    pub cancelable: bool,
}

impl DomEvent {
    /// Build an event with the host's usual flags for `kind`.
    pub fn new(kind: DomEventKind) -> Self {
        let (bubbles, cancelable) = match kind {
            DomEventKind::MenuItemActive | DomEventKind::MenuItemInactive => (true, false),
            DomEventKind::PopupShowing | DomEventKind::PopupHiding => (true, true),
            DomEventKind::PopupShown | DomEventKind::PopupHidden => (true, false),
            DomEventKind::Command => (true, true),
        };
        Self {
            kind,
            bubbles,
            cancelable,
        }
    }
}

/// A content tree change reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// An attribute was set or removed.
    AttributeChanged {
        /// Element whose attribute changed.
        node: ContentId,
        /// Attribute name.
        attribute: String,
    },
    /// A child was inserted.
    ChildInserted {
        /// Parent element.
        container: ContentId,
        /// Inserted child.
        child: ContentId,
        /// Index of the child after insertion.
        index: usize,
    },
    /// A child was removed.
    ChildRemoved {
        /// Parent element.
        container: ContentId,
        /// Removed child.
        child: ContentId,
        /// Index the child had before removal.
        index: usize,
    },
    /// Several children were appended at once, starting at `first_index`.
    ChildrenAppended {
        /// Parent element.
        container: ContentId,
        /// Index of the first appended child.
        first_index: usize,
    },
}

/// Read/write access to the host's content tree.
pub trait Document {
    /// Element tag of `node`.
    fn tag(&self, node: ContentId) -> Option<String>;

    /// Tag after the host applied any pending binding to `node`.
    fn resolve_tag(&mut self, node: ContentId) -> Option<String> {
        self.tag(node)
    }

    /// Attribute value.
    fn attribute(&self, node: ContentId, name: &str) -> Option<String>;

    /// Whether `name` is exactly `value` on `node`.
    fn attribute_is(&self, node: ContentId, name: &str, value: &str) -> bool {
        self.attribute(node, name).as_deref() == Some(value)
    }

    /// Silent attribute write.
    fn set_attribute(&mut self, node: ContentId, name: &str, value: &str);

    /// Silent attribute removal.
    fn remove_attribute(&mut self, node: ContentId, name: &str);

    /// Parent element.
    fn parent(&self, node: ContentId) -> Option<ContentId>;

    /// Child elements in document order.
    fn children(&self, node: ContentId) -> Vec<ContentId>;

    /// Lookup by `id` attribute.
    fn element_by_id(&self, id: &str) -> Option<ContentId>;

    /// Whether the class list of `node` contains `class`.
    fn has_class(&self, node: ContentId, class: &str) -> bool {
        self.attribute(node, attr::CLASS)
            .map(|list| list.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Computed style property, e.g. `list-style-image`.
    fn computed_style(&self, node: ContentId, property: &str) -> Option<String>;

    /// Whether `node` is still connected to the document.
    fn is_in_document(&self, node: ContentId) -> bool;

    /// Dispatch a trusted event at `target`. Returns `false` if a listener
    /// prevented the default action.
    fn dispatch_event(&mut self, target: ContentId, event: &DomEvent) -> bool;

    /// Drain mutations performed by host code since the last call.
    fn take_mutations(&mut self) -> Vec<Mutation>;
}

/// `true` if `node` is hidden or collapsed.
pub fn is_hidden<D: Document + ?Sized>(doc: &D, node: ContentId) -> bool {
    doc.attribute_is(node, attr::HIDDEN, "true") || doc.attribute_is(node, attr::COLLAPSED, "true")
}

/// `true` if `ancestor` is a strict ancestor of `node`.
pub fn is_ancestor<D: Document + ?Sized>(doc: &D, ancestor: ContentId, node: ContentId) -> bool {
    let mut current = doc.parent(node);
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = doc.parent(parent);
    }
    false
}
