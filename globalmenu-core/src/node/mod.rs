// SPDX-License-Identifier: LGPL-3.0-only
//! Proxy node definitions.

mod state;

pub use state::{Guard, NodeState};

use crate::broker::WindowId;
use crate::content::{tag, ContentId};
use crate::export::{prop, ItemId, ServerId};
use crate::keys::Modifiers;
use crate::recycle::RecycleList;
use crate::scheduler::TaskId;

/// Handle to a proxy node. Never reused within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// Kind discriminant of a proxy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of one window's menu.
    Bar,
    /// Submenu.
    Menu,
    /// Command item.
    Item,
    /// Separator.
    Separator,
    /// Inert placeholder for content that is not menu-like.
    Dummy,
}

const MENU_PROPERTIES: &[&str] = &[
    prop::LABEL,
    prop::ENABLED,
    prop::VISIBLE,
    prop::ICON_DATA,
    prop::CHILDREN_DISPLAY,
];

const ITEM_PROPERTIES: &[&str] = &[
    prop::LABEL,
    prop::ENABLED,
    prop::VISIBLE,
    prop::ICON_DATA,
    prop::SHORTCUT,
    prop::TOGGLE_TYPE,
    prop::TOGGLE_STATE,
];

const SEPARATOR_PROPERTIES: &[&str] = &[prop::TYPE, prop::VISIBLE];

const DUMMY_PROPERTIES: &[&str] = &[prop::VISIBLE];

impl NodeKind {
    /// Kind of proxy created for an element with `tag`.
    pub fn for_tag(tag: Option<&str>) -> NodeKind {
        match tag {
            Some(tag::MENU) => NodeKind::Menu,
            Some(tag::MENUITEM) => NodeKind::Item,
            Some(tag::MENUSEPARATOR) => NodeKind::Separator,
            _ => NodeKind::Dummy,
        }
    }

    /// Whether the node owns children.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Bar | NodeKind::Menu)
    }

    /// Whether the node shows an icon.
    pub fn has_icon(self) -> bool {
        matches!(self, NodeKind::Menu | NodeKind::Item)
    }

    /// Properties a recycled item keeps when re-skinned to this kind.
    pub fn managed_properties(self) -> &'static [&'static str] {
        match self {
            NodeKind::Bar => &[prop::CHILDREN_DISPLAY],
            NodeKind::Menu => MENU_PROPERTIES,
            NodeKind::Item => ITEM_PROPERTIES,
            NodeKind::Separator => SEPARATOR_PROPERTIES,
            NodeKind::Dummy => DUMMY_PROPERTIES,
        }
    }
}

/// Registration handshake state of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    /// No request outstanding and not registered.
    #[default]
    Unregistered,
    /// Waiting for the shell.
    Pending,
    /// The shell accepted the window.
    Registered,
}

#[derive(Debug)]
pub(crate) struct HiddenElement {
    pub content: ContentId,
    pub previous: Option<String>,
}

#[derive(Debug)]
pub(crate) struct BarData {
    pub window: WindowId,
    pub server: ServerId,
    pub path: String,
    pub children: Vec<NodeId>,
    pub access_key: u32,
    pub access_mask: Modifiers,
    pub opened_by_keyboard: bool,
    pub registration: RegistrationState,
    pub hidden: Option<HiddenElement>,
}

#[derive(Debug, Default)]
pub(crate) struct MenuData {
    pub children: Vec<NodeId>,
    pub popup: Option<ContentId>,
    pub recycle: Option<RecycleList>,
    pub flush_task: Option<TaskId>,
}

#[derive(Debug, Default)]
pub(crate) struct ItemData {
    pub command: Option<ContentId>,
}

#[derive(Debug)]
pub(crate) enum Payload {
    Bar(Box<BarData>),
    Menu(MenuData),
    Item(ItemData),
    Leaf,
}

#[derive(Debug, Default)]
pub(crate) struct IconRequest {
    pub serial: u64,
    pub task: Option<TaskId>,
}

/// One proxy node.
#[derive(Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub content: ContentId,
    pub item: ItemId,
    pub parent: Option<NodeId>,
    pub bar: Option<NodeId>,
    pub state: NodeState,
    pub icon: IconRequest,
    pub payload: Payload,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        match &self.payload {
            Payload::Bar(bar) => &bar.children,
            Payload::Menu(menu) => &menu.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.payload {
            Payload::Bar(bar) => Some(&mut bar.children),
            Payload::Menu(menu) => Some(&mut menu.children),
            _ => None,
        }
    }

    pub fn menu(&self) -> Option<&MenuData> {
        match &self.payload {
            Payload::Menu(menu) => Some(menu),
            _ => None,
        }
    }

    pub fn menu_mut(&mut self) -> Option<&mut MenuData> {
        match &mut self.payload {
            Payload::Menu(menu) => Some(menu),
            _ => None,
        }
    }

    pub fn bar(&self) -> Option<&BarData> {
        match &self.payload {
            Payload::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    pub fn bar_mut(&mut self) -> Option<&mut BarData> {
        match &mut self.payload {
            Payload::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    pub fn item_data(&self) -> Option<&ItemData> {
        match &self.payload {
            Payload::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn item_data_mut(&mut self) -> Option<&mut ItemData> {
        match &mut self.payload {
            Payload::Item(item) => Some(item),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_tag() {
        assert_eq!(NodeKind::for_tag(Some("menu")), NodeKind::Menu);
        assert_eq!(NodeKind::for_tag(Some("menuitem")), NodeKind::Item);
        assert_eq!(NodeKind::for_tag(Some("menuseparator")), NodeKind::Separator);
        assert_eq!(NodeKind::for_tag(Some("toolbarbutton")), NodeKind::Dummy);
        assert_eq!(NodeKind::for_tag(None), NodeKind::Dummy);
    }
}
