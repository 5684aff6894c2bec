// SPDX-License-Identifier: LGPL-3.0-only
//! Command items and separators.

use super::MenuTree;
use crate::content::{attr, tag, ContentId, Document, DomEventKind};
use crate::export::{prop, ExportSink, PropertyValue, TOGGLE_CHECKMARK, TOGGLE_RADIO};
use crate::node::{Node, NodeId};

/// Shortcut chord for a `<key>` element: modifier names followed by the key
/// name, as dbusmenu expects them.
pub fn shortcut_for_key<D: Document + ?Sized>(doc: &D, key: ContentId) -> Option<Vec<String>> {
    let name = match doc.attribute(key, attr::KEY).filter(|k| !k.is_empty()) {
        Some(key) => key.to_uppercase(),
        None => key_code_name(&doc.attribute(key, attr::KEYCODE)?)?,
    };

    let mut chord: Vec<String> = Vec::new();
    for modifier in doc
        .attribute(key, attr::MODIFIERS)
        .unwrap_or_default()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|m| !m.is_empty())
    {
        let mapped = match modifier {
            "accel" | "control" => "Control",
            "shift" => "Shift",
            "alt" => "Alt",
            "meta" | "os" => "Super",
            other => {
                log::debug!("Ignoring unknown key modifier '{other}'");
                continue;
            },
        };
        if !chord.iter().any(|m| m == mapped) {
            chord.push(mapped.to_string());
        }
    }
    chord.push(name);
    Some(chord)
}

fn key_code_name(code: &str) -> Option<String> {
    let name = code.strip_prefix("VK_").unwrap_or(code);
    let mapped = match name {
        "" => return None,
        "BACK" => "BackSpace",
        "RETURN" | "ENTER" => "Return",
        "TAB" => "Tab",
        "ESCAPE" => "Escape",
        "DELETE" => "Delete",
        "INSERT" => "Insert",
        "HOME" => "Home",
        "END" => "End",
        "PAGE_UP" => "Page_Up",
        "PAGE_DOWN" => "Page_Down",
        "UP" => "Up",
        "DOWN" => "Down",
        "LEFT" => "Left",
        "RIGHT" => "Right",
        "SPACE" => "space",
        "ADD" => "plus",
        "SUBTRACT" => "minus",
        name if name.starts_with('F') && name[1..].parse::<u8>().is_ok() => name,
        name => {
            let mut chars = name.chars();
            let first = chars.next()?;
            return Some(first.to_string() + &chars.as_str().to_lowercase());
        },
    };
    Some(mapped.to_string())
}

impl<D: Document, E: ExportSink> MenuTree<D, E> {
    pub(crate) fn refresh_item(&mut self, id: NodeId) {
        self.update_class_info(id);
        let command = self.resolve_command(id);
        self.sync_label(id, command);
        self.sync_sensitivity(id, command);
        self.sync_visibility(id);
        self.sync_icon(id);
        self.sync_type_and_state(id);
        self.sync_accel(id);
    }

    /// Track the element named by `command`, moving the router
    /// registration when it changes.
    fn resolve_command(&mut self, id: NodeId) -> Option<ContentId> {
        let content = self.content(id)?;
        let wanted = self
            .doc
            .attribute(content, attr::COMMAND)
            .and_then(|name| self.doc.element_by_id(&name))
            .filter(|command| *command != content);
        let current = self.nodes.get(&id)?.item_data()?.command;
        if current == wanted {
            return wanted;
        }
        if let Some(old) = current {
            if let Err(err) = self.router.unregister(old, id) {
                log::warn!("Item {id:?}: {err}");
            }
        }
        let mut tracked = None;
        if let Some(new) = wanted {
            match self.router.register(new, id) {
                Ok(()) => tracked = Some(new),
                Err(err) => log::warn!("Item {id:?}: cannot watch command: {err}"),
            }
        }
        if let Some(data) = self.nodes.get_mut(&id).and_then(Node::item_data_mut) {
            data.command = tracked;
        }
        wanted
    }

    fn sync_type_and_state(&mut self, id: NodeId) {
        let Some(content) = self.content(id) else {
            return;
        };
        let kind = self.doc.attribute(content, attr::TYPE);
        let checkbox = kind.as_deref() == Some("checkbox");
        let radio = kind.as_deref() == Some("radio");
        let active = self.doc.attribute_is(content, attr::CHECKED, "true");
        if let Some(node) = self.nodes.get_mut(&id) {
            node.state.is_checkbox = checkbox;
            node.state.is_radio = radio;
            node.state.toggle_active = (checkbox || radio) && active;
        }

        if checkbox || radio {
            let toggle = if checkbox { TOGGLE_CHECKMARK } else { TOGGLE_RADIO };
            self.set_property(id, prop::TOGGLE_TYPE, toggle.into());
            self.set_property(id, prop::TOGGLE_STATE, i32::from(active).into());
        } else {
            self.remove_property(id, prop::TOGGLE_TYPE);
            self.remove_property(id, prop::TOGGLE_STATE);
        }
    }

    fn sync_accel(&mut self, id: NodeId) {
        let Some(content) = self.content(id) else {
            return;
        };
        let chord = self
            .doc
            .attribute(content, attr::KEY)
            .and_then(|name| self.doc.element_by_id(&name))
            .and_then(|key| shortcut_for_key(&self.doc, key));
        match chord {
            Some(chord) => self.set_property(id, prop::SHORTCUT, PropertyValue::Shortcut(vec![chord])),
            None => self.remove_property(id, prop::SHORTCUT),
        }
    }

    pub(crate) fn item_attribute_changed(&mut self, id: NodeId, content: ContentId, attribute: &str) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.state.events_blocked() {
            return;
        }
        let own = node.content;
        let command = node.item_data().and_then(|data| data.command);
        if content != own && Some(content) != command {
            super::protocol_violation(id, "attribute change for foreign content");
            return;
        }
        if node.state.dirty {
            return;
        }
        if !node.state.on_screen {
            self.invalidate(id);
            return;
        }

        if content != own {
            match attribute {
                attr::LABEL | attr::ACCESSKEY => self.sync_label(id, command),
                attr::DISABLED => self.sync_sensitivity(id, command),
                _ => {},
            }
            return;
        }

        match attribute {
            attr::LABEL | attr::ACCESSKEY => self.sync_label(id, command),
            attr::DISABLED => self.sync_sensitivity(id, command),
            attr::HIDDEN | attr::COLLAPSED => self.sync_visibility(id),
            attr::IMAGE => self.sync_icon(id),
            attr::CLASS => {
                self.update_class_info(id);
                self.sync_visibility(id);
                self.sync_icon(id);
            },
            attr::TYPE | attr::CHECKED => self.sync_type_and_state(id),
            attr::KEY => self.sync_accel(id),
            attr::COMMAND => self.refresh(id),
            _ => {},
        }
    }

    pub(crate) fn separator_attribute_changed(&mut self, id: NodeId, content: ContentId, attribute: &str) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if content != node.content {
            super::protocol_violation(id, "attribute change for foreign content");
            return;
        }
        if node.state.events_blocked() || node.state.dirty {
            return;
        }
        if !node.state.on_screen {
            self.invalidate(id);
            return;
        }
        match attribute {
            attr::HIDDEN | attr::COLLAPSED => self.sync_visibility(id),
            attr::CLASS => {
                self.update_class_info(id);
                self.sync_visibility(id);
            },
            _ => {},
        }
    }

    /// The user clicked item `id`: toggle checkbox/radio state, then send
    /// `command` at the item.
    pub(crate) fn activate_item(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let content = node.content;
        let (checkbox, radio) = (node.state.is_checkbox, node.state.is_radio);

        if !self.doc.attribute_is(content, attr::AUTOCHECK, "false") {
            if checkbox {
                let checked = self.doc.attribute_is(content, attr::CHECKED, "true");
                self.write_attribute(content, attr::CHECKED, (!checked).then_some("true"));
            } else if radio {
                self.write_attribute(content, attr::CHECKED, Some("true"));
                for sibling in self.radio_siblings(content) {
                    self.write_attribute(sibling, attr::CHECKED, None);
                }
            }
        }

        self.fire(content, DomEventKind::Command);
    }

    fn radio_siblings(&self, content: ContentId) -> Vec<ContentId> {
        let Some(parent) = self.doc.parent(content) else {
            return Vec::new();
        };
        let group = self.doc.attribute(content, attr::NAME);
        self.doc
            .children(parent)
            .into_iter()
            .filter(|sibling| *sibling != content)
            .filter(|sibling| self.doc.tag(*sibling).as_deref() == Some(tag::MENUITEM))
            .filter(|sibling| self.doc.attribute_is(*sibling, attr::TYPE, "radio"))
            .filter(|sibling| self.doc.attribute(*sibling, attr::NAME) == group)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryDocument;

    fn key(doc: &mut MemoryDocument, attrs: &[(&str, &str)]) -> ContentId {
        let root = doc.root();
        let key = doc.append_new(root, "key");
        for (name, value) in attrs {
            doc.set_attr(key, name, value);
        }
        key
    }

    #[test]
    fn test_shortcut_for_char_key() {
        let mut doc = MemoryDocument::new();
        let k = key(&mut doc, &[("key", "s"), ("modifiers", "accel,shift")]);
        assert_eq!(
            shortcut_for_key(&doc, k),
            Some(vec!["Control".to_string(), "Shift".to_string(), "S".to_string()])
        );
    }

    #[test]
    fn test_shortcut_for_key_code() {
        let mut doc = MemoryDocument::new();
        let k = key(&mut doc, &[("keycode", "VK_F5")]);
        assert_eq!(shortcut_for_key(&doc, k), Some(vec!["F5".to_string()]));

        let k = key(&mut doc, &[("keycode", "VK_PAGE_DOWN"), ("modifiers", "alt")]);
        assert_eq!(
            shortcut_for_key(&doc, k),
            Some(vec!["Alt".to_string(), "Page_Down".to_string()])
        );
    }

    #[test]
    fn test_shortcut_needs_a_key() {
        let mut doc = MemoryDocument::new();
        let k = key(&mut doc, &[("modifiers", "accel")]);
        assert_eq!(shortcut_for_key(&doc, k), None);
    }
}
