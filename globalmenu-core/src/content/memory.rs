// SPDX-License-Identifier: LGPL-3.0-only
//! A self-contained content tree for hosts without a DOM of their own.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::{attr, ContentId, Document, DomEvent, DomEventKind, Mutation};

type Listener = Box<dyn FnMut(&mut MemoryDocument, ContentId)>;

struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
    style: HashMap<String, String>,
    parent: Option<ContentId>,
    children: Vec<ContentId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            style: HashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// In-memory content tree.
///
/// Host-side edits (`append_child`, `set_attr`, ...) are queued as
/// [Mutation]s and handed to the engine through [Document::take_mutations].
/// Writes made through the [Document] trait are silent.
pub struct MemoryDocument {
    next_id: u64,
    root: ContentId,
    elements: HashMap<ContentId, Element>,
    pending: Vec<Mutation>,
    dispatched: Vec<(ContentId, DomEventKind)>,
    listeners: Vec<(DomEventKind, ContentId, Listener)>,
}

impl MemoryDocument {
    /// Create a document with a single `window` root element.
    pub fn new() -> Self {
        let root = ContentId(1);
        let mut elements = HashMap::new();
        elements.insert(root, Element::new("window"));
        Self {
            next_id: 2,
            root,
            elements,
            pending: Vec::new(),
            dispatched: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// The document root.
    pub fn root(&self) -> ContentId {
        self.root
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> ContentId {
        let id = ContentId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, Element::new(tag));
        id
    }

    /// Create an element and append it to `parent`.
    pub fn append_new(&mut self, parent: ContentId, tag: &str) -> ContentId {
        let child = self.create_element(tag);
        self.append_child(parent, child);
        child
    }

    /// Append `child` to `parent`.
    pub fn append_child(&mut self, parent: ContentId, child: ContentId) {
        let index = self.child_count(parent);
        self.insert_child(parent, child, index);
    }

    /// Insert `child` into `parent` at `index`.
    pub fn insert_child(&mut self, parent: ContentId, child: ContentId, index: usize) {
        self.detach(child);
        let Some(element) = self.elements.get_mut(&parent) else {
            return;
        };
        let index = index.min(element.children.len());
        element.children.insert(index, child);
        if let Some(child_element) = self.elements.get_mut(&child) {
            child_element.parent = Some(parent);
        }
        self.pending.push(Mutation::ChildInserted {
            container: parent,
            child,
            index,
        });
    }

    /// Append several children, reported as one bulk notification.
    pub fn append_children(&mut self, parent: ContentId, children: &[ContentId]) {
        let first_index = self.child_count(parent);
        for &child in children {
            self.detach(child);
            if let Some(element) = self.elements.get_mut(&parent) {
                element.children.push(child);
            }
            if let Some(child_element) = self.elements.get_mut(&child) {
                child_element.parent = Some(parent);
            }
        }
        if !children.is_empty() {
            self.pending.push(Mutation::ChildrenAppended {
                container: parent,
                first_index,
            });
        }
    }

    /// Remove `child` from its parent.
    pub fn remove_child(&mut self, parent: ContentId, child: ContentId) {
        let Some(element) = self.elements.get_mut(&parent) else {
            return;
        };
        let Some(index) = element.children.iter().position(|c| *c == child) else {
            return;
        };
        element.children.remove(index);
        if let Some(child_element) = self.elements.get_mut(&child) {
            child_element.parent = None;
        }
        self.pending.push(Mutation::ChildRemoved {
            container: parent,
            child,
            index,
        });
    }

    /// Remove every child of `parent`, one notification each.
    pub fn remove_all_children(&mut self, parent: ContentId) {
        for child in self.children(parent) {
            self.remove_child(parent, child);
        }
    }

    /// Set an attribute and queue a notification.
    pub fn set_attr(&mut self, node: ContentId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.attributes.insert(name.to_string(), value.to_string());
            self.pending.push(Mutation::AttributeChanged {
                node,
                attribute: name.to_string(),
            });
        }
    }

    /// Remove an attribute and queue a notification.
    pub fn remove_attr(&mut self, node: ContentId, name: &str) {
        if let Some(element) = self.elements.get_mut(&node) {
            if element.attributes.shift_remove(name).is_some() {
                self.pending.push(Mutation::AttributeChanged {
                    node,
                    attribute: name.to_string(),
                });
            }
        }
    }

    /// Set a computed style value. Style changes are not observed.
    pub fn set_style(&mut self, node: ContentId, property: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.style.insert(property.to_string(), value.to_string());
        }
    }

    /// Run `listener` whenever `kind` is dispatched at `target`.
    pub fn add_listener<F>(&mut self, kind: DomEventKind, target: ContentId, listener: F)
    where
        F: FnMut(&mut MemoryDocument, ContentId) + 'static,
    {
        self.listeners.push((kind, target, Box::new(listener)));
    }

    /// Events dispatched so far, in order.
    pub fn dispatched(&self) -> &[(ContentId, DomEventKind)] {
        &self.dispatched
    }

    /// Forget recorded events.
    pub fn clear_dispatched(&mut self) {
        self.dispatched.clear();
    }

    /// Number of queued host mutations.
    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    fn child_count(&self, parent: ContentId) -> usize {
        self.elements.get(&parent).map(|e| e.children.len()).unwrap_or(0)
    }

    fn detach(&mut self, child: ContentId) {
        let Some(parent) = self.elements.get(&child).and_then(|e| e.parent) else {
            return;
        };
        self.remove_child(parent, child);
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn tag(&self, node: ContentId) -> Option<String> {
        self.elements.get(&node).map(|e| e.tag.clone())
    }

    fn attribute(&self, node: ContentId, name: &str) -> Option<String> {
        self.elements.get(&node)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: ContentId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: ContentId, name: &str) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.attributes.shift_remove(name);
        }
    }

    fn parent(&self, node: ContentId) -> Option<ContentId> {
        self.elements.get(&node)?.parent
    }

    fn children(&self, node: ContentId) -> Vec<ContentId> {
        self.elements
            .get(&node)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    fn element_by_id(&self, id: &str) -> Option<ContentId> {
        let mut found: Vec<ContentId> = self
            .elements
            .iter()
            .filter(|(_, e)| e.attributes.get(attr::ID).map(String::as_str) == Some(id))
            .map(|(node, _)| *node)
            .filter(|node| self.is_in_document(*node))
            .collect();
        found.sort();
        found.first().copied()
    }

    fn computed_style(&self, node: ContentId, property: &str) -> Option<String> {
        self.elements.get(&node)?.style.get(property).cloned()
    }

    fn is_in_document(&self, node: ContentId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.elements.get(&id).and_then(|e| e.parent);
        }
        false
    }

    fn dispatch_event(&mut self, target: ContentId, event: &DomEvent) -> bool {
        self.dispatched.push((target, event.kind));
        let mut listeners = std::mem::take(&mut self.listeners);
        for (kind, listener_target, listener) in listeners.iter_mut() {
            if *kind == event.kind && *listener_target == target {
                listener(self, target);
            }
        }
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
        true
    }

    fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.pending)
    }
}
