// SPDX-License-Identifier: LGPL-3.0-only
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;

use globalmenu_core::broker::{RequestId, ShellError};
use globalmenu_core::export::ServerId;
use globalmenu_core::icon::{IconError, IconSource};
use globalmenu_core::node::NodeState;
use globalmenu_core::{
    ContentId, Document, ExportSink, ExportTree, ItemId, MemoryDocument, MenuService, NodeId, PropertyValue,
    Services, ShellEvent, ShellTransport, WindowId,
};
use tokio_util::sync::CancellationToken;

pub const WINDOW: WindowId = WindowId(0x3a00005);

/// Shell transport that records calls and replies on demand.
#[derive(Default)]
pub struct FakeShell {
    pub calls: Vec<(RequestId, WindowId, String, CancellationToken)>,
    pub unregistered: Vec<WindowId>,
    pub events: Vec<ShellEvent>,
}

impl FakeShell {
    pub fn online() -> Self {
        Self {
            events: vec![ShellEvent::Availability(true)],
            ..Self::default()
        }
    }
}

impl ShellTransport for FakeShell {
    fn register_window(&mut self, request: RequestId, window: WindowId, path: &str, token: CancellationToken) {
        self.calls.push((request, window, path.to_string(), token));
    }

    fn unregister_window(&mut self, window: WindowId) {
        self.unregistered.push(window);
    }

    fn poll_events(&mut self) -> Vec<ShellEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Icon source backed by a map, recording every fetch.
#[derive(Clone, Default)]
pub struct MapIconSource {
    pub icons: HashMap<String, Vec<u8>>,
    pub fetched: Rc<RefCell<Vec<String>>>,
}

impl MapIconSource {
    pub fn with(mut self, uri: &str, bytes: Vec<u8>) -> Self {
        self.icons.insert(uri.to_string(), bytes);
        self
    }
}

impl IconSource for MapIconSource {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, IconError> {
        self.fetched.borrow_mut().push(uri.to_string());
        self.icons
            .get(uri)
            .cloned()
            .ok_or_else(|| IconError::NotFound(uri.to_string()))
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub type Service = MenuService<MemoryDocument, ExportTree, FakeShell>;

/// Content ids of the browser-like document every test starts from.
pub struct Ids {
    pub toolbox: ContentId,
    pub toolbar: ContentId,
    pub menubar: ContentId,
    pub file: ContentId,
    pub file_popup: ContentId,
    pub new: ContentId,
    pub file_sep: ContentId,
    pub close: ContentId,
    pub quit: ContentId,
    pub edit: ContentId,
    pub undo: ContentId,
    pub view: ContentId,
    pub view_popup: ContentId,
    pub toggle: ContentId,
    pub zoom_small: ContentId,
    pub zoom_large: ContentId,
    pub keyboard_only: ContentId,
    pub history: ContentId,
    pub history_popup: ContentId,
    pub cmd_close: ContentId,
}

fn element(doc: &mut MemoryDocument, parent: ContentId, tag: &str, attrs: &[(&str, &str)]) -> ContentId {
    let node = doc.append_new(parent, tag);
    for (name, value) in attrs {
        doc.set_attr(node, name, value);
    }
    node
}

/// window > toolbox > (toolbar > menubar, toolbar#nav-bar), commandset, keyset
pub fn browser_document() -> (MemoryDocument, Ids) {
    let mut doc = MemoryDocument::new();
    let root = doc.root();

    let commands = element(&mut doc, root, "commandset", &[]);
    let cmd_close = element(
        &mut doc,
        commands,
        "command",
        &[("id", "cmd_close"), ("label", "Close Window"), ("disabled", "true")],
    );
    let keys = element(&mut doc, root, "keyset", &[]);
    element(&mut doc, keys, "key", &[("id", "key_quit"), ("key", "q"), ("modifiers", "accel")]);

    let toolbox = element(&mut doc, root, "toolbox", &[("id", "navigator-toolbox")]);
    let toolbar = element(&mut doc, toolbox, "toolbar", &[("id", "toolbar-menubar")]);
    element(&mut doc, toolbox, "toolbar", &[("id", "nav-bar")]);
    let menubar = element(&mut doc, toolbar, "menubar", &[("id", "main-menubar")]);

    let file = element(&mut doc, menubar, "menu", &[("id", "file-menu"), ("label", "File"), ("accesskey", "F")]);
    let file_popup = element(&mut doc, file, "menupopup", &[("id", "menu_FilePopup")]);
    let new = element(
        &mut doc,
        file_popup,
        "menuitem",
        &[("id", "menu_newNavigator"), ("label", "New Window"), ("accesskey", "N")],
    );
    let file_sep = element(&mut doc, file_popup, "menuseparator", &[]);
    let close = element(&mut doc, file_popup, "menuitem", &[("id", "menu_close"), ("command", "cmd_close")]);
    let quit = element(
        &mut doc,
        file_popup,
        "menuitem",
        &[("id", "menu_FileQuitItem"), ("label", "Quit"), ("accesskey", "Q"), ("key", "key_quit")],
    );

    let edit = element(&mut doc, menubar, "menu", &[("id", "edit-menu"), ("label", "Edit"), ("accesskey", "E")]);
    let edit_popup = element(&mut doc, edit, "menupopup", &[("id", "menu_EditPopup")]);
    let undo = element(&mut doc, edit_popup, "menuitem", &[("id", "menu_undo"), ("label", "Undo"), ("accesskey", "U")]);

    let view = element(&mut doc, menubar, "menu", &[("id", "view-menu"), ("label", "View"), ("accesskey", "V")]);
    let view_popup = element(&mut doc, view, "menupopup", &[("id", "menu_viewPopup")]);
    let toggle = element(
        &mut doc,
        view_popup,
        "menuitem",
        &[("label", "Status Bar"), ("type", "checkbox"), ("checked", "true")],
    );
    let zoom_small = element(
        &mut doc,
        view_popup,
        "menuitem",
        &[("label", "Small"), ("type", "radio"), ("name", "zoom"), ("checked", "true")],
    );
    let zoom_large = element(
        &mut doc,
        view_popup,
        "menuitem",
        &[("label", "Large"), ("type", "radio"), ("name", "zoom")],
    );
    let keyboard_only = element(
        &mut doc,
        view_popup,
        "menuitem",
        &[("label", "Full Screen"), ("class", "show-only-for-keyboard")],
    );

    let history = element(&mut doc, menubar, "menu", &[("id", "history-menu"), ("label", "History"), ("accesskey", "s")]);
    let history_popup = element(&mut doc, history, "menupopup", &[("id", "goPopup")]);
    element(&mut doc, history_popup, "menuitem", &[("label", "Home")]);
    element(&mut doc, history_popup, "menuseparator", &[]);
    for title in ["Example", "Rust", "Docs"] {
        element(&mut doc, history_popup, "menuitem", &[("label", title), ("class", "history-entry")]);
    }

    // fixture construction is not something the engine should see
    doc.take_mutations();

    let ids = Ids {
        toolbox,
        toolbar,
        menubar,
        file,
        file_popup,
        new,
        file_sep,
        close,
        quit,
        edit,
        undo,
        view,
        view_popup,
        toggle,
        zoom_small,
        zoom_large,
        keyboard_only,
        history,
        history_popup,
        cmd_close,
    };
    (doc, ids)
}

pub struct Fixture {
    pub service: Service,
    pub ids: Ids,
    pub bar: NodeId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_services(Services::default())
    }

    pub fn with_services(services: Services) -> Self {
        let (doc, ids) = browser_document();
        Self::with_document(doc, ids, services)
    }

    pub fn with_document(doc: MemoryDocument, ids: Ids, services: Services) -> Self {
        let mut service = MenuService::new(doc, ExportTree::new(), FakeShell::online(), services);
        service.dispatch_shell_events();
        let bar = service
            .create_menu_bar(WINDOW, ids.menubar)
            .expect("create menu bar");
        Self { service, ids, bar }
    }

    pub fn doc(&mut self) -> &mut MemoryDocument {
        self.service.document_mut()
    }

    pub fn document(&self) -> &MemoryDocument {
        self.service.document()
    }

    pub fn export(&self) -> &ExportTree {
        self.service.export()
    }

    pub fn shell(&mut self) -> &mut FakeShell {
        self.service.broker_mut().transport_mut()
    }

    pub fn server(&self) -> ServerId {
        self.export()
            .server_by_path(&WINDOW.menu_path())
            .expect("server")
    }

    /// Answer the last registration request.
    pub fn reply(&mut self, result: Result<(), ShellError>) {
        let request = self.shell().calls.last().expect("registration call").0;
        self.shell().events.push(ShellEvent::Registered { request, result });
        self.service.dispatch_shell_events();
    }

    pub fn node(&self, content: ContentId) -> NodeId {
        self.service
            .tree()
            .find_node(content)
            .expect("no proxy for content")
    }

    pub fn item(&self, content: ContentId) -> ItemId {
        let node = self.node(content);
        self.service.tree().item(node).expect("item")
    }

    pub fn state(&self, content: ContentId) -> NodeState {
        let node = self.node(content);
        self.service.tree().state(node).cloned().expect("state")
    }

    pub fn prop(&self, content: ContentId, key: &str) -> Option<PropertyValue> {
        self.export().property(self.item(content), key)
    }

    pub fn label(&self, content: ContentId) -> Option<String> {
        self.prop(content, "label")
            .and_then(|value| value.as_str().map(str::to_string))
    }

    pub fn visible(&self, content: ContentId) -> Option<bool> {
        self.prop(content, "visible").and_then(|value| value.as_bool())
    }

    /// Exported child labels of the menu for `content`.
    pub fn exported_labels(&self, content: ContentId) -> Vec<Option<String>> {
        let export = self.export();
        export
            .children(self.item(content))
            .iter()
            .map(|child| {
                export
                    .property(*child, "label")
                    .and_then(|value| value.as_str().map(str::to_string))
            })
            .collect()
    }

    pub fn exported_len(&self, content: ContentId) -> usize {
        self.export().children(self.item(content)).len()
    }

    pub fn content_len(&self, content: ContentId) -> usize {
        self.document().children(content).len()
    }

    /// Open the menu for `content` the way the shell does, absorbing the
    /// spurious first about-to-show if needed.
    pub fn open(&mut self, content: ContentId) {
        let item = self.item(content);
        self.service.about_to_show(item);
        if !self.state(content).is_open_or_opening() {
            self.service.about_to_show(item);
        }
        self.service.handle_item_event(item, "opened", 0);
    }

    pub fn close(&mut self, content: ContentId) {
        let item = self.item(content);
        self.service.handle_item_event(item, "closed", 0);
    }

    pub fn click(&mut self, content: ContentId) {
        let item = self.item(content);
        self.service.handle_item_event(item, "clicked", 0);
    }

    /// Route queued host edits.
    pub fn sync(&mut self) {
        self.service.process_mutations();
    }
}
