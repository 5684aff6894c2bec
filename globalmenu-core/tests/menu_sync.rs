// SPDX-License-Identifier: LGPL-3.0-only
//! Tests for building and synchronizing exported menus

mod support;

use globalmenu_core::content::DomEventKind;
use globalmenu_core::notify::Notification;
use globalmenu_core::{Document, ExportSink, PropertyValue};
use support::{Fixture, WINDOW};

#[test]
fn test_bar_exports_top_level_menus() {
    let fx = Fixture::new();
    let export = fx.export();
    let server = export.server(fx.server()).expect("server");

    assert_eq!(server.path, "/com/canonical/menu/3A00005");
    let root = server.root.expect("root item");
    assert_eq!(
        export.property(root, "children-display"),
        Some(PropertyValue::from("menubar"))
    );
    assert_eq!(
        fx.exported_labels(fx.ids.menubar),
        vec![
            Some("_File".to_string()),
            Some("_Edit".to_string()),
            Some("_View".to_string()),
            Some("Hi_story".to_string()),
        ]
    );
    assert_eq!(fx.prop(fx.ids.file, "children-display"), Some(PropertyValue::from("submenu")));
    assert!(fx.state(fx.ids.file).is_on_screen());
}

#[test]
fn test_menus_are_built_lazily() {
    let mut fx = Fixture::new();
    assert!(fx.state(fx.ids.file).needs_rebuild());
    assert_eq!(fx.exported_len(fx.ids.file), 0);

    fx.open(fx.ids.file);

    assert!(!fx.state(fx.ids.file).needs_rebuild());
    assert_eq!(fx.exported_len(fx.ids.file), 4);
    assert_eq!(
        fx.exported_labels(fx.ids.file),
        vec![
            Some("_New Window".to_string()),
            None,
            Some("Close Window".to_string()),
            Some("_Quit".to_string()),
        ]
    );
    assert_eq!(fx.prop(fx.ids.file_sep, "type"), Some(PropertyValue::from("separator")));
}

#[test]
fn test_first_about_to_show_is_absorbed_before_registration() {
    let mut fx = Fixture::new();
    let item = fx.item(fx.ids.edit);

    assert!(!fx.service.about_to_show(item));
    assert!(fx.state(fx.ids.edit).is_ready());
    assert!(!fx.state(fx.ids.edit).is_open_or_opening());
    assert_eq!(fx.exported_len(fx.ids.edit), 0);

    fx.service.about_to_show(item);
    assert!(fx.state(fx.ids.edit).is_open_or_opening());
    assert_eq!(fx.exported_len(fx.ids.edit), 1);
}

#[test]
fn test_open_synthesizes_events_and_notifies() {
    let mut fx = Fixture::new();
    let notifications = fx.service.subscribe();
    fx.doc().clear_dispatched();

    fx.open(fx.ids.file);

    assert_eq!(fx.document().attribute(fx.ids.file, "open").as_deref(), Some("true"));
    assert_eq!(fx.document().attribute(fx.ids.file, "_moz-menuactive").as_deref(), Some("true"));
    assert_eq!(
        fx.document().dispatched(),
        &[
            (fx.ids.file, DomEventKind::MenuItemActive),
            (fx.ids.file_popup, DomEventKind::PopupShowing),
            (fx.ids.file_popup, DomEventKind::PopupShown),
        ]
    );
    assert_eq!(
        notifications.try_recv(),
        Ok(Notification::PopupOpen(Some("menu_FilePopup".to_string())))
    );

    fx.doc().clear_dispatched();
    fx.close(fx.ids.file);

    assert_eq!(fx.document().attribute(fx.ids.file, "open"), None);
    assert_eq!(fx.document().attribute(fx.ids.file, "_moz-menuactive"), None);
    assert_eq!(
        fx.document().dispatched(),
        &[
            (fx.ids.file_popup, DomEventKind::PopupHiding),
            (fx.ids.file_popup, DomEventKind::PopupHidden),
            (fx.ids.file, DomEventKind::MenuItemInactive),
        ]
    );
    assert!(!fx.state(fx.ids.file).is_open_or_opening());
    assert!(!fx.state(fx.ids.new).is_on_screen());
}

#[test]
fn test_on_screen_changes_apply_immediately() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);

    let new = fx.ids.new;
    fx.doc().set_attr(new, "label", "New Private Window");
    fx.doc().set_attr(new, "disabled", "true");
    fx.sync();

    assert_eq!(fx.label(new).as_deref(), Some("_New Private Window"));
    assert_eq!(fx.prop(new, "enabled"), Some(PropertyValue::Bool(false)));
    assert!(!fx.state(new).is_dirty());
}

#[test]
fn test_off_screen_changes_are_deferred() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);
    fx.close(fx.ids.file);

    let new = fx.ids.new;
    fx.doc().set_attr(new, "label", "Newer Window");
    fx.doc().set_attr(new, "hidden", "true");
    fx.sync();

    assert!(fx.state(new).is_dirty());
    assert_eq!(fx.label(new).as_deref(), Some("_New Window"));
    assert_eq!(fx.visible(new), Some(true));

    fx.open(fx.ids.file);

    assert!(!fx.state(new).is_dirty());
    assert_eq!(fx.label(new).as_deref(), Some("_Newer Window"));
    assert_eq!(fx.visible(new), Some(false));
}

#[test]
fn test_invalidate_resyncs_from_content() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);

    let quit = fx.ids.quit;
    let node = fx.node(quit);
    // silent writes, the engine only finds out through invalidation
    fx.doc().set_attribute(quit, "label", "Exit");
    fx.doc().set_attribute(quit, "accesskey", "x");
    assert_eq!(fx.label(quit).as_deref(), Some("_Quit"));

    fx.service.tree_mut().invalidate(node);
    assert_eq!(fx.label(quit).as_deref(), Some("E_xit"));
}

#[test]
fn test_closed_structure_change_forces_rebuild() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.edit);
    fx.close(fx.ids.edit);

    let popup = fx.document().children(fx.ids.edit)[0];
    let redo = fx.doc().create_element("menuitem");
    fx.doc().set_attribute(redo, "label", "Redo");
    fx.doc().append_child(popup, redo);
    fx.sync();

    assert!(fx.state(fx.ids.edit).needs_rebuild());
    assert_eq!(fx.exported_len(fx.ids.edit), 1);

    fx.open(fx.ids.edit);
    assert_eq!(fx.exported_len(fx.ids.edit), fx.content_len(popup));
    assert_eq!(
        fx.exported_labels(fx.ids.edit),
        vec![Some("_Undo".to_string()), Some("Redo".to_string())]
    );
}

#[test]
fn test_open_structure_change_is_incremental() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.edit);
    let created = fx.export().stats().created;

    let popup = fx.document().children(fx.ids.edit)[0];
    let cut = fx.doc().create_element("menuitem");
    fx.doc().set_attribute(cut, "label", "Cut");
    fx.doc().insert_child(popup, cut, 0);
    fx.sync();

    assert!(!fx.state(fx.ids.edit).needs_rebuild());
    assert_eq!(fx.export().stats().created, created + 1);
    assert_eq!(
        fx.exported_labels(fx.ids.edit),
        vec![Some("Cut".to_string()), Some("_Undo".to_string())]
    );
    assert!(fx.state(cut).is_on_screen());
}

#[test]
fn test_command_attributes_are_reflected() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);
    let close = fx.ids.close;

    assert_eq!(fx.document().attribute(close, "label").as_deref(), Some("Close Window"));
    assert_eq!(fx.document().attribute(close, "disabled").as_deref(), Some("true"));
    assert_eq!(fx.prop(close, "enabled"), Some(PropertyValue::Bool(false)));

    let cmd = fx.ids.cmd_close;
    fx.doc().remove_attr(cmd, "disabled");
    fx.doc().set_attr(cmd, "label", "Close Tab");
    fx.sync();

    assert_eq!(fx.document().attribute(close, "disabled"), None);
    assert_eq!(fx.prop(close, "enabled"), Some(PropertyValue::Bool(true)));
    assert_eq!(fx.document().attribute(close, "label").as_deref(), Some("Close Tab"));
    assert_eq!(fx.label(close).as_deref(), Some("Close Tab"));

    fx.doc().set_attr(cmd, "accesskey", "T");
    fx.sync();
    assert_eq!(fx.document().attribute(close, "accesskey").as_deref(), Some("T"));
    assert_eq!(fx.label(close).as_deref(), Some("Close _Tab"));
    assert!(!fx.state(close).events_blocked());
}

#[test]
fn test_shortcut_comes_from_key_element() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);
    assert_eq!(
        fx.prop(fx.ids.quit, "shortcut"),
        Some(PropertyValue::Shortcut(vec![vec!["Control".to_string(), "Q".to_string()]]))
    );
    assert_eq!(fx.prop(fx.ids.new, "shortcut"), None);
}

#[test]
fn test_checkbox_click_toggles_and_fires_command() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.view);
    let toggle = fx.ids.toggle;

    assert_eq!(fx.prop(toggle, "toggle-type"), Some(PropertyValue::from("checkmark")));
    assert_eq!(fx.prop(toggle, "toggle-state"), Some(PropertyValue::Int(1)));

    fx.doc().clear_dispatched();
    fx.click(toggle);

    assert_eq!(fx.document().attribute(toggle, "checked"), None);
    assert_eq!(fx.prop(toggle, "toggle-state"), Some(PropertyValue::Int(0)));
    assert!(!fx.state(toggle).is_toggle_active());
    assert_eq!(fx.document().dispatched(), &[(toggle, DomEventKind::Command)]);
}

#[test]
fn test_radio_click_unchecks_group() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.view);
    let (small, large) = (fx.ids.zoom_small, fx.ids.zoom_large);

    assert_eq!(fx.prop(large, "toggle-type"), Some(PropertyValue::from("radio")));
    fx.click(large);

    assert_eq!(fx.document().attribute(large, "checked").as_deref(), Some("true"));
    assert_eq!(fx.document().attribute(small, "checked"), None);
    assert_eq!(fx.prop(large, "toggle-state"), Some(PropertyValue::Int(1)));
    assert_eq!(fx.prop(small, "toggle-state"), Some(PropertyValue::Int(0)));
}

#[test]
fn test_autocheck_false_leaves_state_alone() {
    let mut fx = Fixture::new();
    let toggle = fx.ids.toggle;
    fx.doc().set_attribute(toggle, "autocheck", "false");
    fx.open(fx.ids.view);

    fx.click(toggle);
    assert_eq!(fx.document().attribute(toggle, "checked").as_deref(), Some("true"));
}

#[test]
fn test_keyboard_only_items_hidden_for_mouse_opens() {
    let mut fx = Fixture::new();
    fx.service.focus(WINDOW);
    fx.open(fx.ids.view);

    assert!(fx.state(fx.ids.keyboard_only).is_content_visible());
    assert_eq!(fx.visible(fx.ids.keyboard_only), Some(false));
    assert_eq!(fx.visible(fx.ids.toggle), Some(true));
}

#[test]
fn test_separator_follows_hidden() {
    let mut fx = Fixture::new();
    fx.open(fx.ids.file);
    let sep = fx.ids.file_sep;

    fx.doc().set_attr(sep, "collapsed", "true");
    fx.sync();
    assert_eq!(fx.visible(sep), Some(false));

    fx.doc().remove_attr(sep, "collapsed");
    fx.sync();
    assert_eq!(fx.visible(sep), Some(true));
}

#[test]
fn test_listener_mutations_are_routed() {
    let mut fx = Fixture::new();
    let popup = fx.ids.file_popup;
    let new = fx.ids.new;
    fx.doc().add_listener(DomEventKind::PopupShowing, popup, move |doc, _| {
        doc.set_attr(new, "label", "New Tab");
    });

    fx.open(fx.ids.file);
    assert_eq!(fx.label(new).as_deref(), Some("_New Tab"));
}
