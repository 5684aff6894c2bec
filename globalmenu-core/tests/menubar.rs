// SPDX-License-Identifier: LGPL-3.0-only
//! Tests for menu bar lifetime, registration and keyboard handling

mod support;

use std::time::{Duration, Instant};

use globalmenu_core::broker::ShellError;
use globalmenu_core::export::Status;
use globalmenu_core::keys::{key_code, KeyEvent, KeyOutcome, Modifiers};
use globalmenu_core::node::RegistrationState;
use globalmenu_core::notify::Notification;
use globalmenu_core::{
    Document, ExportTree, MemoryDocument, MenuError, MenuService, Services, ShellEvent, WindowId,
};
use support::{browser_document, FakeShell, Fixture, WINDOW};

fn status(fx: &Fixture) -> Status {
    fx.export().server(fx.server()).expect("server").status
}

fn hidden(fx: &Fixture, content: globalmenu_core::ContentId) -> Option<String> {
    fx.document().attribute(content, "hidden")
}

#[test]
fn test_in_window_bar_is_hidden_while_exported() {
    let fx = Fixture::new();

    // the menubar toolbar has no siblings of its own, the toolbox does
    assert_eq!(fx.service.tree().hidden_element(fx.bar), Some(fx.ids.toolbar));
    assert_eq!(hidden(&fx, fx.ids.toolbar).as_deref(), Some("true"));
    assert_eq!(hidden(&fx, fx.ids.toolbox), None);
    assert_eq!(
        fx.service.tree().registration(fx.bar),
        Some(RegistrationState::Pending)
    );
}

#[test]
fn test_registration_success_keeps_bar_hidden() {
    let mut fx = Fixture::new();
    fx.reply(Ok(()));

    assert_eq!(
        fx.service.tree().registration(fx.bar),
        Some(RegistrationState::Registered)
    );
    assert!(fx.service.tree().state(fx.bar).expect("bar").is_registered());
    assert_eq!(hidden(&fx, fx.ids.toolbar).as_deref(), Some("true"));
}

#[test]
fn test_menus_added_after_registration_are_ready() {
    let mut fx = Fixture::new();
    fx.reply(Ok(()));
    // created while pending, so the first request is still absorbed
    assert!(!fx.state(fx.ids.file).is_ready());

    let menubar = fx.ids.menubar;
    let help = fx.doc().create_element("menu");
    let popup = fx.doc().append_new(help, "menupopup");
    fx.doc().append_new(popup, "menuitem");
    fx.doc().set_attribute(help, "label", "Help");
    fx.doc().append_child(menubar, help);
    fx.sync();
    assert!(fx.state(help).is_ready());

    let item = fx.item(help);
    fx.service.about_to_show(item);
    assert!(fx.state(help).is_open_or_opening());
    assert_eq!(fx.exported_len(help), 1);
}

#[test]
fn test_registration_failure_restores_exactly() {
    let (mut doc, ids) = browser_document();
    doc.set_attribute(ids.toolbar, "hidden", "false");
    let mut fx = Fixture::with_document(doc, ids, Services::default());
    assert_eq!(hidden(&fx, fx.ids.toolbar).as_deref(), Some("true"));

    fx.reply(Err(ShellError::Call("org.freedesktop.DBus.Error.ServiceUnknown".into())));

    assert_eq!(hidden(&fx, fx.ids.toolbar).as_deref(), Some("false"));
    assert_eq!(fx.service.tree().hidden_element(fx.bar), None);
    assert_eq!(
        fx.service.tree().registration(fx.bar),
        Some(RegistrationState::Unregistered)
    );
    // the export stays around for a later registration
    assert_eq!(fx.service.bar(WINDOW), Some(fx.bar));
}

#[test]
fn test_failed_bar_stays_visible_after_toolbox_change() {
    let mut fx = Fixture::new();
    fx.reply(Err(ShellError::Call("org.freedesktop.DBus.Error.ServiceUnknown".into())));
    assert_eq!(hidden(&fx, fx.ids.toolbar), None);

    let toolbox = fx.ids.toolbox;
    fx.doc().append_new(toolbox, "toolbar");
    fx.sync();
    let nav = fx.document().children(toolbox)[1];
    fx.doc().remove_child(toolbox, nav);
    fx.sync();

    assert_eq!(fx.service.tree().hidden_element(fx.bar), None);
    assert_eq!(hidden(&fx, fx.ids.toolbar), None);
    assert_eq!(hidden(&fx, toolbox), None);
}

#[test]
fn test_destroy_before_reply_drops_late_reply() {
    let mut fx = Fixture::new();
    let request = fx.shell().calls[0].0;

    fx.service.destroy_menu_bar(WINDOW).expect("destroy");

    assert!(fx.shell().calls[0].3.is_cancelled());
    assert_eq!(fx.shell().unregistered, vec![WINDOW]);
    assert_eq!(hidden(&fx, fx.ids.toolbar), None);
    assert_eq!(fx.service.bar(WINDOW), None);
    assert!(fx.export().server_by_path(&WINDOW.menu_path()).is_none());
    assert!(fx.export().is_empty());

    fx.shell().events.push(ShellEvent::Registered {
        request,
        result: Ok(()),
    });
    assert_eq!(fx.service.dispatch_shell_events(), 0);
    assert_eq!(hidden(&fx, fx.ids.toolbar), None);
    assert!(matches!(
        fx.service.destroy_menu_bar(WINDOW),
        Err(MenuError::NoMenuBar(_))
    ));
}

#[test]
fn test_going_offline_destroys_bars() {
    let mut fx = Fixture::new();
    let notifications = fx.service.subscribe();

    fx.shell().events.push(ShellEvent::Availability(false));
    fx.service.dispatch_shell_events();

    assert!(!fx.service.is_online());
    assert_eq!(fx.service.bar(WINDOW), None);
    assert!(fx.shell().calls[0].3.is_cancelled());
    assert_eq!(hidden(&fx, fx.ids.toolbar), None);
    assert_eq!(notifications.try_recv(), Ok(Notification::Offline));
    assert!(matches!(
        fx.service.create_menu_bar(WINDOW, fx.ids.menubar),
        Err(MenuError::Offline)
    ));

    fx.shell().events.push(ShellEvent::Availability(true));
    fx.service.dispatch_shell_events();
    assert_eq!(notifications.try_recv(), Ok(Notification::Online));
    fx.service
        .create_menu_bar(WINDOW, fx.ids.menubar)
        .expect("recreate");
    assert_eq!(hidden(&fx, fx.ids.toolbar).as_deref(), Some("true"));
}

#[test]
fn test_create_rejects_bad_requests() {
    let mut fx = Fixture::new();
    let menubar = fx.ids.menubar;
    assert!(matches!(
        fx.service.create_menu_bar(WINDOW, menubar),
        Err(MenuError::WindowHasMenu(_))
    ));
    assert!(matches!(
        fx.service.create_menu_bar(WindowId(0), menubar),
        Err(MenuError::InvalidWindow(_))
    ));

    let detached = fx.doc().create_element("menubar");
    assert!(matches!(
        fx.service.create_menu_bar(WindowId(0x3a00009), detached),
        Err(MenuError::MissingArgument(..))
    ));
    assert_eq!(fx.shell().calls.len(), 1);
}

#[test]
fn test_keep_in_window_class_is_honored() {
    let (mut doc, ids) = browser_document();
    doc.set_attribute(ids.menubar, "class", "menubar-keep-in-window");
    let mut service = MenuService::new(doc, ExportTree::new(), FakeShell::online(), Services::default());
    service.dispatch_shell_events();

    assert!(matches!(
        service.create_menu_bar(WINDOW, ids.menubar),
        Err(MenuError::KeepInWindow(_))
    ));
    assert!(service.export().is_empty());
    assert_eq!(service.document().attribute(ids.toolbar, "hidden"), None);
}

#[test]
fn test_offline_service_refuses_bars() {
    let (doc, ids) = browser_document();
    let mut service: MenuService<MemoryDocument, ExportTree, FakeShell> =
        MenuService::new(doc, ExportTree::new(), FakeShell::default(), Services::default());
    assert!(matches!(
        service.create_menu_bar(WINDOW, ids.menubar),
        Err(MenuError::Offline)
    ));
}

#[test]
fn test_menubar_children_track_content() {
    let mut fx = Fixture::new();
    let menubar = fx.ids.menubar;

    let help = fx.doc().create_element("menu");
    fx.doc().set_attribute(help, "label", "Help");
    fx.doc().set_attribute(help, "accesskey", "H");
    fx.doc().append_child(menubar, help);
    fx.sync();

    assert_eq!(fx.exported_len(menubar), 5);
    assert_eq!(fx.label(help).as_deref(), Some("_Help"));
    assert!(fx.state(help).is_on_screen());

    let edit = fx.ids.edit;
    fx.doc().remove_child(menubar, edit);
    fx.sync();
    assert_eq!(fx.exported_len(menubar), 4);
    assert_eq!(fx.service.tree().find_node(edit), None);
}

#[test]
fn test_toolbox_change_moves_hidden_element() {
    let mut fx = Fixture::new();
    let (toolbox, toolbar) = (fx.ids.toolbox, fx.ids.toolbar);
    let nav = fx.document().children(toolbox)[1];

    fx.doc().remove_child(toolbox, nav);
    fx.sync();

    assert_eq!(fx.service.tree().hidden_element(fx.bar), Some(toolbox));
    assert_eq!(hidden(&fx, toolbar), None);
    assert_eq!(hidden(&fx, toolbox).as_deref(), Some("true"));
}

#[test]
fn test_spring_sibling_does_not_keep_parent_visible() {
    let (mut doc, ids) = browser_document();
    doc.append_new(ids.toolbar, "toolbarspring");
    doc.take_mutations();
    let fx = Fixture::with_document(doc, ids, Services::default());
    assert_eq!(fx.service.tree().hidden_element(fx.bar), Some(fx.ids.toolbar));
}

#[test]
fn test_access_key_sets_notice_status() {
    let mut fx = Fixture::new();
    let alt = KeyEvent::new(key_code::ALT).with_modifiers(Modifiers::ALT);

    assert_eq!(fx.service.key_down(WINDOW, &alt), KeyOutcome::Ignored);
    assert_eq!(status(&fx), Status::Notice);

    fx.service.key_up(WINDOW, &KeyEvent::new(key_code::ALT));
    assert_eq!(status(&fx), Status::Normal);

    let chord = KeyEvent::new(key_code::ALT).with_modifiers(Modifiers::ALT | Modifiers::CONTROL);
    fx.service.key_down(WINDOW, &chord);
    assert_eq!(status(&fx), Status::Normal);

    fx.service.key_down(WINDOW, &alt);
    fx.service.blur(WINDOW);
    assert_eq!(status(&fx), Status::Normal);
}

#[test]
fn test_access_key_opens_matching_menu() {
    let mut fx = Fixture::new();
    let event = KeyEvent::typed('e').with_modifiers(Modifiers::ALT);

    assert!(fx.service.key_press(WINDOW, &event).is_consumed());
    assert!(fx.service.tree().opened_by_keyboard(fx.bar));
    assert!(!fx.state(fx.ids.edit).needs_rebuild());
    assert_eq!(fx.exported_len(fx.ids.edit), 1);
    assert_eq!(fx.export().stats().shown, 0);

    fx.service.run_timers(Instant::now() + Duration::from_secs(1));
    assert_eq!(fx.export().stats().shown, 1);
}

#[test]
fn test_delayed_open_is_dropped_when_menu_is_replaced() {
    let mut fx = Fixture::new();
    let event = KeyEvent::typed('e').with_modifiers(Modifiers::ALT);
    assert!(fx.service.key_press(WINDOW, &event).is_consumed());

    let (menubar, edit) = (fx.ids.menubar, fx.ids.edit);
    fx.doc().remove_child(menubar, edit);
    let tools = fx.doc().append_new(menubar, "menu");
    fx.doc().set_attribute(tools, "label", "Edit");
    fx.sync();

    fx.service.run_timers(Instant::now() + Duration::from_secs(1));
    assert_eq!(fx.export().stats().shown, 0);
}

#[test]
fn test_f10_opens_first_menu() {
    let mut fx = Fixture::new();
    let file = fx.ids.file;
    fx.doc().set_attribute(file, "disabled", "true");

    assert!(fx.service.key_press(WINDOW, &KeyEvent::new(key_code::F10)).is_consumed());
    assert!(!fx.state(fx.ids.edit).needs_rebuild());
    assert!(fx.state(file).needs_rebuild());
}

#[test]
fn test_untrusted_and_unmatched_keys_are_ignored() {
    let mut fx = Fixture::new();
    let untrusted = KeyEvent::typed('e').with_modifiers(Modifiers::ALT).untrusted();
    assert_eq!(fx.service.key_press(WINDOW, &untrusted), KeyOutcome::Ignored);

    let unmatched = KeyEvent::typed('z').with_modifiers(Modifiers::ALT);
    assert_eq!(fx.service.key_press(WINDOW, &unmatched), KeyOutcome::Ignored);

    let wrong_modifiers = KeyEvent::typed('e').with_modifiers(Modifiers::ALT | Modifiers::SHIFT);
    assert_eq!(fx.service.key_press(WINDOW, &wrong_modifiers), KeyOutcome::Ignored);

    assert!(!fx.service.tree().opened_by_keyboard(fx.bar));
    assert_eq!(fx.service.tree().pending_timers(), 0);
    assert_eq!(
        fx.service.key_press(WindowId(0x3a00009), &KeyEvent::new(key_code::F10)),
        KeyOutcome::Ignored
    );
}

#[test]
fn test_keyboard_open_shows_keyboard_only_items() {
    let mut fx = Fixture::new();
    let event = KeyEvent::typed('v').with_modifiers(Modifiers::ALT);
    assert!(fx.service.key_press(WINDOW, &event).is_consumed());

    fx.open(fx.ids.view);
    assert_eq!(fx.visible(fx.ids.keyboard_only), Some(true));

    fx.close(fx.ids.view);
    fx.service.focus(WINDOW);
    fx.open(fx.ids.view);
    assert_eq!(fx.visible(fx.ids.keyboard_only), Some(false));
}
