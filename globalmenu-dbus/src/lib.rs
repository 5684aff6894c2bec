// SPDX-License-Identifier: LGPL-3.0-only
#![warn(missing_docs)]

//! D-Bus binding for globalmenu.
//!
//! [DbusExport] is the export sink the engine writes to. A [Bridge] serves
//! every export server in it as a `com.canonical.dbusmenu` object, turns the
//! recorded changes into protocol signals and forwards `RegisterWindow` calls
//! to the shell's `com.canonical.AppMenu.Registrar`.

/// Bus thread and the shell transport.
pub mod bridge;
/// Shared export sink.
pub mod export;
/// The dbusmenu object.
pub mod menu_object;
/// AppMenu registrar client.
pub mod registrar;
/// Wire conversions.
pub mod types;

use std::time::Instant;

use globalmenu_core::{Document, MenuService};

pub use bridge::{Bridge, BridgeError, DbusShell, MenuEvent};
pub use export::DbusExport;
pub use menu_object::MenuObject;

/// Menu service wired to the bus.
pub type DbusMenuService<D> = MenuService<D, DbusExport, DbusShell>;

/// Start a bridge for a fresh export and build a service on top of it.
pub fn connect<D: Document>(
    document: D,
    services: globalmenu_core::Services,
) -> Result<(DbusMenuService<D>, Bridge), BridgeError> {
    let export = DbusExport::new();
    let (bridge, shell) = Bridge::start(export.clone())?;
    Ok((MenuService::new(document, export, shell, services), bridge))
}

/// One turn of the host loop: apply shell replies and menu requests, then
/// run due continuations. Returns how much work was done.
pub fn pump<D: Document>(service: &mut DbusMenuService<D>, bridge: &Bridge) -> usize {
    let mut work = service.dispatch_shell_events();
    for event in bridge.poll_events() {
        work += 1;
        match event {
            MenuEvent::AboutToShow { item } => {
                service.about_to_show(item);
            },
            MenuEvent::Event { item, name, timestamp } => service.handle_item_event(item, &name, timestamp),
        }
    }
    work += service.process_mutations();
    work += service.run_idle();
    work += service.run_timers(Instant::now());
    work
}
