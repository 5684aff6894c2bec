// SPDX-License-Identifier: LGPL-3.0-only
//! AppMenu registrar client and owner watch.

use std::pin::pin;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use futures_util::future::{self, Either};
use futures_util::{Stream, StreamExt};
use globalmenu_core::broker::{ShellError, ShellEvent, WindowId};
use tokio_util::sync::CancellationToken;
use zbus::blocking::{Connection, Proxy};
use zbus::block_on;
use zbus::fdo::DBusProxy;
use zbus::names::BusName;
use zbus::zvariant::ObjectPath;

/// Well-known name of the shell's registrar.
pub const REGISTRAR_BUS: &str = "com.canonical.AppMenu.Registrar";
const REGISTRAR_PATH: &str = "/com/canonical/AppMenu/Registrar";
const REGISTRAR_INTERFACE: &str = "com.canonical.AppMenu.Registrar";

/// Client for the AppMenu registrar service.
pub struct AppMenuRegistrar<'a> {
    proxy: Proxy<'a>,
}

impl<'a> AppMenuRegistrar<'a> {
    /// Create a proxy. The registrar does not need to be running yet.
    pub fn new(connection: &Connection) -> zbus::Result<Self> {
        let proxy = Proxy::new(connection, REGISTRAR_BUS, REGISTRAR_PATH, REGISTRAR_INTERFACE)?;
        Ok(Self { proxy })
    }

    /// `RegisterWindow(window, path)`.
    pub fn register_window(&self, window: WindowId, path: &str) -> Result<(), ShellError> {
        let path = ObjectPath::try_from(path).map_err(|err| ShellError::Call(err.to_string()))?;
        self.proxy
            .call::<_, _, ()>("RegisterWindow", &(window.0, path))
            .map_err(|err| ShellError::Call(err.to_string()))
    }

    /// `UnregisterWindow(window)`.
    pub fn unregister_window(&self, window: WindowId) -> Result<(), ShellError> {
        self.proxy
            .call::<_, _, ()>("UnregisterWindow", &(window.0,))
            .map_err(|err| ShellError::Call(err.to_string()))
    }
}

/// Forward owner changes until the stream ends, the receiver goes away or
/// `shutdown` fires.
async fn follow_owner<S>(mut changes: S, events: &Sender<ShellEvent>, shutdown: &CancellationToken)
where
    S: Stream<Item = bool> + Unpin,
{
    loop {
        let cancelled = pin!(shutdown.cancelled());
        let online = match future::select(cancelled, changes.next()).await {
            Either::Left(_) | Either::Right((None, _)) => break,
            Either::Right((Some(online), _)) => online,
        };
        log::debug!("Registrar owner changed, online={online}");
        if events.send(ShellEvent::Availability(online)).is_err() {
            break;
        }
    }
}

async fn watch(connection: &Connection, events: &Sender<ShellEvent>, shutdown: &CancellationToken) -> zbus::Result<()> {
    let dbus = DBusProxy::new(connection.inner()).await?;
    let changes = dbus.receive_name_owner_changed_with_args(&[(0, REGISTRAR_BUS)]).await?;

    let online = dbus.name_has_owner(BusName::try_from(REGISTRAR_BUS)?).await?;
    if events.send(ShellEvent::Availability(online)).is_err() {
        return Ok(());
    }

    let changes = changes.filter_map(|signal| {
        future::ready(match signal.args() {
            Ok(args) => Some(args.new_owner().is_some()),
            Err(err) => {
                log::warn!("Malformed NameOwnerChanged: {err}");
                None
            },
        })
    });
    follow_owner(pin!(changes), events, shutdown).await;
    Ok(())
}

/// Follow the owner of [REGISTRAR_BUS] on a helper thread. The current state
/// is reported first, then every change. The thread returns once `shutdown`
/// is cancelled.
pub fn watch_owner(
    connection: Connection,
    events: Sender<ShellEvent>,
    shutdown: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("globalmenu-registrar".into())
        .spawn(move || {
            if let Err(err) = block_on(watch(&connection, &events, &shutdown)) {
                log::error!("Registrar watch exited: {err}");
                let _ = events.send(ShellEvent::Availability(false));
            }
        })
}
