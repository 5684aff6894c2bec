// SPDX-License-Identifier: LGPL-3.0-only
use std::sync::mpsc::{self, Receiver, Sender};

/// Broadcast notifications for the rest of the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The shell appeared.
    Online,
    /// The shell went away.
    Offline,
    /// A popup opened; carries the popup's `id` attribute if it has one.
    PopupOpen(Option<String>),
}

impl Notification {
    /// Observer topic string.
    pub fn topic(&self) -> &'static str {
        match self {
            Notification::Online => "native-menu-service:online",
            Notification::Offline => "native-menu-service:offline",
            Notification::PopupOpen(_) => "native-menu-service:popup-open",
        }
    }
}

/// Fan-out of [Notification]s to every subscriber.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Vec<Sender<Notification>>,
}

impl Notifier {
    /// New subscription.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Send `notification` to every live subscriber.
    pub fn broadcast(&mut self, notification: Notification) {
        log::debug!("Broadcasting {}", notification.topic());
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut notifier = Notifier::default();
        let keep = notifier.subscribe();
        let dropped = notifier.subscribe();
        drop(dropped);
        notifier.broadcast(Notification::Online);
        assert_eq!(keep.try_recv(), Ok(Notification::Online));
        assert_eq!(notifier.subscribers.len(), 1);
    }
}
