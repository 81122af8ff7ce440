//! Session and player mailboxes.
//!
//! Each session has one inbound mailbox: many gateway callers send into it,
//! the session's coordinator is the only receiver. Each player has one
//! outbound mailbox: the coordinator sends, the player's long-poll drains it.
//! Both are unbounded FIFO channels, so sending never blocks.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use settlers_core::{ClientMessage, ServerMessage};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// A player message tagged with its sender's token.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: Uuid,
    pub message: ClientMessage,
}

#[derive(Debug, Error)]
#[error("Mailbox closed")]
pub struct MailboxClosed;

/// Create a session's inbound mailbox.
pub fn inbox() -> (InboxSender, InboxReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender(tx), InboxReceiver(rx))
}

/// Producer side of a session's inbound mailbox.
#[derive(Debug, Clone)]
pub struct InboxSender(mpsc::UnboundedSender<Envelope>);

impl InboxSender {
    /// Enqueue a message. Fails only once the coordinator has stopped.
    pub fn send(&self, from: Uuid, message: ClientMessage) -> Result<(), MailboxClosed> {
        self.0
            .send(Envelope { from, message })
            .map_err(|_| MailboxClosed)
    }
}

/// Consumer side of a session's inbound mailbox, owned by the coordinator.
#[derive(Debug)]
pub struct InboxReceiver(mpsc::UnboundedReceiver<Envelope>);

impl InboxReceiver {
    /// Wait for the next message. `None` once every sender is gone.
    pub async fn receive(&mut self) -> Option<Envelope> {
        self.0.recv().await
    }
}

/// Result of polling an outbound mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Polled {
    Message(ServerMessage),
    NoMessageYet,
}

impl Polled {
    pub fn into_message(self) -> Option<ServerMessage> {
        match self {
            Polled::Message(msg) => Some(msg),
            Polled::NoMessageYet => None,
        }
    }
}

/// A single player's outbound mailbox.
#[derive(Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<ServerMessage>,
    rx: Mutex<mpsc::UnboundedReceiver<ServerMessage>>,
}

impl Outbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Enqueue a message for the player.
    pub fn send(&self, msg: ServerMessage) {
        // The receiver lives as long as `self`
        let _ = self.tx.send(msg);
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// Concurrent polls are served one at a time; time spent waiting for
    /// another poll to finish counts against `timeout`.
    pub async fn receive_timeout(&self, timeout: Duration) -> Polled {
        let next = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match tokio::time::timeout(timeout, next).await {
            Ok(Some(msg)) => Polled::Message(msg),
            Ok(None) | Err(_) => Polled::NoMessageYet,
        }
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
