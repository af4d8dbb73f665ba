//! In-process message channel between the plugin sandbox and its UI surface.
//!
//! Delivery is fire-and-forget and FIFO per direction. A message posted after
//! the other end has gone away is dropped.

use crate::protocol::Message;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

/// Posting half of one direction of the transport.
#[derive(Clone)]
pub struct Outbox {
    tx: Sender<Message>,
    side: &'static str,
}

impl Outbox {
    /// Post a message. Never blocks and never fails loudly.
    pub fn post(&self, msg: Message) {
        let kind = msg.kind();
        if self.tx.send(msg).is_err() {
            log::debug!("{} transport closed, dropped {} message", self.side, kind);
        }
    }
}

/// Receiving half of one direction of the transport.
struct Inbox {
    rx: Receiver<Message>,
}

impl Inbox {
    fn try_recv(&self) -> Option<Message> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn drain(&self) -> Vec<Message> {
        self.rx.try_iter().collect()
    }
}

/// The sandbox end: posts to the UI, receives from the UI.
pub struct SandboxPort {
    outbox: Outbox,
    inbox: Inbox,
}

impl SandboxPort {
    /// Post a message to the UI surface.
    pub fn post(&self, msg: Message) {
        self.outbox.post(msg);
    }

    /// A cloneable handle for posting to the UI surface.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.inbox.try_recv()
    }

    /// All messages from the UI that are waiting, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        self.inbox.drain()
    }
}

/// The UI-surface end: posts into the sandbox, receives from the sandbox.
pub struct UiPort {
    outbox: Outbox,
    inbox: Inbox,
}

impl UiPort {
    /// Post a message into the sandbox.
    pub fn post(&self, msg: Message) {
        self.outbox.post(msg);
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.inbox.try_recv()
    }

    /// All messages from the sandbox that are waiting, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        self.inbox.drain()
    }
}

/// Constructor for connected sandbox/UI port pairs.
pub struct PluginTransport;

impl PluginTransport {
    pub fn pair() -> (SandboxPort, UiPort) {
        let (to_ui, from_sandbox) = channel();
        let (to_sandbox, from_ui) = channel();
        let sandbox = SandboxPort {
            outbox: Outbox { tx: to_ui, side: "ui" },
            inbox: Inbox { rx: from_ui },
        };
        let ui = UiPort {
            outbox: Outbox { tx: to_sandbox, side: "sandbox" },
            inbox: Inbox { rx: from_sandbox },
        };
        (sandbox, ui)
    }
}
