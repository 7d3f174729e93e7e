//! Session notifications and their subscribers.

use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::player::PeerId;

/// Why a join attempt did not produce a registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum JoinFailure {
    /// The transport refused to start dialing.
    Dial,
    /// The transport reported that the connection could not be established.
    ConnectionFailed,
    /// No connection was confirmed within the connect timeout.
    Timeout,
    /// Connected, but the server's backfill never arrived.
    RegistrationTimedOut,
}

/// Why an established session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EndReason {
    /// The local process left on its own.
    Left,
    ServerDisconnected,
    /// A registry invariant was violated and the session was aborted.
    ProtocolViolation,
}

/// Notifications raised to code observing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ServerCreated,
    JoinSucceeded,
    JoinFailed(JoinFailure),
    /// Raised after every registry mutation.
    PlayersChanged,
    /// The server's backfill reached this client; carries the local id.
    RegistrationCompleted(PeerId),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    SessionEnded(EndReason),
}

/// Fan-out of [`SessionEvent`]s to any number of receivers.
#[derive(Debug, Default)]
pub struct Subscribers {
    senders: Vec<Sender<SessionEvent>>,
}

impl Subscribers {
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    /// Delivers `event` to every live receiver, dropping closed ones.
    pub fn publish(&mut self, event: SessionEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
