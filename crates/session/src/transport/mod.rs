//! Transport abstraction the session runs on.
//!
//! A transport owns connection establishment and per-peer delivery. The
//! session only needs to create a server or dial one, send opaque payloads
//! to a peer and drain lifecycle/message events. Delivery to one peer must
//! be in send order; nothing is assumed across peers.

pub mod loopback;

use bytes::Bytes;

use crate::error::{BindError, DialError, TransportResult};
use crate::player::PeerId;

pub use loopback::{LoopbackNetwork, LoopbackTransport};

/// Events emitted by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Another peer joined the session.
    PeerConnected { peer: PeerId },
    /// Another peer left the session.
    PeerDisconnected { peer: PeerId },
    /// Client only: the dial completed and the server accepted us.
    ConnectedToServer,
    /// Client only: the server went away.
    ServerDisconnected,
    /// Client only: the dial could not be completed.
    ConnectionFailed,
    /// A payload arrived. `sender` is the transport's view of the origin,
    /// never a value taken from the payload.
    Message { sender: PeerId, payload: Bytes },
}

pub trait Transport {
    /// Starts listening for clients on `port`.
    fn create_server(&mut self, port: u16, max_clients: usize) -> Result<(), BindError>;

    /// Starts dialing a server. Completion is reported later through
    /// [`TransportEvent::ConnectedToServer`] or [`TransportEvent::ConnectionFailed`].
    fn create_client(&mut self, address: &str, port: u16) -> Result<(), DialError>;

    /// Id the transport assigned to this process, once known.
    fn unique_id(&self) -> Option<PeerId>;

    fn send_to(&mut self, peer: PeerId, payload: Bytes) -> TransportResult<()>;

    /// Moves every pending event into `output`, oldest first.
    fn poll_events(&mut self, output: &mut Vec<TransportEvent>);

    /// Tears down the active server or client connection, if any.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn create_server(&mut self, port: u16, max_clients: usize) -> Result<(), BindError> {
        (**self).create_server(port, max_clients)
    }

    fn create_client(&mut self, address: &str, port: u16) -> Result<(), DialError> {
        (**self).create_client(address, port)
    }

    fn unique_id(&self) -> Option<PeerId> {
        (**self).unique_id()
    }

    fn send_to(&mut self, peer: PeerId, payload: Bytes) -> TransportResult<()> {
        (**self).send_to(peer, payload)
    }

    fn poll_events(&mut self, output: &mut Vec<TransportEvent>) {
        (**self).poll_events(output)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
