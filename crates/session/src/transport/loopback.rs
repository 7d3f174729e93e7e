//! Loopback transport for in-memory sessions.
//!
//! A [`LoopbackNetwork`] stands in for the machine's network stack: servers
//! bind ports on it, clients dial those ports, and every endpoint gets its own
//! FIFO inbox. Nothing touches a socket, which makes it suitable for tests,
//! local simulations and singleplayer runs.
//!
//! The network behaves like a star around each server. Client ids are handed
//! out by the server starting at [`PeerId::FIRST_CLIENT`]. A client may address
//! another client directly; the payload is relayed and arrives with the true
//! sender id.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{BindError, DialError, TransportError, TransportResult};
use crate::ids::PeerIdGenerator;
use crate::player::PeerId;

use super::{Transport, TransportEvent};

type EndpointId = u64;

#[derive(Debug)]
enum Binding {
    Server {
        port: u16,
        max_clients: usize,
        ids: PeerIdGenerator,
        clients: BTreeMap<PeerId, EndpointId>,
    },
    Client {
        server: EndpointId,
        peer_id: PeerId,
    },
}

#[derive(Debug, Default)]
struct Endpoint {
    inbox: VecDeque<TransportEvent>,
    binding: Option<Binding>,
}

#[derive(Debug, Default)]
struct NetworkState {
    next_endpoint: EndpointId,
    ports: HashMap<u16, EndpointId>,
    endpoints: HashMap<EndpointId, Endpoint>,
    drop_messages: bool,
}

impl NetworkState {
    fn push(&mut self, endpoint: EndpointId, event: TransportEvent) {
        if let Some(target) = self.endpoints.get_mut(&endpoint) {
            target.inbox.push_back(event);
        }
    }

    fn deliver(&mut self, endpoint: EndpointId, sender: PeerId, payload: Bytes) {
        if self.drop_messages {
            trace!(%sender, "loopback message lost");
            return;
        }
        self.push(endpoint, TransportEvent::Message { sender, payload });
    }

    fn server_clients(&self, server: EndpointId) -> Vec<(PeerId, EndpointId)> {
        match self.endpoints.get(&server).and_then(|e| e.binding.as_ref()) {
            Some(Binding::Server { clients, .. }) => {
                clients.iter().map(|(id, ep)| (*id, *ep)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Completes a dial from `client` to whatever listens on `port`.
    fn connect(&mut self, client: EndpointId, port: u16) {
        let Some(&server) = self.ports.get(&port) else {
            debug!(port, "loopback dial failed: nothing listening");
            self.push(client, TransportEvent::ConnectionFailed);
            return;
        };

        let existing = self.server_clients(server);
        let assigned = match self.endpoints.get_mut(&server).and_then(|e| e.binding.as_mut()) {
            Some(Binding::Server {
                max_clients,
                ids,
                clients,
                ..
            }) if clients.len() < *max_clients => {
                let peer_id = ids.next();
                clients.insert(peer_id, client);
                Some(peer_id)
            }
            _ => None,
        };
        let Some(peer_id) = assigned else {
            debug!(port, "loopback dial failed: server full");
            self.push(client, TransportEvent::ConnectionFailed);
            return;
        };

        if let Some(endpoint) = self.endpoints.get_mut(&client) {
            endpoint.binding = Some(Binding::Client { server, peer_id });
        }

        debug!(port, %peer_id, "loopback client connected");
        self.push(client, TransportEvent::ConnectedToServer);
        self.push(client, TransportEvent::PeerConnected { peer: PeerId::SERVER });
        self.push(server, TransportEvent::PeerConnected { peer: peer_id });
        for (other_id, other) in existing {
            self.push(other, TransportEvent::PeerConnected { peer: peer_id });
            self.push(client, TransportEvent::PeerConnected { peer: other_id });
        }
    }

    fn close(&mut self, endpoint: EndpointId) {
        let binding = match self.endpoints.get_mut(&endpoint) {
            Some(ep) => {
                ep.inbox.clear();
                ep.binding.take()
            }
            None => None,
        };

        match binding {
            Some(Binding::Server { port, clients, .. }) => {
                self.ports.remove(&port);
                for client in clients.into_values() {
                    if let Some(ep) = self.endpoints.get_mut(&client) {
                        ep.binding = None;
                    }
                    self.push(client, TransportEvent::ServerDisconnected);
                }
                debug!(port, "loopback server closed");
            }
            Some(Binding::Client { server, peer_id }) => {
                if let Some(Binding::Server { clients, .. }) = self
                    .endpoints
                    .get_mut(&server)
                    .and_then(|e| e.binding.as_mut())
                {
                    clients.remove(&peer_id);
                }
                self.push(server, TransportEvent::PeerDisconnected { peer: peer_id });
                for (_, other) in self.server_clients(server) {
                    self.push(other, TransportEvent::PeerDisconnected { peer: peer_id });
                }
                debug!(%peer_id, "loopback client closed");
            }
            None => {}
        }
    }
}

/// Shared in-memory network. Cloning yields another handle to the same network.
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh endpoint, the equivalent of one process's network peer.
    pub fn endpoint(&self) -> LoopbackTransport {
        let mut state = self.lock();
        let id = state.next_endpoint;
        state.next_endpoint += 1;
        state.endpoints.insert(id, Endpoint::default());
        LoopbackTransport {
            network: self.clone(),
            id,
        }
    }

    /// When enabled every payload sent on the network is silently lost.
    /// Lifecycle events are still delivered.
    pub fn set_message_loss(&self, enabled: bool) {
        self.lock().drop_messages = enabled;
    }

    /// Returns whether a server is listening on `port`.
    pub fn is_bound(&self, port: u16) -> bool {
        self.lock().ports.contains_key(&port)
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One endpoint on a [`LoopbackNetwork`].
#[derive(Debug)]
pub struct LoopbackTransport {
    network: LoopbackNetwork,
    id: EndpointId,
}

impl LoopbackTransport {
    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }
}

impl Transport for LoopbackTransport {
    fn create_server(&mut self, port: u16, max_clients: usize) -> Result<(), BindError> {
        if port == 0 {
            return Err(BindError::InvalidPort(port));
        }

        let mut state = self.network.lock();
        if state
            .endpoints
            .get(&self.id)
            .is_some_and(|e| e.binding.is_some())
        {
            return Err(BindError::AlreadyActive);
        }
        if state.ports.contains_key(&port) {
            return Err(BindError::PortInUse(port));
        }

        state.ports.insert(port, self.id);
        if let Some(endpoint) = state.endpoints.get_mut(&self.id) {
            endpoint.binding = Some(Binding::Server {
                port,
                max_clients,
                ids: PeerIdGenerator::default(),
                clients: BTreeMap::new(),
            });
        }
        debug!(port, max_clients, "loopback server listening");
        Ok(())
    }

    fn create_client(&mut self, address: &str, port: u16) -> Result<(), DialError> {
        if address.trim().is_empty() {
            return Err(DialError::InvalidAddress(address.to_string()));
        }
        if port == 0 {
            return Err(DialError::InvalidPort(port));
        }

        let mut state = self.network.lock();
        if state
            .endpoints
            .get(&self.id)
            .is_some_and(|e| e.binding.is_some())
        {
            return Err(DialError::AlreadyActive);
        }

        debug!(address, port, "loopback dialing");
        state.connect(self.id, port);
        Ok(())
    }

    fn unique_id(&self) -> Option<PeerId> {
        let state = self.network.lock();
        let peer_id = match state.endpoints.get(&self.id)?.binding.as_ref()? {
            Binding::Server { .. } => PeerId::SERVER,
            Binding::Client { peer_id, .. } => *peer_id,
        };
        Some(peer_id)
    }

    fn send_to(&mut self, peer: PeerId, payload: Bytes) -> TransportResult<()> {
        let mut state = self.network.lock();
        let binding = state
            .endpoints
            .get(&self.id)
            .and_then(|e| e.binding.as_ref())
            .ok_or(TransportError::NotConnected)?;

        let (sender, target) = match binding {
            Binding::Server { clients, .. } => {
                let target = clients
                    .get(&peer)
                    .copied()
                    .ok_or(TransportError::UnknownPeer(peer))?;
                (PeerId::SERVER, target)
            }
            Binding::Client { server, peer_id } if peer.is_server() => (*peer_id, *server),
            Binding::Client { server, peer_id } => {
                let (server, sender) = (*server, *peer_id);
                let target = state
                    .server_clients(server)
                    .into_iter()
                    .find(|(id, _)| *id == peer && *id != sender)
                    .map(|(_, ep)| ep)
                    .ok_or(TransportError::UnknownPeer(peer))?;
                (sender, target)
            }
        };

        trace!(%sender, to = %peer, bytes = payload.len(), "loopback send");
        state.deliver(target, sender, payload);
        Ok(())
    }

    fn poll_events(&mut self, output: &mut Vec<TransportEvent>) {
        let mut state = self.network.lock();
        if let Some(endpoint) = state.endpoints.get_mut(&self.id) {
            output.extend(endpoint.inbox.drain(..));
        }
    }

    fn close(&mut self) {
        self.network.lock().close(self.id);
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        let mut state = self.network.lock();
        state.close(self.id);
        state.endpoints.remove(&self.id);
    }
}
