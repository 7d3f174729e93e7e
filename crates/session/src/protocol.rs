//! Registration protocol that populates every peer's [`Registry`].
//!
//! The server is the only process allowed to decide who is in the session.
//! A client announces itself once; the server stamps the connection id it
//! observed onto the record, tells every existing client about the newcomer
//! (fan-out), sends the newcomer every record it already holds (backfill),
//! and only then stores the new record.
//!
//! The protocol never talks to a transport. Messages it wants delivered are
//! pushed as [`Outbound`] entries into a caller supplied buffer, in the order
//! they have to be sent.

use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::player::{PeerId, PlayerRecord};
use crate::registry::Registry;

/// Role of the local process for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Role {
    Unbound,
    Server,
    #[strum(to_string = "Client({local})")]
    Client {
        local: PeerId,
    },
}

/// A record that has to be delivered to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: PeerId,
    pub record: PlayerRecord,
}

/// Reasons a register request is dropped without any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The request's origin does not match the identity it claims.
    UnauthorizedRegistration { sender: PeerId, claimed: PeerId },
    /// A record reached a client without an assigned id.
    Unassigned { sender: PeerId },
    /// No session role is bound yet.
    Unbound { sender: PeerId },
}

/// Outcome of a handled register request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Registered(PeerId),
    Dropped(Rejection),
}

#[derive(Debug)]
pub struct RegistrationProtocol {
    role: Role,
    registry: Registry,
}

impl RegistrationProtocol {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            registry: Registry::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers the local player once the process is attached to a session.
    ///
    /// The server inserts its own record under [`PeerId::SERVER`] without a
    /// network hop. A client stores itself under its transport id and queues
    /// one request to the server carrying an unassigned id.
    pub fn announce_self(
        &mut self,
        local: PlayerRecord,
        outbound: &mut Vec<Outbound>,
    ) -> Result<Handled, ProtocolError> {
        match self.role {
            Role::Server => self.handle_register_request(PeerId::SERVER, local, outbound),
            Role::Client { local: local_id } => {
                self.registry
                    .add(local_id, local.clone().with_peer_id(local_id))?;
                info!("registered local player {} as peer {}", local.name, local_id);

                outbound.push(Outbound {
                    to: PeerId::SERVER,
                    record: local.with_peer_id(PeerId::UNASSIGNED),
                });
                Ok(Handled::Registered(local_id))
            }
            Role::Unbound => Ok(Handled::Dropped(Rejection::Unbound {
                sender: PeerId::UNASSIGNED,
            })),
        }
    }

    /// Handles a register request whose `sender` was reported by the transport.
    pub fn handle_register_request(
        &mut self,
        sender: PeerId,
        record: PlayerRecord,
        outbound: &mut Vec<Outbound>,
    ) -> Result<Handled, ProtocolError> {
        debug!(%sender, claimed = %record.peer_id, role = %self.role, "register request");

        match self.role {
            Role::Server => self.register_as_server(sender, record, outbound),
            Role::Client { .. } => self.register_as_client(sender, record),
            Role::Unbound => {
                warn!(%sender, "register request without a bound session role, dropping");
                Ok(Handled::Dropped(Rejection::Unbound { sender }))
            }
        }
    }

    fn register_as_server(
        &mut self,
        sender: PeerId,
        record: PlayerRecord,
        outbound: &mut Vec<Outbound>,
    ) -> Result<Handled, ProtocolError> {
        let claimed = record.peer_id;
        let bootstrap = sender.is_server();
        if !bootstrap && claimed.is_assigned() && claimed != sender {
            warn!(%sender, %claimed, "unauthorized registration dropped");
            return Ok(Handled::Dropped(Rejection::UnauthorizedRegistration {
                sender,
                claimed,
            }));
        }

        let record = record.with_peer_id(sender);
        if self.registry.contains(sender) {
            return Err(ProtocolError::DuplicateKey(sender));
        }

        if !bootstrap {
            for (existing_id, existing) in self.registry.iter() {
                if !existing_id.is_server() {
                    outbound.push(Outbound {
                        to: existing_id,
                        record: record.clone(),
                    });
                }

                debug!("sending info about peer {} to peer {}", existing_id, sender);
                outbound.push(Outbound {
                    to: sender,
                    record: existing.clone(),
                });
            }
        }

        info!("registered player {}", record);
        self.registry.add(sender, record)?;
        Ok(Handled::Registered(sender))
    }

    fn register_as_client(
        &mut self,
        sender: PeerId,
        record: PlayerRecord,
    ) -> Result<Handled, ProtocolError> {
        if !sender.is_server() {
            warn!(%sender, claimed = %record.peer_id, "register request not sent by the server, dropping");
            return Ok(Handled::Dropped(Rejection::UnauthorizedRegistration {
                sender,
                claimed: record.peer_id,
            }));
        }
        if !record.peer_id.is_assigned() {
            warn!("server sent a record without an assigned id, dropping");
            return Ok(Handled::Dropped(Rejection::Unassigned { sender }));
        }

        let peer_id = record.peer_id;
        info!("registered player {}", record);
        self.registry.add(peer_id, record)?;
        Ok(Handled::Registered(peer_id))
    }
}
