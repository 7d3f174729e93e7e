//! Session bootstrap and player registry replication.
//!
//! One process hosts, the others join, and every participant ends up with the
//! same [`Registry`] of players keyed by [`PeerId`]. The server is the only
//! authority: it assigns ids, fans each newcomer out to existing clients and
//! backfills the newcomer with everyone already known.
//!
//! - `player`: replicated player identity
//! - `registry`: per-session player table
//! - `protocol`: the registration handshake
//! - `controller`: session lifecycle state machine and notifications
//! - `transport`: transport abstraction and an in-memory loopback network
//!
//! Bevy is not a default dependency; the ECS adapter sits behind the `bevy` feature.

/// Bevy ECS adapter (resource wrapper + event pump)
#[cfg(feature = "bevy")]
pub mod bevy;
/// Session configuration
pub mod config;
/// Session lifecycle state machine
pub mod controller;
/// Shared error types
pub mod error;
/// Notifications raised to session observers
pub mod events;
/// Peer id allocation
pub mod ids;
/// Wire messages and their codec
pub mod messages;
/// Player identity
pub mod player;
/// Registration handshake
pub mod protocol;
/// Player registry
pub mod registry;
/// Transport abstraction and loopback implementation
pub mod transport;

pub use config::SessionConfig;
pub use controller::{Session, SessionController, SessionState};
pub use error::{BindError, DialError, ProtocolError, SessionError, SessionResult};
pub use events::{EndReason, JoinFailure, SessionEvent};
pub use player::{PeerId, PlayerColor, PlayerProfile, PlayerRecord};
pub use protocol::{RegistrationProtocol, Role};
pub use registry::Registry;
pub use transport::{LoopbackNetwork, LoopbackTransport, Transport, TransportEvent};

/// Convenience prelude for downstream crates.
pub mod prelude {
    pub use crate::{
        EndReason, JoinFailure, LoopbackNetwork, PeerId, PlayerColor, PlayerProfile,
        PlayerRecord, Registry, SessionConfig, SessionController, SessionEvent, SessionState,
        Transport,
    };
}
