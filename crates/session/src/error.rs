//! Fehler- und Ergebnis-Typen für Session, Protokoll und Transport.

use thiserror::Error;

use crate::player::PeerId;

/// Failure to start listening as a server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("port {0} is already in use")]
    PortInUse(u16),
    #[error("transport already has an active peer")]
    AlreadyActive,
    #[error("invalid port {0}")]
    InvalidPort(u16),
}

/// Failure to start dialing a server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialError {
    #[error("invalid server address '{0}'")]
    InvalidAddress(String),
    #[error("transport already has an active peer")]
    AlreadyActive,
    #[error("invalid port {0}")]
    InvalidPort(u16),
}

/// Errors surfaced by a transport while a session is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("peer {0} is already registered")]
    DuplicateKey(PeerId),
}

/// Invariant violations raised by the registration protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("peer {0} registered twice")]
    DuplicateKey(PeerId),
}

impl From<RegistryError> for ProtocolError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateKey(id) => ProtocolError::DuplicateKey(id),
        }
    }
}

/// Fehler, die bei (De-)Serialisierung von Session-Nachrichten auftreten können.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Errors returned by the session controller's entry points.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create server: {0}")]
    Bind(#[from] BindError),
    #[error("failed to join server: {0}")]
    Dial(#[from] DialError),
    #[error("a session is already active ({0})")]
    AlreadyActive(&'static str),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type SessionResult<T> = Result<T, SessionError>;
