//! Nachrichten, die Peers während des Session-Bootstraps austauschen.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::player::PlayerRecord;

/// Top-level envelope for session messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    /// Registers a player. Sent by a client to announce itself and by the
    /// server to fan out and backfill records.
    RegisterPlayer(PlayerRecord),
}

impl SessionMessage {
    /// Serialize this message to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let vec = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        Ok(Bytes::from(vec))
    }

    /// Deserialize bytes to a message (bincode).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (message, _len) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PeerId, PlayerColor};

    #[test]
    fn register_player_survives_the_wire() {
        let msg = SessionMessage::RegisterPlayer(PlayerRecord::new(
            PeerId::new(7),
            "Ada",
            PlayerColor::rgb(1, 2, 3),
        ));

        let bytes = msg.to_bytes().unwrap();
        let SessionMessage::RegisterPlayer(record) = SessionMessage::from_bytes(&bytes).unwrap();

        assert_eq!(record.peer_id, PeerId::new(7));
        assert_eq!(record.name, "Ada");
        assert_eq!(record.color, PlayerColor::rgb(1, 2, 3));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = SessionMessage::from_bytes(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
