//! Player identity as it is replicated between peers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-level identifier of a peer inside one session.
///
/// Ids are handed out by the server's transport. A client never picks its
/// own id; it proposes [`PeerId::UNASSIGNED`] and the server stamps the
/// connection id it observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(i32);

impl PeerId {
    /// Placeholder carried by a record whose owner has not been assigned an id yet.
    pub const UNASSIGNED: PeerId = PeerId(0);
    /// Reserved id of the hosting process.
    pub const SERVER: PeerId = PeerId(1);
    /// First id the transport hands out to a connecting client.
    pub const FIRST_CLIENT: PeerId = PeerId(2);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_server(self) -> bool {
        self.0 == Self::SERVER.0
    }

    #[inline]
    pub const fn is_assigned(self) -> bool {
        self.0 != Self::UNASSIGNED.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for PeerId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// RGB color chosen by a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PlayerColor {
    pub const BLACK: PlayerColor = PlayerColor::rgb(0, 0, 0);
    pub const WHITE: PlayerColor = PlayerColor::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<(u8, u8, u8)> for PlayerColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl From<PlayerColor> for (u8, u8, u8) {
    fn from(color: PlayerColor) -> Self {
        (color.r, color.g, color.b)
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Local, not yet registered description of the player a process brings
/// into a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub name: String,
    pub color: PlayerColor,
}

impl PlayerProfile {
    pub fn new(name: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    /// Builds the record this profile announces, without an assigned id.
    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            peer_id: PeerId::UNASSIGNED,
            name: self.name.clone(),
            color: self.color,
        }
    }
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self::new("Player", PlayerColor::default())
    }
}

/// Serializable identity of one participant.
///
/// Once a record has been registered its `peer_id` never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub peer_id: PeerId,
    pub name: String,
    pub color: PlayerColor,
}

impl PlayerRecord {
    pub fn new(peer_id: PeerId, name: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            peer_id,
            name: name.into(),
            color,
        }
    }

    /// Returns a copy of this record carrying `peer_id`.
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = peer_id;
        self
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' {}", self.peer_id, self.name, self.color)
    }
}
