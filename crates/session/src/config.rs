//! Konfiguration für Host und Clients einer Session.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::player::{PlayerColor, PlayerProfile};

/// Default port a server listens on.
pub const DEFAULT_PORT: u16 = 4546;
/// Default maximum number of clients a server accepts.
pub const DEFAULT_MAX_PLAYERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub port: u16,
    pub max_players: usize,
    /// Time a client may stay in `Connecting` before the join is abandoned.
    pub connect_timeout_secs: u64,
    /// Time a joined client waits for the server's backfill before giving up.
    pub registration_timeout_secs: u64,
    pub server_player: PlayerProfile,
    pub client_player: PlayerProfile,
}

impl SessionConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_players: DEFAULT_MAX_PLAYERS,
            connect_timeout_secs: 5,
            registration_timeout_secs: 10,
            server_player: PlayerProfile::new("ServerPlayer", PlayerColor::default()),
            client_player: PlayerProfile::new("ClientPlayer", PlayerColor::default()),
        }
    }
}
