//! In-memory player registry, one per session.

use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::player::{PeerId, PlayerRecord};

/// Mapping of peer id to player record.
///
/// Records are only ever added. A second insertion for the same id is
/// reported as [`RegistryError::DuplicateKey`] and leaves the entry untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    players: BTreeMap<PeerId, PlayerRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, peer_id: PeerId, record: PlayerRecord) -> Result<(), RegistryError> {
        if self.players.contains_key(&peer_id) {
            return Err(RegistryError::DuplicateKey(peer_id));
        }
        self.players.insert(peer_id, record);
        Ok(())
    }

    pub fn get(&self, peer_id: PeerId) -> Option<&PlayerRecord> {
        self.players.get(&peer_id)
    }

    pub fn contains(&self, peer_id: PeerId) -> bool {
        self.players.contains_key(&peer_id)
    }

    /// Iterates all records ordered by peer id.
    pub fn iter(&self) -> impl Iterator<Item = (PeerId, &PlayerRecord)> {
        self.players.iter().map(|(id, record)| (*id, record))
    }

    pub fn all(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.players.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
