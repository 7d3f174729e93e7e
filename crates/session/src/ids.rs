//! Vergabe von Peer-IDs durch den Transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::player::PeerId;

/// Generator für fortlaufende Peer-IDs.
///
/// Klone teilen sich denselben Zähler, jede ID wird genau einmal vergeben.
#[derive(Debug, Clone)]
pub struct PeerIdGenerator {
    counter: Arc<AtomicI32>,
}

impl PeerIdGenerator {
    pub fn new(start: PeerId) -> Self {
        Self {
            counter: Arc::new(AtomicI32::new(start.get())),
        }
    }

    #[inline]
    pub fn next(&self) -> PeerId {
        PeerId::new(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PeerIdGenerator {
    fn default() -> Self {
        Self::new(PeerId::FIRST_CLIENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_counter() {
        let generator = PeerIdGenerator::default();
        let other = generator.clone();
        assert_eq!(generator.next(), PeerId::new(2));
        assert_eq!(other.next(), PeerId::new(3));
        assert_eq!(generator.next(), PeerId::new(4));
    }
}
