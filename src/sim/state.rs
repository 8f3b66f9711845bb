//! Per-level simulation state

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::germ::{Germ, GermId};

/// RNG seed wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }
}

/// Mutable state of the level being played
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelState {
    /// Simulation steps since the level started
    pub tick: u64,
    /// Live germs, sorted by id (new ids are always the largest)
    pub germs: Vec<Germ>,
    next_germ_id: GermId,
}

impl LevelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next germ ID
    pub fn next_germ_id(&mut self) -> GermId {
        let id = self.next_germ_id;
        self.next_germ_id += 1;
        id
    }

    pub fn position_of(&self, id: GermId) -> Option<usize> {
        self.germs.binary_search_by_key(&id, |g| g.id).ok()
    }

    pub fn germ(&self, id: GermId) -> Option<&Germ> {
        self.position_of(id).map(|i| &self.germs[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_ids_are_monotonic() {
        let mut level = LevelState::new();
        assert_eq!(level.next_germ_id(), 0);
        assert_eq!(level.next_germ_id(), 1);
        assert_eq!(level.next_germ_id(), 2);
        assert_eq!(level.tick, 0);
    }

    #[test]
    fn test_rng_state_reproducible() {
        let state = RngState::new(42);
        let mut a = state.to_rng();
        let mut b = state.to_rng();
        for _ in 0..10 {
            assert_eq!(a.random::<u32>(), b.random::<u32>());
        }
    }
}
