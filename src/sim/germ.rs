//! Germ entities

use serde::{Deserialize, Serialize};

use super::physics::{BodyHandle, ShapeHandle};
use super::treatment::Treatment;

/// Unique per level, never reused
pub type GermId = u32;

/// Which treatments a germ shrugs off. Fixed at creation, copied to both
/// halves on division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resistances([bool; Treatment::COUNT]);

impl Resistances {
    pub fn new(flags: [bool; Treatment::COUNT]) -> Self {
        Self(flags)
    }

    /// Resistant to nothing
    pub fn none() -> Self {
        Self::default()
    }

    #[inline]
    pub fn resists(&self, treatment: Treatment) -> bool {
        self.0[treatment.index()]
    }

    pub fn with(mut self, treatment: Treatment, resistant: bool) -> Self {
        self.0[treatment.index()] = resistant;
        self
    }
}

/// A live germ. Its position lives on the physics body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Germ {
    pub id: GermId,
    pub body: BodyHandle,
    pub shape: ShapeHandle,
    pub radius: f32,
    /// Per-tick radius multiplier
    pub growth_rate: f64,
    pub created_at: u64,
    pub divide_at_tick: u64,
    pub resistances: Resistances,
}

impl Germ {
    /// Ticks between creation and the scheduled split
    pub fn division_interval(&self) -> u64 {
        self.divide_at_tick - self.created_at
    }

    #[inline]
    pub fn is_due(&self, tick: u64) -> bool {
        self.divide_at_tick == tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistances() {
        let r = Resistances::none().with(Treatment::Ciprofloxacin, true);
        assert!(!r.resists(Treatment::Penicillin));
        assert!(r.resists(Treatment::Ciprofloxacin));
        assert_eq!(r, Resistances::new([false, true]));
    }
}
