//! Treatments (antibiotics) and the player's progress through the session

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// Every treatment the game knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Treatment {
    Penicillin,
    Ciprofloxacin,
}

impl Treatment {
    pub const COUNT: usize = 2;
    /// In unlock order
    pub const ALL: [Treatment; Treatment::COUNT] = [Treatment::Penicillin, Treatment::Ciprofloxacin];

    /// Stable slot for per-treatment arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Treatment::Penicillin => 0,
            Treatment::Ciprofloxacin => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Treatment::Penicillin => "Penicillin",
            Treatment::Ciprofloxacin => "Ciprofloxacin",
        }
    }

    pub fn default_unlock_score(self) -> u64 {
        match self {
            Treatment::Penicillin => 50,
            Treatment::Ciprofloxacin => 200,
        }
    }
}

/// Per-treatment probability that a new seed germ is resistant
pub type ResistanceChances = [f64; Treatment::COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentStatus {
    pub unlocked: bool,
    /// Chance in [0, 1] that a seed germ resists this treatment
    pub resistance_chance: f64,
    /// Score at which the treatment unlocks (None = never)
    pub unlock_score: Option<u64>,
}

/// Session progress, kept across levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// One point per germ removed
    pub score: u64,
    /// 1-based
    pub current_level: u32,
    treatments: [TreatmentStatus; Treatment::COUNT],
}

impl PlayerProgress {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            score: 0,
            current_level: 1,
            treatments: Treatment::ALL.map(|t| TreatmentStatus {
                unlocked: false,
                resistance_chance: config.initial_resistance_chance,
                unlock_score: config.unlock_score(t),
            }),
        }
    }

    pub fn status(&self, treatment: Treatment) -> &TreatmentStatus {
        &self.treatments[treatment.index()]
    }

    pub fn is_unlocked(&self, treatment: Treatment) -> bool {
        self.status(treatment).unlocked
    }

    pub fn record_removals(&mut self, count: u64) {
        self.score += count;
    }

    pub fn resistance_chances(&self) -> ResistanceChances {
        self.treatments.map(|s| s.resistance_chance)
    }

    /// Unlock every treatment whose threshold the score has reached.
    /// Returns only the ones unlocked by this call.
    pub fn unlock_ready(&mut self) -> Vec<Treatment> {
        let score = self.score;
        let mut unlocked = Vec::new();
        for treatment in Treatment::ALL {
            let status = &mut self.treatments[treatment.index()];
            if !status.unlocked && status.unlock_score.is_some_and(|threshold| score >= threshold) {
                status.unlocked = true;
                unlocked.push(treatment);
            }
        }
        unlocked
    }

    /// Germs adapt to a treatment each time it is used
    pub fn raise_resistance(&mut self, treatment: Treatment, factor: f64) {
        let status = &mut self.treatments[treatment.index()];
        status.resistance_chance = (status.resistance_chance * factor).clamp(0.0, 1.0);
    }

    pub fn advance_level(&mut self) {
        self.current_level += 1;
    }
}
