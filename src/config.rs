//! Game tuning
//!
//! Loaded from a JSON file when one is given; anything missing falls back to
//! the defaults in `crate::consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::Treatment;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Beaker placement and size, as fractions of the screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeakerConfig {
    /// Horizontal centre (fraction of screen width)
    pub centre_x: f32,
    /// Centre of the base (fraction of screen height)
    pub base_y: f32,
    /// Outer width (fraction of screen width)
    pub width: f32,
    /// Wall height (fraction of screen height)
    pub height: f32,
    /// Wall thickness (fraction of screen height)
    pub wall: f32,
}

impl Default for BeakerConfig {
    fn default() -> Self {
        Self {
            centre_x: BEAKER_CENTRE_X,
            base_y: BEAKER_BASE_Y,
            width: BEAKER_WIDTH,
            height: BEAKER_HEIGHT,
            wall: BEAKER_WALL,
        }
    }
}

/// Score needed to unlock a treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRule {
    pub treatment: Treatment,
    pub score: u64,
}

/// All tunable game parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// RNG seed for the run
    pub seed: u64,
    pub screen_width: f32,
    pub screen_height: f32,

    // === Simulation ===
    pub steps_per_second: u32,
    /// Expected seconds between divisions
    pub average_doubling_period: f64,
    /// m/s² (0 disables gravity)
    pub gravity: f32,
    /// Metres the screen height represents
    pub space_height_metres: f32,
    pub solver_iterations: u32,

    // === Geometry ===
    pub beaker: BeakerConfig,
    pub overflow_fraction: f32,
    pub germ_size_fraction: f32,
    pub division_nudge_fraction: f32,

    // === Treatments ===
    pub initial_resistance_chance: f64,
    pub resistance_increase: f64,
    pub unlocks: Vec<UnlockRule>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,

            steps_per_second: STEPS_PER_SECOND,
            average_doubling_period: AVERAGE_DOUBLING_PERIOD,
            gravity: GRAVITY,
            space_height_metres: SPACE_HEIGHT_METRES,
            solver_iterations: SOLVER_ITERATIONS,

            beaker: BeakerConfig::default(),
            overflow_fraction: OVERFLOW_FRACTION,
            germ_size_fraction: GERM_SIZE_FRACTION,
            division_nudge_fraction: DIVISION_NUDGE_FRACTION,

            initial_resistance_chance: INITIAL_RESISTANCE_CHANCE,
            resistance_increase: RESISTANCE_INCREASE,
            unlocks: Treatment::ALL
                .iter()
                .map(|&treatment| UnlockRule {
                    treatment,
                    score: treatment.default_unlock_score(),
                })
                .collect(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load a config file, falling back to defaults if it is missing or bad
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default config ({})", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        }

        positive("screen_width", self.screen_width as f64)?;
        positive("screen_height", self.screen_height as f64)?;
        positive("steps_per_second", self.steps_per_second as f64)?;
        positive("average_doubling_period", self.average_doubling_period)?;
        positive("space_height_metres", self.space_height_metres as f64)?;
        positive("germ_size_fraction", self.germ_size_fraction as f64)?;
        positive("beaker.width", self.beaker.width as f64)?;
        positive("beaker.height", self.beaker.height as f64)?;
        positive("beaker.wall", self.beaker.wall as f64)?;

        if !(0.0..=1.0).contains(&self.initial_resistance_chance) {
            return Err(ConfigError::Invalid {
                field: "initial_resistance_chance",
                reason: format!("must be in [0, 1], got {}", self.initial_resistance_chance),
            });
        }
        if self.resistance_increase < 1.0 {
            return Err(ConfigError::Invalid {
                field: "resistance_increase",
                reason: format!("must be at least 1, got {}", self.resistance_increase),
            });
        }
        Ok(())
    }

    /// Fixed simulation timestep (seconds)
    pub fn step_dt(&self) -> f32 {
        1.0 / self.steps_per_second as f32
    }

    /// Germs whose centre rises above this height have overflowed
    pub fn overflow_line(&self) -> f32 {
        self.screen_height * self.overflow_fraction
    }

    /// Gravity in pixels/s² (pointing down)
    pub fn gravity_pixels(&self) -> f32 {
        self.gravity * self.screen_height / self.space_height_metres
    }

    /// Average radius of a freshly seeded germ
    pub fn base_germ_size(&self) -> f32 {
        self.screen_height * self.germ_size_fraction
    }

    pub fn division_nudge(&self) -> f32 {
        self.screen_width * self.division_nudge_fraction
    }

    /// Unlock threshold for a treatment (None if it can never unlock)
    pub fn unlock_score(&self, treatment: Treatment) -> Option<u64> {
        self.unlocks
            .iter()
            .find(|rule| rule.treatment == treatment)
            .map(|rule| rule.score)
    }
}
