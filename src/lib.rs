//! Epidemic - germs grow and divide in a beaker, tap them before they overflow
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics world, germ population, player progress)
//! - `fsm`: Generic table-driven state machine interpreter
//! - `game`: Game controller wiring ticks/touches into the state machine
//! - `config`: Data-driven game tuning

pub mod config;
pub mod fsm;
pub mod game;
pub mod sim;

pub use config::{ConfigError, GameConfig};
pub use fsm::{Cell, FsmError, FsmSpec, Machine};
pub use game::{Game, GameEvent, MacroState};

/// Game configuration defaults
pub mod consts {
    /// Simulation steps per second
    pub const STEPS_PER_SECOND: u32 = 30;
    /// Expected time between germ divisions (seconds)
    pub const AVERAGE_DOUBLING_PERIOD: f64 = 3.0;

    /// Default screen size (pixels)
    pub const SCREEN_WIDTH: f32 = 960.0;
    pub const SCREEN_HEIGHT: f32 = 640.0;

    /// Gravity in m/s², scaled to pixels by the height of the space in metres
    pub const GRAVITY: f32 = 9.8;
    pub const SPACE_HEIGHT_METRES: f32 = 30.0;
    /// Overlap resolution passes per step
    pub const SOLVER_ITERATIONS: u32 = 10;

    /// Beaker geometry (fractions of screen size)
    pub const BEAKER_CENTRE_X: f32 = 0.5;
    pub const BEAKER_BASE_Y: f32 = 1.0 / 6.0;
    pub const BEAKER_WIDTH: f32 = 0.8;
    pub const BEAKER_HEIGHT: f32 = 2.0 / 3.0;
    /// Wall thickness (fraction of screen height)
    pub const BEAKER_WALL: f32 = 1.0 / 40.0;

    /// Germs above this fraction of the screen height have overflowed
    pub const OVERFLOW_FRACTION: f32 = 5.0 / 6.0;
    /// Average seed germ radius (fraction of screen height)
    pub const GERM_SIZE_FRACTION: f32 = 1.0 / 40.0;
    /// Horizontal offset between the two halves of a split (fraction of screen width)
    pub const DIVISION_NUDGE_FRACTION: f32 = 1.0 / 500.0;

    /// Starting chance that a seed germ resists a given treatment
    pub const INITIAL_RESISTANCE_CHANCE: f64 = 0.10;
    /// Resistance chance multiplier each time a treatment is used
    pub const RESISTANCE_INCREASE: f64 = 1.1;
}

/// Format a resistance probability for display, e.g. `(10%)`
pub fn resistance_label(chance: f64) -> String {
    format!("({}%)", (chance * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistance_label() {
        assert_eq!(resistance_label(0.10), "(10%)");
        assert_eq!(resistance_label(0.121), "(12%)");
        assert_eq!(resistance_label(1.0), "(100%)");
    }
}
