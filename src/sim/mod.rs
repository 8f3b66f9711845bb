//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod beaker;
pub mod collision;
pub mod germ;
pub mod physics;
pub mod population;
pub mod state;
pub mod treatment;

pub use beaker::Beaker;
pub use collision::{CollisionResult, circle_box_collision, circle_circle_collision};
pub use germ::{Germ, GermId, Resistances};
pub use physics::{BodyHandle, Geometry, PhysicsWorld, ShapeHandle, Space};
pub use population::{Population, PopulationError, Removal, TickReport, growth_rate_for};
pub use state::{LevelState, RngState};
pub use treatment::{PlayerProgress, ResistanceChances, Treatment, TreatmentStatus};
