//! Germ population engine
//!
//! Owns the live germs and the physics world they move in. Each tick:
//! 1. Step the physics world by one fixed timestep
//! 2. Advance the tick counter
//! 3. Split every germ scheduled for this tick into two halves
//! 4. Report overflow; if nothing overflowed, grow the germs that existed
//!    before this tick
//!
//! All randomness comes from one seeded PCG stream, so a seed plus a sequence
//! of calls always reproduces the same level.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::beaker::Beaker;
use super::germ::{Germ, GermId, Resistances};
use super::physics::{PhysicsWorld, Space};
use super::state::{LevelState, RngState};
use super::treatment::{ResistanceChances, Treatment};
use crate::config::GameConfig;

/// Germ mass handed to the physics world
const GERM_MASS: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulationError {
    #[error("germ {germ} was due to divide at tick {divide_at} but the level is at tick {tick}")]
    StaleDivision { germ: GermId, divide_at: u64, tick: u64 },
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Germs that split this tick
    pub divided: usize,
    /// A germ is above the overflow line
    pub overflowed: bool,
    /// Live germs after the tick
    pub live: usize,
}

/// Outcome of removing a germ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Already removed or divided
    Missing,
    Removed {
        /// No live germs remain
        level_clear: bool,
    },
}

impl Removal {
    pub fn level_clear(&self) -> bool {
        matches!(self, Removal::Removed { level_clear: true })
    }
}

/// Per-tick radius multiplier that doubles a germ over `interval_ticks` ticks
pub fn growth_rate_for(interval_ticks: u64) -> f64 {
    2f64.powf(1.0 / interval_ticks.max(1) as f64)
}

pub struct Population<W: PhysicsWorld> {
    world: W,
    level: LevelState,
    rng: Pcg32,
    beaker: Beaker,
    step_dt: f32,
    /// Largest uniform draw for a division interval, in ticks
    max_interval_draw: f64,
    base_size: f32,
    nudge: f32,
    overflow_line: f32,
}

impl Population<Space> {
    /// Population in the built-in physics world, with the beaker in place
    pub fn in_beaker(config: &GameConfig) -> Self {
        let mut space = Space::new(
            Vec2::new(0.0, -config.gravity_pixels()),
            config.solver_iterations,
        );
        Beaker::from_config(config).build(&mut space);
        Self::new(space, config)
    }
}

impl<W: PhysicsWorld> Population<W> {
    pub fn new(world: W, config: &GameConfig) -> Self {
        Self {
            world,
            level: LevelState::new(),
            rng: RngState::new(config.seed).to_rng(),
            beaker: Beaker::from_config(config),
            step_dt: config.step_dt(),
            max_interval_draw: 2.0 * config.average_doubling_period * config.steps_per_second as f64,
            base_size: config.base_germ_size(),
            nudge: config.division_nudge(),
            overflow_line: config.overflow_line(),
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn level(&self) -> &LevelState {
        &self.level
    }

    pub fn tick_count(&self) -> u64 {
        self.level.tick
    }

    /// Live germs, sorted by id
    pub fn germs(&self) -> &[Germ] {
        &self.level.germs
    }

    pub fn germ(&self, id: GermId) -> Option<&Germ> {
        self.level.germ(id)
    }

    pub fn germ_position(&self, id: GermId) -> Option<Vec2> {
        self.germ(id).and_then(|g| self.world.body_position(g.body))
    }

    pub fn len(&self) -> usize {
        self.level.germs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.level.germs.is_empty()
    }

    /// Ticks until a new germ divides: uniform so the mean is the average
    /// doubling period, never less than one
    pub fn division_interval(&mut self) -> u64 {
        let draw = self.rng.random::<f64>() * self.max_interval_draw;
        draw.round() as u64 + 1
    }

    /// Independent resistance roll per treatment
    pub fn roll_resistances(&mut self, chances: &ResistanceChances) -> Resistances {
        let mut flags = [false; Treatment::COUNT];
        for (flag, &chance) in flags.iter_mut().zip(chances) {
            *flag = self.rng.random::<f64>() < chance;
        }
        Resistances::new(flags)
    }

    /// Drop every germ and reset the level counters
    pub fn clear(&mut self) {
        for germ in std::mem::take(&mut self.level.germs) {
            self.destroy_body(&germ);
        }
        self.level = LevelState::new();
    }

    /// Start a level with `count` fresh germs spread across the middle of the beaker
    pub fn seed_level(&mut self, count: usize, chances: &ResistanceChances) {
        self.clear();

        let (left, right) = self.beaker.inner_span();
        let span = self.beaker.width / 2.0;
        let y = (self.beaker.y + self.beaker.rim()) / 2.0;

        for _ in 0..count {
            let radius = self.base_size * self.rng.random_range(0.8f32..1.2);
            let offset = span * (self.rng.random::<f32>() - 0.5);
            let x = (self.beaker.x + offset).max(left + radius).min(right - radius);
            let resistances = self.roll_resistances(chances);
            self.spawn_germ(Vec2::new(x, y), radius, resistances);
        }

        log::info!("Seeded {} germs", self.len());
    }

    /// Create a germ at the current tick with a freshly drawn division schedule
    pub fn spawn_germ(&mut self, pos: Vec2, radius: f32, resistances: Resistances) -> Option<GermId> {
        let body = self.world.add_dynamic_body(pos, GERM_MASS);
        let Some(shape) = self.world.add_circle_shape(body, radius) else {
            self.world.remove_body(body);
            return None;
        };

        let interval = self.division_interval();
        let id = self.level.next_germ_id();
        self.world.set_user_data(shape, id);
        self.level.germs.push(Germ {
            id,
            body,
            shape,
            radius,
            growth_rate: growth_rate_for(interval),
            created_at: self.level.tick,
            divide_at_tick: self.level.tick + interval,
            resistances,
        });
        Some(id)
    }

    /// Advance the level by one step
    pub fn tick(&mut self) -> TickReport {
        self.world.step(self.step_dt);
        self.level.tick += 1;

        let divided = self.divide_due();

        let invariant = self.check_invariant();
        if let Err(e) = &invariant {
            log::error!("{}", e);
        }
        debug_assert!(invariant.is_ok(), "{:?}", invariant);

        let overflowed = self.overflowed();
        if !overflowed {
            self.grow();
        }

        TickReport {
            tick: self.level.tick,
            divided,
            overflowed,
            live: self.len(),
        }
    }

    /// Split every germ due this tick. Due germs are picked before any
    /// children exist, so a child never splits in the tick it was born.
    fn divide_due(&mut self) -> usize {
        let tick = self.level.tick;
        let (due, survivors): (Vec<Germ>, Vec<Germ>) =
            std::mem::take(&mut self.level.germs).into_iter().partition(|g| g.is_due(tick));
        self.level.germs = survivors;

        let mut divided = 0;
        for parent in due {
            let Some(pos) = self.world.body_position(parent.body) else {
                log::debug!("Germ {} vanished before dividing", parent.id);
                continue;
            };
            self.destroy_body(&parent);

            let radius = parent.radius / 2.0;
            let first = self.spawn_germ(pos, radius, parent.resistances);
            let second = self.spawn_germ(pos + Vec2::new(self.nudge, 0.0), radius, parent.resistances);
            log::debug!(
                "Germ {} split into {:?} and {:?} at tick {}",
                parent.id,
                first,
                second,
                tick
            );
            divided += 1;
        }

        divided
    }

    /// Scale every germ not born this tick, replacing its shape.
    /// A germ grows on `interval - 1` ticks, so it splits just short of double size.
    fn grow(&mut self) {
        let tick = self.level.tick;
        let world = &mut self.world;
        for germ in self.level.germs.iter_mut().filter(|g| g.created_at < tick) {
            let radius = (germ.radius as f64 * germ.growth_rate) as f32;
            let Some(shape) = world.add_circle_shape(germ.body, radius) else {
                continue;
            };
            world.remove_shape(germ.shape);
            world.set_user_data(shape, germ.id);
            germ.shape = shape;
            germ.radius = radius;
        }
    }

    /// Any germ centre above the overflow line
    pub fn overflowed(&self) -> bool {
        self.level.germs.iter().any(|g| {
            self.world
                .body_position(g.body)
                .is_some_and(|pos| pos.y > self.overflow_line)
        })
    }

    /// Every live germ must still have its division ahead of it
    pub fn check_invariant(&self) -> Result<(), PopulationError> {
        let tick = self.level.tick;
        match self.level.germs.iter().find(|g| g.divide_at_tick <= tick) {
            Some(g) => Err(PopulationError::StaleDivision {
                germ: g.id,
                divide_at: g.divide_at_tick,
                tick,
            }),
            None => Ok(()),
        }
    }

    /// Remove a germ (e.g. touched by the player)
    pub fn remove_germ(&mut self, id: GermId) -> Removal {
        let Some(index) = self.level.position_of(id) else {
            return Removal::Missing;
        };
        let germ = self.level.germs.remove(index);
        self.destroy_body(&germ);
        log::debug!("Removed germ {} ({} left)", id, self.len());
        Removal::Removed {
            level_clear: self.is_empty(),
        }
    }

    /// The live germ under `point`, if any
    pub fn germ_at(&self, point: Vec2) -> Option<GermId> {
        let shape = self.world.point_query(point)?;
        let id = self.world.user_data(shape)?;
        self.germ(id).map(|g| g.id)
    }

    /// Kill every germ not resistant to `treatment`. Returns how many died.
    pub fn apply_treatment(&mut self, treatment: Treatment) -> usize {
        let (resistant, killed): (Vec<Germ>, Vec<Germ>) = std::mem::take(&mut self.level.germs)
            .into_iter()
            .partition(|g| g.resistances.resists(treatment));
        self.level.germs = resistant;
        for germ in &killed {
            self.destroy_body(germ);
        }
        log::info!(
            "{} killed {} germs, {} resistant",
            treatment.name(),
            killed.len(),
            self.len()
        );
        killed.len()
    }

    fn destroy_body(&mut self, germ: &Germ) {
        self.world.remove_shape(germ.shape);
        self.world.remove_body(germ.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn still_config() -> GameConfig {
        GameConfig {
            seed: 1234,
            screen_width: 900.0,
            screen_height: 600.0,
            gravity: 0.0,
            ..Default::default()
        }
    }

    fn no_resistance() -> ResistanceChances {
        [0.0; Treatment::COUNT]
    }

    /// Germ far from everything else so contacts don't move it
    fn lone_germ(pop: &mut Population<Space>, x: f32, y: f32, resistances: Resistances) -> GermId {
        pop.spawn_germ(Vec2::new(x, y), 5.0, resistances).unwrap()
    }

    #[test]
    fn test_seed_level_counts_and_ids() {
        let mut pop = Population::in_beaker(&still_config());
        pop.seed_level(5, &no_resistance());

        assert_eq!(pop.len(), 5);
        let ids: Vec<GermId> = pop.germs().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(pop.tick_count(), 0);
        for germ in pop.germs() {
            assert!(germ.divide_at_tick >= 1);
            assert!(germ.division_interval() >= 1);
            assert_eq!(germ.created_at, 0);
            let size = still_config().base_germ_size();
            assert!(germ.radius >= size * 0.8 - 1e-3 && germ.radius <= size * 1.2 + 1e-3);
            assert!(pop.germ_position(germ.id).is_some());
        }
    }

    #[test]
    fn test_seed_level_resets_previous_level() {
        let config = still_config();
        let mut pop = Population::in_beaker(&config);
        pop.seed_level(3, &no_resistance());
        for _ in 0..10 {
            pop.tick();
        }

        pop.seed_level(2, &no_resistance());
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.tick_count(), 0);
        assert_eq!(pop.germs()[0].id, 0);
        // Beaker (3 bodies) plus the two germs
        assert_eq!(pop.world().body_count(), 5);
    }

    #[test]
    fn test_division_replaces_parent_with_two_children() {
        let mut pop = Population::in_beaker(&still_config());
        let resistances = Resistances::none().with(Treatment::Penicillin, true);
        let parent_id = lone_germ(&mut pop, 450.0, 300.0, resistances);
        let parent = pop.germ(parent_id).unwrap().clone();

        for _ in 1..parent.divide_at_tick {
            pop.tick();
            assert_eq!(pop.len(), 1);
        }
        let report = pop.tick();
        let split_tick = parent.divide_at_tick;

        assert_eq!(report.divided, 1);
        assert_eq!(report.live, 2);
        assert!(pop.germ(parent_id).is_none());
        for child in pop.germs() {
            assert!(child.divide_at_tick > split_tick);
            assert_eq!(child.created_at, split_tick);
            assert_eq!(child.resistances, resistances);
            assert!(child.id > parent_id);
        }
        // Children skip growth in their first tick
        let parent_radius_at_split = pop.germs()[0].radius * 2.0;
        assert!(parent_radius_at_split >= parent.radius);
        assert_eq!(pop.germs()[0].radius, pop.germs()[1].radius);
        assert!(pop.check_invariant().is_ok());
    }

    #[test]
    fn test_children_are_nudged_apart() {
        let config = still_config();
        let mut pop = Population::in_beaker(&config);
        let id = lone_germ(&mut pop, 450.0, 300.0, Resistances::none());
        let due = pop.germ(id).unwrap().divide_at_tick;
        for _ in 0..due {
            pop.tick();
        }

        let positions: Vec<Vec2> = pop
            .germs()
            .iter()
            .map(|g| pop.germ_position(g.id).unwrap())
            .collect();
        assert_eq!(positions.len(), 2);
        assert!(positions[0].distance(positions[1]) > 0.0);
    }

    #[test]
    fn test_growth_doubles_over_interval() {
        let mut pop = Population::in_beaker(&still_config());
        let id = lone_germ(&mut pop, 450.0, 300.0, Resistances::none());
        let germ = pop.germ(id).unwrap().clone();

        // Growth runs on ticks 1..divide_at-1; the split tick itself divides first
        for _ in 1..germ.divide_at_tick {
            pop.tick();
        }
        let grown = pop.germ(id).unwrap().radius;
        let expected = germ.radius as f64 * germ.growth_rate.powi((germ.divide_at_tick - 1) as i32);
        assert!((grown as f64 - expected).abs() < 1e-3);
        assert_eq!(
            pop.world().shape_geometry(pop.germ(id).unwrap().shape),
            Some(crate::sim::Geometry::Circle { radius: grown })
        );
    }

    #[test]
    fn test_remove_germ() {
        let mut pop = Population::in_beaker(&still_config());
        let a = lone_germ(&mut pop, 300.0, 300.0, Resistances::none());
        let b = lone_germ(&mut pop, 600.0, 300.0, Resistances::none());
        let bodies = pop.world().body_count();

        assert_eq!(pop.remove_germ(a), Removal::Removed { level_clear: false });
        assert_eq!(pop.world().body_count(), bodies - 1);

        // Second removal of the same id is a no-op
        assert_eq!(pop.remove_germ(a), Removal::Missing);
        assert_eq!(pop.len(), 1);

        let last = pop.remove_germ(b);
        assert!(last.level_clear());
        assert!(pop.is_empty());
        assert_eq!(pop.remove_germ(99), Removal::Missing);
    }

    #[test]
    fn test_germ_at() {
        let mut pop = Population::in_beaker(&still_config());
        let id = lone_germ(&mut pop, 450.0, 300.0, Resistances::none());

        assert_eq!(pop.germ_at(Vec2::new(452.0, 301.0)), Some(id));
        assert_eq!(pop.germ_at(Vec2::new(450.0, 550.0)), None);
        pop.remove_germ(id);
        assert_eq!(pop.germ_at(Vec2::new(450.0, 300.0)), None);
    }

    #[test]
    fn test_overflow_detection() {
        let config = still_config();
        assert!((config.overflow_line() - 500.0).abs() < 1e-3);
        let mut pop = Population::in_beaker(&config);
        lone_germ(&mut pop, 450.0, 300.0, Resistances::none());
        assert!(!pop.tick().overflowed);

        lone_germ(&mut pop, 450.0, 550.0, Resistances::none());
        let report = pop.tick();
        assert!(report.overflowed);
    }

    #[test]
    fn test_no_growth_after_overflow() {
        let mut pop = Population::in_beaker(&still_config());
        let id = lone_germ(&mut pop, 450.0, 550.0, Resistances::none());
        pop.level.germs[0].divide_at_tick = 1000;
        let before = pop.germ(id).unwrap().radius;

        for _ in 0..3 {
            assert!(pop.tick().overflowed);
            assert_eq!(pop.germ(id).unwrap().radius, before);
        }
    }

    #[test]
    fn test_division_skips_germ_with_missing_body() {
        let mut pop = Population::in_beaker(&still_config());
        let id = lone_germ(&mut pop, 450.0, 300.0, Resistances::none());
        let germ = pop.germ(id).unwrap().clone();
        assert!(pop.world_mut().remove_body(germ.body));

        let mut divided = 0;
        for _ in 0..germ.divide_at_tick {
            let report = pop.tick();
            assert!(!report.overflowed);
            divided += report.divided;
        }

        assert_eq!(divided, 0);
        assert_eq!(pop.len(), 0);
        assert!(pop.germ(id).is_none());
        assert!(pop.check_invariant().is_ok());
    }

    #[test]
    fn test_simultaneous_divisions() {
        let mut pop = Population::in_beaker(&still_config());
        let a = lone_germ(&mut pop, 300.0, 300.0, Resistances::none());
        let b = lone_germ(&mut pop, 600.0, 300.0, Resistances::none());
        let due = pop.tick_count() + 1;
        for germ in pop.level.germs.iter_mut() {
            germ.divide_at_tick = due;
        }

        let report = pop.tick();

        assert_eq!(report.divided, 2);
        assert_eq!(report.live, 4);
        assert_eq!(pop.len(), 4);
        assert!(pop.germ(a).is_none() && pop.germ(b).is_none());
        for child in pop.germs() {
            assert_eq!(child.created_at, due);
            assert!(child.divide_at_tick > due);
        }
        assert!(pop.check_invariant().is_ok());
    }

    #[test]
    fn test_apply_treatment_spares_resistant() {
        let mut pop = Population::in_beaker(&still_config());
        let weak = lone_germ(&mut pop, 300.0, 300.0, Resistances::none());
        let tough = lone_germ(
            &mut pop,
            600.0,
            300.0,
            Resistances::none().with(Treatment::Penicillin, true),
        );

        assert_eq!(pop.apply_treatment(Treatment::Penicillin), 1);
        assert!(pop.germ(weak).is_none());
        assert!(pop.germ(tough).is_some());
        assert_eq!(pop.apply_treatment(Treatment::Ciprofloxacin), 1);
        assert!(pop.is_empty());
    }

    #[test]
    fn test_roll_resistances_extremes() {
        let mut pop = Population::in_beaker(&still_config());
        let all = pop.roll_resistances(&[1.0; Treatment::COUNT]);
        let none = pop.roll_resistances(&[0.0; Treatment::COUNT]);
        for t in Treatment::ALL {
            assert!(all.resists(t));
            assert!(!none.resists(t));
        }
    }

    #[test]
    fn test_stale_division_detected() {
        let mut pop = Population::in_beaker(&still_config());
        let id = lone_germ(&mut pop, 450.0, 300.0, Resistances::none());
        assert!(pop.check_invariant().is_ok());

        // Skip ticks without running the division pass
        let due = pop.germ(id).unwrap().divide_at_tick;
        pop.level.tick = due + 1;
        assert_eq!(
            pop.check_invariant(),
            Err(PopulationError::StaleDivision {
                germ: id,
                divide_at: due,
                tick: due + 1,
            })
        );
    }

    #[test]
    fn test_long_run_keeps_invariant() {
        let mut pop = Population::in_beaker(&still_config());
        pop.seed_level(2, &no_resistance());
        for _ in 0..200 {
            pop.tick();
            assert!(pop.check_invariant().is_ok());
        }
        // Divisions happened and ids were never reused
        assert!(pop.len() > 2);
        let ids: Vec<GermId> = pop.germs().iter().map(|g| g.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_determinism() {
        let config = still_config();
        let mut a = Population::in_beaker(&config);
        let mut b = Population::in_beaker(&config);
        a.seed_level(3, &[0.5; Treatment::COUNT]);
        b.seed_level(3, &[0.5; Treatment::COUNT]);
        for _ in 0..100 {
            assert_eq!(a.tick(), b.tick());
        }
        for (ga, gb) in a.germs().iter().zip(b.germs()) {
            assert_eq!(ga.id, gb.id);
            assert_eq!(ga.divide_at_tick, gb.divide_at_tick);
            assert_eq!(ga.resistances, gb.resistances);
            assert_eq!(a.germ_position(ga.id), b.germ_position(gb.id));
        }
    }

    #[test]
    fn test_interval_domain_for_default_timing() {
        let config = GameConfig {
            average_doubling_period: 3.0,
            steps_per_second: 30,
            ..still_config()
        };
        let mut pop = Population::in_beaker(&config);
        let mut seen_max = 0;
        for _ in 0..5000 {
            let t = pop.division_interval();
            assert!((1..=181).contains(&t));
            seen_max = seen_max.max(t);
        }
        assert!(seen_max > 150);
    }

    proptest! {
        #[test]
        fn prop_growth_rate_doubles(t in 1u64..10_000) {
            let compounded = growth_rate_for(t).powf(t as f64);
            prop_assert!((compounded - 2.0).abs() < 1e-9);
        }

        #[test]
        fn prop_division_interval_at_least_one(seed in any::<u64>(), period in 0.01f64..30.0) {
            let config = GameConfig { seed, average_doubling_period: period, ..still_config() };
            let mut pop = Population::new(Space::default(), &config);
            for _ in 0..50 {
                prop_assert!(pop.division_interval() >= 1);
            }
        }
    }
}
