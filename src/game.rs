//! Game controller
//!
//! Defines this game's state machine table and forwards ticks, touch batches
//! and treatment requests into it. The controller owns the player's progress
//! and the macro-state; the population owns the level.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::fsm::{self, Cell, FsmError, FsmSpec, Machine};
use crate::resistance_label;
use crate::sim::{PhysicsWorld, PlayerProgress, Population, Removal, Space, TickReport, Treatment};

/// Top-level game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroState {
    /// Germs are growing, player is tapping
    Level,
    /// Germs overflowed the beaker
    Failed,
    /// Every germ removed
    Success,
    /// Paused to announce a newly available treatment
    TreatmentUnlocked,
}

impl MacroState {
    pub const ALL: [MacroState; 4] = [
        MacroState::Level,
        MacroState::Failed,
        MacroState::Success,
        MacroState::TreatmentUnlocked,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEvent {
    Tick,
    Touch,
    Treat,
}

impl GameEvent {
    pub const ALL: [GameEvent; 3] = [GameEvent::Tick, GameEvent::Touch, GameEvent::Treat];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    /// Germs the level started with
    pub seeded: usize,
}

/// Message shown outside of play, dismissed by a touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    /// Level to return to when dismissed without restarting
    pub resume: Option<LevelInfo>,
}

/// Payload for the current macro-state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubState {
    Level(LevelInfo),
    Notice(Notice),
}

/// Everything the state machine reads and writes
pub struct GameContext<W: PhysicsWorld> {
    pub state: MacroState,
    pub sub_state: SubState,
    pub progress: PlayerProgress,
    pub population: Population<W>,
    /// Touch points of the batch being dispatched
    pub touches: Vec<Vec2>,
    /// Treatment requested by the batch being dispatched
    pub pending_treatment: Option<Treatment>,
    pub last_report: Option<TickReport>,
    /// Whether the tick callback is scheduled
    pub ticking: bool,
    resistance_increase: f64,
}

impl<W: PhysicsWorld> GameContext<W> {
    /// Seed the current level and resume ticking
    fn start_level(&mut self) {
        let level = self.progress.current_level;
        let count = level as usize;
        self.population
            .seed_level(count, &self.progress.resistance_chances());
        self.sub_state = SubState::Level(LevelInfo {
            level,
            seeded: count,
        });
        self.last_report = None;
        self.ticking = true;
        log::info!("Level {} started", level);
    }

    fn show_notice(&mut self, message: String, resume: Option<LevelInfo>) {
        log::info!("{}", message);
        self.sub_state = SubState::Notice(Notice { message, resume });
    }

    // Actions

    fn tick_population(&mut self) {
        self.last_report = Some(self.population.tick());
    }

    fn remove_touched(&mut self) {
        for point in std::mem::take(&mut self.touches) {
            let Some(id) = self.population.germ_at(point) else {
                continue;
            };
            let removal = self.population.remove_germ(id);
            if removal == Removal::Missing {
                continue;
            }
            self.progress.record_removals(1);
            if removal.level_clear() {
                log::debug!("Last germ removed");
                break;
            }
        }
    }

    fn apply_pending_treatment(&mut self) {
        let Some(treatment) = self.pending_treatment.take() else {
            return;
        };
        if !self.progress.is_unlocked(treatment) {
            log::debug!("{} is still locked", treatment.name());
            return;
        }
        let killed = self.population.apply_treatment(treatment);
        self.progress.record_removals(killed as u64);
        self.progress
            .raise_resistance(treatment, self.resistance_increase);
    }

    // Guards: each commits its own effects only when it returns true

    fn overflow_failed(&mut self) -> bool {
        if !self.last_report.is_some_and(|r| r.overflowed) {
            return false;
        }
        self.ticking = false;
        let level = self.progress.current_level;
        self.show_notice(
            format!("The germs overflowed! Touch to retry level {}", level),
            None,
        );
        true
    }

    fn treatment_unlocked(&mut self) -> bool {
        let unlocked = self.progress.unlock_ready();
        if unlocked.is_empty() {
            return false;
        }
        let names: Vec<String> = unlocked
            .iter()
            .map(|&t| {
                format!(
                    "{} {}",
                    t.name(),
                    resistance_label(self.progress.status(t).resistance_chance)
                )
            })
            .collect();
        let resume = match &self.sub_state {
            SubState::Level(info) => Some(info.clone()),
            SubState::Notice(_) => None,
        };
        self.show_notice(
            format!("Unlocked {}! Touch to continue", names.join(", ")),
            resume,
        );
        true
    }

    fn level_cleared(&mut self) -> bool {
        if !self.population.is_empty() {
            return false;
        }
        self.ticking = false;
        let cleared = self.progress.current_level;
        self.progress.advance_level();
        self.show_notice(
            format!(
                "Level {} cleared! Touch to start level {}",
                cleared, self.progress.current_level
            ),
            None,
        );
        true
    }

    fn restart_level(&mut self) -> bool {
        self.start_level();
        true
    }

    fn resume_level(&mut self) -> bool {
        let resume = match &self.sub_state {
            SubState::Notice(notice) => notice.resume.clone(),
            SubState::Level(_) => None,
        };
        self.sub_state = SubState::Level(resume.unwrap_or(LevelInfo {
            level: self.progress.current_level,
            seeded: self.population.len(),
        }));
        true
    }
}

fn macro_state<W: PhysicsWorld>(ctx: &mut GameContext<W>) -> &mut MacroState {
    &mut ctx.state
}

/// The game's transition table. Every (event, state) pair has a cell.
pub fn game_spec<W: PhysicsWorld + 'static>() -> FsmSpec<GameContext<W>, MacroState, GameEvent> {
    use GameEvent::{Tick, Touch, Treat};
    use MacroState::{Failed, Level, Success, TreatmentUnlocked};

    FsmSpec::new()
        .on(
            Tick,
            Level,
            Cell::new()
                .action(GameContext::<W>::tick_population)
                .when(GameContext::<W>::overflow_failed, Failed)
                .when(GameContext::<W>::treatment_unlocked, TreatmentUnlocked),
        )
        .on(Tick, Failed, Cell::new())
        .on(Tick, Success, Cell::new())
        .on(Tick, TreatmentUnlocked, Cell::new())
        .on(
            Touch,
            Level,
            Cell::new()
                .action(GameContext::<W>::remove_touched)
                .when(GameContext::<W>::level_cleared, Success),
        )
        .on(
            Touch,
            Failed,
            Cell::new().when(GameContext::<W>::restart_level, Level),
        )
        .on(
            Touch,
            Success,
            Cell::new().when(GameContext::<W>::restart_level, Level),
        )
        .on(
            Touch,
            TreatmentUnlocked,
            Cell::new().when(GameContext::<W>::resume_level, Level),
        )
        .on(
            Treat,
            Level,
            Cell::new()
                .action(GameContext::<W>::apply_pending_treatment)
                .when(GameContext::<W>::level_cleared, Success),
        )
        .on(Treat, Failed, Cell::new())
        .on(Treat, Success, Cell::new())
        .on(Treat, TreatmentUnlocked, Cell::new())
}

/// A running game session
pub struct Game<W: PhysicsWorld + 'static> {
    machine: Machine<GameContext<W>, MacroState, GameEvent>,
    ctx: GameContext<W>,
}

impl Game<Space> {
    /// Game in the built-in physics world, level 1 seeded
    pub fn new(config: &GameConfig) -> Self {
        Self::with_population(Population::in_beaker(config), config)
    }
}

impl<W: PhysicsWorld + 'static> Game<W> {
    pub fn with_population(population: Population<W>, config: &GameConfig) -> Self {
        let mut ctx = GameContext {
            state: MacroState::Level,
            sub_state: SubState::Level(LevelInfo {
                level: 1,
                seeded: 0,
            }),
            progress: PlayerProgress::new(config),
            population,
            touches: Vec::new(),
            pending_treatment: None,
            last_report: None,
            ticking: false,
            resistance_increase: config.resistance_increase,
        };
        ctx.start_level();

        Self {
            machine: fsm::build(macro_state::<W>, game_spec::<W>()),
            ctx,
        }
    }

    /// Periodic tick callback. Does nothing once ticking is unscheduled.
    pub fn on_tick(&mut self) -> Result<Option<MacroState>, FsmError> {
        if !self.ctx.ticking {
            return Ok(None);
        }
        self.dispatch(GameEvent::Tick)
    }

    /// Touch-batch callback
    pub fn on_touches(&mut self, points: &[Vec2]) -> Result<Option<MacroState>, FsmError> {
        self.ctx.touches = points.to_vec();
        let result = self.dispatch(GameEvent::Touch);
        self.ctx.touches.clear();
        result
    }

    /// Use a treatment on the current level. Locked treatments are ignored.
    pub fn on_treatment(&mut self, treatment: Treatment) -> Result<Option<MacroState>, FsmError> {
        self.ctx.pending_treatment = Some(treatment);
        let result = self.dispatch(GameEvent::Treat);
        self.ctx.pending_treatment = None;
        result
    }

    fn dispatch(&mut self, event: GameEvent) -> Result<Option<MacroState>, FsmError> {
        let next = self.machine.handle(&mut self.ctx, &event)?;
        if let Some(state) = next {
            log::info!("{:?}: now {:?}", event, state);
        }
        Ok(next)
    }

    pub fn state(&self) -> MacroState {
        self.ctx.state
    }

    pub fn sub_state(&self) -> &SubState {
        &self.ctx.sub_state
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.ctx.progress
    }

    pub fn population(&self) -> &Population<W> {
        &self.ctx.population
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.ctx.last_report
    }

    pub fn is_ticking(&self) -> bool {
        self.ctx.ticking
    }

    pub fn context(&self) -> &GameContext<W> {
        &self.ctx
    }

    pub fn machine(&self) -> &Machine<GameContext<W>, MacroState, GameEvent> {
        &self.machine
    }
}
