//! Epidemic entry point
//!
//! Runs the game headless with a simple auto-player. Pass a JSON config path
//! as the first argument to override the defaults; `RUST_LOG` sets verbosity.

use epidemic::sim::{Space, Treatment};
use epidemic::{FsmError, Game, GameConfig, MacroState};

/// Simulated seconds to play
const PLAY_SECONDS: u32 = 120;
/// Ticks between auto-player taps
const TAP_INTERVAL: u64 = 8;

fn main() {
    env_logger::init();
    log::info!("Epidemic (headless) starting...");

    let config = std::env::args()
        .nth(1)
        .map(GameConfig::load)
        .unwrap_or_default();

    let mut game = Game::new(&config);
    if let Err(e) = autoplay(&mut game, PLAY_SECONDS * config.steps_per_second) {
        log::error!("State machine rejected an event: {}", e);
        std::process::exit(1);
    }

    let progress = game.progress();
    log::info!(
        "Finished on level {} with score {} ({:?})",
        progress.current_level,
        progress.score,
        game.state()
    );
    for treatment in Treatment::ALL {
        let status = progress.status(treatment);
        log::info!(
            "{}: {} {}",
            treatment.name(),
            if status.unlocked { "unlocked" } else { "locked" },
            epidemic::resistance_label(status.resistance_chance)
        );
    }
}

/// Drive the game frame by frame. The player taps the highest germ every few
/// ticks, uses a treatment when the beaker gets crowded and dismisses notices.
fn autoplay(game: &mut Game<Space>, frames: u32) -> Result<(), FsmError> {
    for frame in 0..frames as u64 {
        match game.state() {
            MacroState::Level => {
                game.on_tick()?;

                if game.population().len() > 12 {
                    if let Some(&treatment) = Treatment::ALL
                        .iter()
                        .rev()
                        .find(|&&t| game.progress().is_unlocked(t))
                    {
                        game.on_treatment(treatment)?;
                        continue;
                    }
                }

                if frame % TAP_INTERVAL == 0 {
                    let highest = game
                        .population()
                        .germs()
                        .iter()
                        .filter_map(|g| game.population().germ_position(g.id))
                        .max_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
                    if let Some(point) = highest {
                        game.on_touches(&[point])?;
                    }
                }
            }
            MacroState::Failed | MacroState::Success | MacroState::TreatmentUnlocked => {
                game.on_touches(&[glam::Vec2::ZERO])?;
            }
        }
    }
    Ok(())
}
