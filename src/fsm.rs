//! Table-driven finite state machine
//!
//! An `FsmSpec` is a static table indexed by event, then by current state.
//! Each cell holds an optional unconditional action and an ordered list of
//! guarded transitions. A `Machine` dispatches events against caller-owned
//! context; it keeps no state of its own between calls.
//!
//! Unmatched lookups are errors: a missing event row is
//! `FsmError::UnhandledEvent`, a missing state cell is
//! `FsmError::UnhandledState`. Tables that want a no-op register an empty
//! `Cell`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

/// Side-effecting action run whenever its cell is dispatched
pub type Action<C> = Box<dyn Fn(&mut C)>;

/// Transition predicate. A guard that returns true has already committed
/// whatever side effects belong to its transition.
pub type Guard<C> = Box<dyn Fn(&mut C) -> bool>;

/// Picks the state field out of the context
pub type StateSelector<C, S> = fn(&mut C) -> &mut S;

/// Errors raised when the table has no entry for a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("no transitions registered for event {event}")]
    UnhandledEvent { event: String },

    #[error("event {event} has no entry for state {state}")]
    UnhandledState { event: String, state: String },
}

/// One (event, state) entry of the table
pub struct Cell<C, S> {
    action: Option<Action<C>>,
    transitions: Vec<(Guard<C>, S)>,
}

impl<C, S> Default for Cell<C, S> {
    fn default() -> Self {
        Self {
            action: None,
            transitions: Vec::new(),
        }
    }
}

impl<C, S> Cell<C, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unconditional action
    pub fn action(mut self, action: impl Fn(&mut C) + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Append a guarded transition. Guards are tried in the order added.
    pub fn when(mut self, guard: impl Fn(&mut C) -> bool + 'static, target: S) -> Self {
        self.transitions.push((Box::new(guard), target));
        self
    }

    /// True if dispatching this cell can never do anything
    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.transitions.is_empty()
    }
}

/// Declarative transition table, built once and then only read
pub struct FsmSpec<C, S, E> {
    rows: HashMap<E, HashMap<S, Cell<C, S>>>,
}

impl<C, S, E> Default for FsmSpec<C, S, E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<C, S, E> FsmSpec<C, S, E>
where
    S: Eq + Hash,
    E: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cell for `event` while in `state`, replacing any earlier one
    pub fn on(mut self, event: E, state: S, cell: Cell<C, S>) -> Self {
        self.rows.entry(event).or_default().insert(state, cell);
        self
    }

    /// Whether a cell exists for this pair
    pub fn handles(&self, event: &E, state: &S) -> bool {
        self.rows
            .get(event)
            .is_some_and(|row| row.contains_key(state))
    }
}

/// Stateless dispatcher over a spec
pub struct Machine<C, S, E> {
    selector: StateSelector<C, S>,
    spec: FsmSpec<C, S, E>,
}

/// Bind a spec to the state field it drives
pub fn build<C, S, E>(selector: StateSelector<C, S>, spec: FsmSpec<C, S, E>) -> Machine<C, S, E> {
    Machine { selector, spec }
}

impl<C, S, E> Machine<C, S, E>
where
    S: Eq + Hash + Clone + Debug,
    E: Eq + Hash + Debug,
{
    /// Dispatch `event` against `ctx`.
    ///
    /// The cell is chosen from the state held before the action runs. The
    /// action runs exactly once, then guards are tried in declared order and
    /// the first one to return true wins; later guards are not evaluated.
    /// Returns the new state if a transition fired.
    pub fn handle(&self, ctx: &mut C, event: &E) -> Result<Option<S>, FsmError> {
        let current = (self.selector)(ctx).clone();

        let row = self
            .spec
            .rows
            .get(event)
            .ok_or_else(|| FsmError::UnhandledEvent {
                event: format!("{:?}", event),
            })?;
        let cell = row
            .get(&current)
            .ok_or_else(|| FsmError::UnhandledState {
                event: format!("{:?}", event),
                state: format!("{:?}", current),
            })?;

        if let Some(action) = &cell.action {
            action(ctx);
        }

        for (guard, target) in &cell.transitions {
            if guard(ctx) {
                log::trace!("{:?}: {:?} -> {:?}", event, current, target);
                *(self.selector)(ctx) = target.clone();
                return Ok(Some(target.clone()));
            }
        }

        Ok(None)
    }

    pub fn spec(&self) -> &FsmSpec<C, S, E> {
        &self.spec
    }
}
