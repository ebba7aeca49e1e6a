/// Single-resolution completion signals.
///
/// Every awaitable step in the engine (tween finished, dissolve finished,
/// narration ended, video ended) hands back a `Completion`. The producer
/// resolves it; consumers poll `is_done()` on their next tick. Resolving
/// twice is harmless: only the first call reports `true`, which is what
/// lets narration, timers and dissolves guarantee "exactly once".
///
/// The engine is single-threaded and tick-driven, so the shared flag is an
/// `Rc<Cell<bool>>` rather than a lock or channel.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Debug, Default)]
pub struct Completion(Rc<Cell<bool>>);

impl Completion {
    pub fn new() -> Self {
        Completion(Rc::new(Cell::new(false)))
    }

    /// A signal that is already resolved (for skipped steps).
    pub fn resolved() -> Self {
        Completion(Rc::new(Cell::new(true)))
    }

    /// Resolve the signal. Returns `true` only for the call that resolved it.
    pub fn resolve(&self) -> bool {
        !self.0.replace(true)
    }

    pub fn is_done(&self) -> bool {
        self.0.get()
    }
}

/// Wait-for-all combinator: true once every signal has resolved.
pub fn all_done(signals: &[Completion]) -> bool {
    signals.iter().all(Completion::is_done)
}
