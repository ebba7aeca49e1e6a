/// Clock abstraction for the frame loop.
///
/// The loop samples the clock once per tick and passes the same `now`
/// (seconds since start) to every subsystem.

use std::time::Instant;

pub trait Clock {
    /// Seconds elapsed since the clock's origin.
    fn now(&self) -> f64;
}

/// Production clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
