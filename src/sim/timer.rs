/// Per-level countdown and its progress bar.
///
/// `Idle → Running → {Completed | Cancelled}`. While running, `update`
/// drives the bar (shrinking from the right, green → yellow → red) and
/// reports the timeout exactly once. `cancel` ends the countdown: a timeout
/// removes the bar silently, an explicit choice dissolves it with fewer
/// particles the closer the countdown was to running out.

use tracing::debug;

use crate::domain::math::{Lerp, Rgb, Vec3};
use crate::sim::particles::Dissolver;
use crate::sim::scene::{ElementId, ElementKind, Scene};
use crate::sim::signal::Completion;

pub const BAR_HEIGHT: f32 = 0.05;
pub const BAR_GAP_ABOVE_PANELS: f32 = 0.3;
const MIN_DISSOLVE_PARTICLES: usize = 10;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CountdownState {
    Idle,
    Running { started: f64 },
    Completed,
    Cancelled { remaining: f32 },
}

#[derive(Debug)]
pub struct Countdown {
    pub bar: ElementId,
    duration: f64,
    width: f32,
    base_x: f32,
    state: CountdownState,
}

/// Green while safe, yellow at half time, red when about to run out.
pub fn urgency_color(progress: f32) -> Rgb {
    if progress > 0.5 {
        Rgb::lerp(Rgb::YELLOW, Rgb::GREEN, (progress - 0.5) * 2.0)
    } else {
        Rgb::lerp(Rgb::RED, Rgb::YELLOW, progress.max(0.0) * 2.0)
    }
}

impl Countdown {
    pub fn new(bar: ElementId, duration_ms: u64, width: f32, base_x: f32) -> Self {
        Countdown {
            bar,
            duration: duration_ms as f64 / 1000.0,
            width,
            base_x,
            state: CountdownState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    pub fn start(&mut self, now: f64) {
        if self.state == CountdownState::Idle {
            self.state = CountdownState::Running { started: now };
            debug!(bar = ?self.bar, secs = self.duration, "countdown started");
        }
    }

    /// Remaining fraction in [0, 1].
    pub fn progress(&self, now: f64) -> f32 {
        match self.state {
            CountdownState::Idle => 1.0,
            CountdownState::Running { started } => {
                if self.duration <= 0.0 {
                    return 0.0;
                }
                (((self.duration - (now - started)) / self.duration) as f32).clamp(0.0, 1.0)
            }
            CountdownState::Completed => 0.0,
            CountdownState::Cancelled { remaining } => remaining,
        }
    }

    /// Drive the bar. Returns true exactly once, on the tick the countdown
    /// runs out.
    pub fn update(&mut self, now: f64, scene: &mut Scene) -> bool {
        if !self.is_running() {
            return false;
        }
        let p = self.progress(now);
        if let Some(bar) = scene.get_mut(self.bar) {
            bar.scale.x = p;
            bar.position.x = self.base_x - (1.0 - p) * self.width / 2.0;
            if let ElementKind::TimerBar { color } = &mut bar.kind {
                *color = urgency_color(p);
            }
        }
        if p <= 0.0 {
            self.state = CountdownState::Completed;
            debug!(bar = ?self.bar, "countdown timed out");
            return true;
        }
        false
    }

    /// Stop the countdown and get rid of the bar.
    pub fn cancel(&mut self, now: f64, was_timeout: bool, scene: &mut Scene, dissolver: &mut Dissolver) -> Completion {
        let remaining = self.progress(now);
        if self.is_running() {
            self.state = CountdownState::Cancelled { remaining };
        }
        if was_timeout || remaining <= 0.0 {
            dissolver.remove(scene, self.bar);
            return Completion::resolved();
        }
        let max = dissolver.config().timer_max_count as f32;
        let count = ((max * remaining).floor() as usize).max(MIN_DISSOLVE_PARTICLES);
        dissolver.dissolve(scene, self.bar, count, now)
    }
}

/// Bar width spanning both panels.
pub fn bar_width(panel_width: f32, gap: f32) -> f32 {
    (panel_width + gap) * 2.0 - gap
}

/// Bar position relative to the panel row.
pub fn bar_position(panel_y: f32, panel_height: f32, z: f32) -> Vec3 {
    Vec3::new(0.0, panel_y + panel_height / 2.0 + BAR_GAP_ABOVE_PANELS, z)
}
