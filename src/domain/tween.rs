/// Tween primitive: one time-bounded, eased interpolation.
///
/// A tween never reads a clock itself. The engine samples its monotonic
/// clock once per frame and hands the same `now` (seconds) to every tween,
/// so concurrent tweens stay in lockstep and tests can drive time directly.
///
/// A zero (or negative) duration is an instantaneous set: the first sample
/// already returns the end value and reports completion.

use super::math::Lerp;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ease {
    Linear,
    /// `0.5 * (1 - cos(PI * t))`: slow start, slow finish.
    CosineInOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::CosineInOut => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Tween<T: Lerp> {
    from: T,
    to: T,
    start: f64,
    duration: f64,
    ease: Ease,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, start: f64, duration: f64, ease: Ease) -> Self {
        Tween { from, to, start, duration, ease }
    }

    pub fn is_instant(&self) -> bool {
        self.duration <= 0.0
    }

    /// Linear progress in [0, 1] at `now`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.is_instant() {
            return 1.0;
        }
        (((now - self.start) / self.duration) as f32).clamp(0.0, 1.0)
    }

    /// Value at `now` and whether the tween has finished.
    pub fn sample(&self, now: f64) -> (T, bool) {
        let p = self.progress(now);
        if p >= 1.0 {
            return (self.to, true);
        }
        (T::lerp(self.from, self.to, self.ease.apply(p)), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::math::Vec3;

    #[test]
    fn cosine_ease_endpoints_and_midpoint() {
        assert!(Ease::CosineInOut.apply(0.0).abs() < 1e-6);
        assert!((Ease::CosineInOut.apply(1.0) - 1.0).abs() < 1e-6);
        assert!((Ease::CosineInOut.apply(0.5) - 0.5).abs() < 1e-6);
        // slow start
        assert!(Ease::CosineInOut.apply(0.1) < 0.1);
    }

    #[test]
    fn zero_duration_completes_on_first_sample() {
        let t = Tween::new(0.0_f32, 1.0, 10.0, 0.0, Ease::CosineInOut);
        assert!(t.is_instant());
        assert_eq!(t.sample(10.0), (1.0, true));
        // Even a sample "before" start is already done.
        assert_eq!(t.sample(0.0), (1.0, true));
    }

    #[test]
    fn tween_reaches_end_exactly_at_duration() {
        let t = Tween::new(Vec3::ZERO, Vec3::new(2.0, 0.0, -4.0), 1.0, 2.0, Ease::Linear);
        let (mid, done) = t.sample(2.0);
        assert!(!done);
        assert!((mid.x - 1.0).abs() < 1e-5);
        assert!((mid.z + 2.0).abs() < 1e-5);
        let (end, done) = t.sample(3.0);
        assert!(done);
        assert_eq!(end, Vec3::new(2.0, 0.0, -4.0));
    }

    #[test]
    fn progress_is_monotonic() {
        let t = Tween::new(5.0_f32, -5.0, 0.0, 1.5, Ease::CosineInOut);
        let mut last = f32::MAX;
        for i in 0..=30 {
            let (v, _) = t.sample(i as f64 * 0.05);
            assert!(v <= last);
            last = v;
        }
        assert_eq!(last, -5.0);
    }
}
