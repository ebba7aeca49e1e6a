/// Particle dissolve.
///
/// `dissolve` turns an element into a point cloud: it samples points across
/// the element's surface (area-weighted), gives each a random outward
/// velocity, places the cloud where the element was, and removes the
/// element at once. Every tick the points drift and the cloud fades; a
/// cloud is dropped when its opacity reaches zero.
///
/// The returned completion resolves after a fixed `dissolve_ms`, not when
/// the last point fades, so callers can wait on "effectively gone" with a
/// known duration. It resolves even if sampling fails.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::ParticleConfig;
use crate::domain::math::Vec3;
use crate::domain::surface::Sampler;
use crate::sim::scene::{ElementId, Scene};
use crate::sim::signal::Completion;

/// One live point cloud. Points are in the source element's local space;
/// `position` and `scale` place the cloud in the world.
#[derive(Clone, Debug)]
pub struct ParticleBurst {
    pub position: Vec3,
    pub scale: Vec3,
    pub points: Vec<Vec3>,
    velocities: Vec<Vec3>,
    pub opacity: f32,
}

pub struct Dissolver {
    config: ParticleConfig,
    bursts: Vec<ParticleBurst>,
    pending: Vec<(f64, Completion)>,
    cues: usize,
    rng: StdRng,
}

impl Dissolver {
    pub fn new(config: ParticleConfig, seed: u64) -> Self {
        Dissolver {
            config,
            bursts: Vec::new(),
            pending: Vec::new(),
            cues: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn bursts(&self) -> &[ParticleBurst] {
        &self.bursts
    }

    /// Number of dissolves started since the last call (one audio cue each).
    pub fn take_cues(&mut self) -> usize {
        std::mem::take(&mut self.cues)
    }

    pub fn dissolve(&mut self, scene: &mut Scene, id: ElementId, count: usize, now: f64) -> Completion {
        let Some(transform) = scene.world_transform(id) else {
            debug!(?id, "dissolve on missing element");
            return Completion::resolved();
        };
        self.cues += 1;

        let sampled = match scene.get(id) {
            Some(e) => Sampler::build(&e.surface).map(|sampler| self.sample_points(&sampler, count)),
            None => return Completion::resolved(),
        };
        scene.dispose(id);

        match sampled {
            Ok((points, velocities)) => {
                debug!(?id, count, "dissolve started");
                self.bursts.push(ParticleBurst {
                    position: transform.position,
                    scale: transform.scale,
                    points,
                    velocities,
                    opacity: 1.0,
                });
            }
            Err(e) => {
                warn!(?id, error = %e, "dissolve sampling failed, removed element without particles");
                return Completion::resolved();
            }
        }

        let done = Completion::new();
        let deadline = now + self.config.dissolve_ms as f64 / 1000.0;
        self.pending.push((deadline, done.clone()));
        done
    }

    fn sample_points(&mut self, sampler: &Sampler<'_>, count: usize) -> (Vec<Vec3>, Vec<Vec3>) {
        let speed = self.config.speed;
        let mut points = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        for _ in 0..count {
            points.push(sampler.sample(&mut self.rng));
            let dir = Vec3::new(
                self.rng.gen::<f32>() - 0.5,
                self.rng.gen::<f32>() - 0.5,
                self.rng.gen::<f32>() - 0.5,
            );
            velocities.push(dir.normalize() * (speed * self.rng.gen_range(0.5..=1.0)));
        }
        (points, velocities)
    }

    /// Silent removal, no particles.
    pub fn remove(&mut self, scene: &mut Scene, id: ElementId) -> bool {
        scene.dispose(id)
    }

    pub fn update(&mut self, now: f64) {
        let fade = self.config.fade_rate;
        for burst in &mut self.bursts {
            for (p, v) in burst.points.iter_mut().zip(&burst.velocities) {
                *p = *p + *v;
            }
            burst.opacity -= fade;
        }
        self.bursts.retain(|b| b.opacity > 0.0);

        self.pending.retain(|(deadline, done)| {
            if now >= *deadline {
                done.resolve();
                false
            } else {
                true
            }
        });
    }

    /// Drop every live burst and resolve every pending completion.
    pub fn clear(&mut self) {
        self.bursts.clear();
        for (_, done) in self.pending.drain(..) {
            done.resolve();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::math::Rgb;
    use crate::domain::surface::Surface;
    use crate::sim::scene::{Element, ElementKind};

    fn config() -> ParticleConfig {
        ParticleConfig::default()
    }

    fn bar(scene: &mut Scene, surface: Surface) -> ElementId {
        let mut e = Element::new(ElementKind::TimerBar { color: Rgb::GREEN }, surface, Vec3::new(1.0, 2.0, -15.0));
        e.scale = Vec3::new(0.5, 1.0, 1.0);
        scene.insert(e)
    }

    #[test]
    fn dissolve_removes_element_and_spawns_burst_in_place() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(10.0, 0.05));
        let mut d = Dissolver::new(config(), 1);

        let done = d.dissolve(&mut scene, id, 200, 0.0);
        assert!(!scene.contains(id));
        assert_eq!(d.bursts().len(), 1);
        let burst = &d.bursts()[0];
        assert_eq!(burst.points.len(), 200);
        assert_eq!(burst.position, Vec3::new(1.0, 2.0, -15.0));
        assert_eq!(burst.scale, Vec3::new(0.5, 1.0, 1.0));
        assert!(!done.is_done());
        assert_eq!(d.take_cues(), 1);
        assert_eq!(d.take_cues(), 0);
    }

    #[test]
    fn velocities_are_bounded_by_speed() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(1.0, 1.0));
        let mut d = Dissolver::new(config(), 9);
        d.dissolve(&mut scene, id, 500, 0.0);
        let speed = d.config().speed;
        for v in &d.bursts()[0].velocities {
            let len = v.length();
            assert!(len <= speed * 1.0001);
            assert!(len >= speed * 0.5 * 0.9999 || len == 0.0);
        }
    }

    #[test]
    fn completion_fires_after_fixed_duration_exactly_once() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(1.0, 1.0));
        let mut d = Dissolver::new(config(), 3);
        let done = d.dissolve(&mut scene, id, 10, 10.0);
        d.update(11.0);
        assert!(!done.is_done());
        d.update(11.5);
        assert!(done.is_done());
        // resolved by the dissolver already; nobody else can claim it
        assert!(!done.resolve());
    }

    #[test]
    fn bursts_fade_out_and_are_dropped() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(1.0, 1.0));
        let mut d = Dissolver::new(config(), 3);
        d.dissolve(&mut scene, id, 10, 0.0);
        let before = d.bursts()[0].points[0];
        d.update(0.016);
        assert_ne!(d.bursts()[0].points[0], before);
        assert!((d.bursts()[0].opacity - (1.0 - d.config().fade_rate)).abs() < 1e-6);
        for i in 0..200 {
            d.update(0.016 * i as f64);
        }
        assert!(d.bursts().is_empty());
    }

    #[test]
    fn degenerate_surface_still_removes_and_completes() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::default());
        let mut d = Dissolver::new(config(), 3);
        let done = d.dissolve(&mut scene, id, 100, 0.0);
        assert!(done.is_done());
        assert!(!scene.contains(id));
        assert!(d.bursts().is_empty());
    }

    #[test]
    fn missing_element_resolves_immediately() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(1.0, 1.0));
        scene.dispose(id);
        let mut d = Dissolver::new(config(), 3);
        assert!(d.dissolve(&mut scene, id, 100, 0.0).is_done());
        assert_eq!(d.take_cues(), 0);
    }

    #[test]
    fn remove_is_silent() {
        let mut scene = Scene::new();
        let id = bar(&mut scene, Surface::quad(1.0, 1.0));
        let mut d = Dissolver::new(config(), 3);
        assert!(d.remove(&mut scene, id));
        assert!(!d.remove(&mut scene, id));
        assert!(d.bursts().is_empty());
        assert_eq!(d.take_cues(), 0);
    }
}
