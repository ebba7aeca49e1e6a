/// Scene transition choreographer.
///
/// Each step starts one or more tweens and hands back a completion. Tracks
/// are advanced once per tick with the shared `now`. A track may carry a
/// phase guard: when the orchestrator is no longer in that phase the track
/// is dropped where it stands (no further writes) and its completion is
/// resolved so nothing waits on it forever. A track whose element has been
/// disposed is dropped the same way.

use tracing::debug;

use crate::domain::math::Vec3;
use crate::domain::tween::{Ease, Tween};
use crate::sim::phase::PhaseTag;
use crate::sim::scene::{ElementId, Scene, CAMERA_Z};
use crate::sim::signal::Completion;

/// Panel geometry the zoom needs to fill the view.
pub const PANEL_WIDTH: f32 = 4.5;
pub const PANEL_ASPECT: f32 = 16.0 / 9.0;
pub const PANEL_HEIGHT: f32 = PANEL_WIDTH / PANEL_ASPECT;

enum Track {
    Fade(Tween<f32>),
    Camera(Tween<Vec3>),
    Zoom {
        panel: ElementId,
        camera: Tween<Vec3>,
        scale: Tween<Vec3>,
        border: Tween<f32>,
    },
    Opacity { element: ElementId, tween: Tween<f32> },
}

struct Active {
    track: Track,
    guard: Option<PhaseTag>,
    done: Completion,
}

pub struct Choreographer {
    active: Vec<Active>,
    zoom_secs: f64,
    reset_secs: f64,
}

impl Choreographer {
    pub fn new(zoom_secs: f64, reset_secs: f64) -> Self {
        Choreographer { active: Vec::new(), zoom_secs, reset_secs }
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    fn push(&mut self, track: Track, guard: Option<PhaseTag>) -> Completion {
        let done = Completion::new();
        self.active.push(Active { track, guard, done: done.clone() });
        done
    }

    /// Global fade; 0 = visible, 1 = black. Zero duration applies at once.
    pub fn fade_to(&mut self, scene: &mut Scene, target: f32, secs: f64, now: f64) -> Completion {
        // a new fade supersedes any running one
        self.active.retain(|a| {
            if matches!(a.track, Track::Fade(_)) {
                a.done.resolve();
                false
            } else {
                true
            }
        });
        if secs <= 0.0 {
            scene.fade = target;
            return Completion::resolved();
        }
        let tween = Tween::new(scene.fade, target, now, secs, Ease::CosineInOut);
        self.push(Track::Fade(tween), None)
    }

    /// Fly the camera to frame `panel` full-screen while its border shrinks
    /// to nothing. Stops updating if the phase leaves `guard`.
    pub fn zoom_to_panel(&mut self, scene: &Scene, panel: ElementId, now: f64, guard: Option<PhaseTag>) -> Completion {
        let Some(element) = scene.get(panel) else {
            return Completion::resolved();
        };
        let cam = scene.camera;
        let distance = cam.position.z - element.position.z;
        let (width, height) = cam.frustum_at(distance);

        let end_pos = Vec3::new(element.position.x, element.position.y, element.position.z + CAMERA_Z);
        let end_scale = Vec3::new(width / PANEL_WIDTH, height / PANEL_HEIGHT, 1.0);
        let border_from = element.panel().map_or(0.0, |p| p.border_width);
        debug!(?panel, distance, width, height, "zoom to panel");

        let track = Track::Zoom {
            panel,
            camera: Tween::new(cam.position, end_pos, now, self.zoom_secs, Ease::CosineInOut),
            scale: Tween::new(element.scale, end_scale, now, self.zoom_secs, Ease::CosineInOut),
            border: Tween::new(border_from, 0.0, now, self.zoom_secs, Ease::CosineInOut),
        };
        self.push(track, guard)
    }

    /// Return to the home x/y while travelling to depth `target_z`.
    pub fn reset_camera(&mut self, scene: &Scene, target_z: f32, now: f64) -> Completion {
        let cam = scene.camera;
        let end = Vec3::new(cam.home.x, cam.home.y, target_z);
        let tween = Tween::new(cam.position, end, now, self.reset_secs, Ease::CosineInOut);
        self.push(Track::Camera(tween), None)
    }

    /// Linear opacity fade of one element.
    pub fn fade_element(&mut self, scene: &mut Scene, element: ElementId, target: f32, secs: f64, now: f64) -> Completion {
        let Some(e) = scene.get_mut(element) else {
            return Completion::resolved();
        };
        if secs <= 0.0 {
            e.opacity = target;
            return Completion::resolved();
        }
        let tween = Tween::new(e.opacity, target, now, secs, Ease::Linear);
        self.push(Track::Opacity { element, tween }, None)
    }

    pub fn update(&mut self, scene: &mut Scene, now: f64, phase: PhaseTag) {
        self.active.retain(|a| {
            if a.guard.is_some_and(|g| g != phase) {
                debug!(guard = ?a.guard, %phase, "tween cancelled by phase change");
                a.done.resolve();
                return false;
            }
            let finished = match &a.track {
                Track::Fade(t) => {
                    let (v, done) = t.sample(now);
                    scene.fade = v;
                    Some(done)
                }
                Track::Camera(t) => {
                    let (v, done) = t.sample(now);
                    scene.camera.position = v;
                    Some(done)
                }
                Track::Zoom { panel, camera, scale, border } => match scene.get_mut(*panel) {
                    Some(e) => {
                        let (s, done) = scale.sample(now);
                        e.scale = s;
                        if let Some(p) = e.panel_mut() {
                            p.border_width = border.sample(now).0;
                        }
                        scene.camera.position = camera.sample(now).0;
                        Some(done)
                    }
                    None => None,
                },
                Track::Opacity { element, tween } => scene.get_mut(*element).map(|e| {
                    let (v, done) = tween.sample(now);
                    e.opacity = v;
                    done
                }),
            };
            match finished {
                Some(false) => true,
                Some(true) => {
                    a.done.resolve();
                    false
                }
                None => {
                    debug!("tween target disposed");
                    a.done.resolve();
                    false
                }
            }
        });
    }

    /// Drop every track, resolving its completion.
    pub fn clear(&mut self) {
        for a in self.active.drain(..) {
            a.done.resolve();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::math::Rgb;
    use crate::domain::story::Side;
    use crate::domain::surface::Surface;
    use crate::sim::assets::Texture;
    use crate::sim::scene::{Element, ElementKind, PanelVisual};

    fn panel(scene: &mut Scene, x: f32, z: f32) -> ElementId {
        scene.insert(Element::new(
            ElementKind::Panel(PanelVisual {
                side: Side::Left,
                texture: Texture::Placeholder,
                end_texture: None,
                border_width: 0.05,
                border_pulse: 1.0,
                interactive: true,
                selected: true,
                title: None,
            }),
            Surface::quad(PANEL_WIDTH, PANEL_HEIGHT),
            Vec3::new(x, 0.5, z),
        ))
    }

    #[test]
    fn zero_duration_fade_is_instant() {
        let mut scene = Scene::new();
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.fade_to(&mut scene, 1.0, 0.0, 3.0);
        assert!(done.is_done());
        assert_eq!(scene.fade, 1.0);
        assert!(c.is_idle());
    }

    #[test]
    fn fade_eases_to_target() {
        let mut scene = Scene::new();
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.fade_to(&mut scene, 1.0, 0.5, 0.0);
        c.update(&mut scene, 0.25, PhaseTag::Zooming);
        assert!((scene.fade - 0.5).abs() < 1e-5);
        assert!(!done.is_done());
        c.update(&mut scene, 0.5, PhaseTag::Zooming);
        assert_eq!(scene.fade, 1.0);
        assert!(done.is_done());
    }

    #[test]
    fn zoom_fills_view_with_panel() {
        let mut scene = Scene::new();
        scene.camera.aspect = 16.0 / 9.0;
        let id = panel(&mut scene, -3.05, 0.0);
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.zoom_to_panel(&mut scene, id, 0.0, Some(PhaseTag::Zooming));
        c.update(&mut scene, 1.5, PhaseTag::Zooming);
        assert!(done.is_done());

        assert_eq!(scene.camera.position, Vec3::new(-3.05, 0.5, 5.0));
        let e = scene.get(id).unwrap();
        let (w, h) = scene.camera.frustum_at(5.0);
        assert!((e.scale.x * PANEL_WIDTH - w).abs() < 1e-3);
        assert!((e.scale.y * PANEL_HEIGHT - h).abs() < 1e-3);
        assert_eq!(e.panel().unwrap().border_width, 0.0);
    }

    #[test]
    fn zoom_stops_when_phase_moves_on() {
        let mut scene = Scene::new();
        let id = panel(&mut scene, 3.05, 0.0);
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.zoom_to_panel(&mut scene, id, 0.0, Some(PhaseTag::Zooming));
        c.update(&mut scene, 0.5, PhaseTag::Zooming);
        let cam_mid = scene.camera.position;
        c.update(&mut scene, 1.0, PhaseTag::End);
        assert!(done.is_done());
        assert!(c.is_idle());
        c.update(&mut scene, 1.5, PhaseTag::Zooming);
        assert_eq!(scene.camera.position, cam_mid);
    }

    #[test]
    fn reset_camera_returns_home_at_new_depth() {
        let mut scene = Scene::new();
        scene.camera.position = Vec3::new(3.0, 0.5, 5.0);
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.reset_camera(&mut scene, -10.0, 0.0);
        c.update(&mut scene, 0.75, PhaseTag::Travelling);
        assert!(scene.camera.position.z < 5.0 && scene.camera.position.z > -10.0);
        c.update(&mut scene, 1.5, PhaseTag::Travelling);
        assert!(done.is_done());
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn fading_a_disposed_element_resolves() {
        let mut scene = Scene::new();
        let id = scene.insert(
            Element::new(
                ElementKind::Label { text: "x".into(), color: Rgb::WHITE },
                Surface::quad(1.0, 1.0),
                Vec3::ZERO,
            )
            .hidden(),
        );
        let mut c = Choreographer::new(1.5, 1.5);
        let done = c.fade_element(&mut scene, id, 1.0, 0.5, 0.0);
        scene.dispose(id);
        c.update(&mut scene, 0.1, PhaseTag::Narrating);
        assert!(done.is_done());
        assert!(c.is_idle());
    }

    #[test]
    fn new_fade_supersedes_old() {
        let mut scene = Scene::new();
        let mut c = Choreographer::new(1.5, 1.5);
        let first = c.fade_to(&mut scene, 1.0, 1.0, 0.0);
        let second = c.fade_to(&mut scene, 0.0, 1.0, 0.0);
        assert!(first.is_done());
        assert!(!second.is_done());
    }
}
