/// Level orchestrator: the narrative state machine.
///
/// Owns the scene and every subsystem, and advances the `Phase` once per
/// tick from the completions the subsystems hand back. Input, countdown
/// timeouts and the external "video ended" event all enter through methods
/// that first check the current phase; a stale or duplicate event is
/// logged and dropped.
///
/// ## Per level
///   1. `loading_level`: panels + timer pre-built invisible, narration starts
///   2. `describing`: description fades in, holds, then dissolves
///   3. `narrating`: panels fade in once the description is gone; waits for
///      both the fade-in and the narration
///   4. `selection`: ← → highlight, Enter or timeout commits
///   5. `zooming`: loser + timer dissolve, zoom, fade to black, hand off video
///   6. `travelling`: end thumbnail, hold, dissolve + camera move, next level

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{ParticleConfig, TimingConfig};
use crate::domain::font::Font;
use crate::domain::math::{Lerp, Rgb, Vec3};
use crate::domain::story::{Side, Story};
use crate::domain::surface::Surface;
use crate::sim::assets::{self, AssetSource};
use crate::sim::choreo::{Choreographer, PANEL_HEIGHT, PANEL_WIDTH};
use crate::sim::event::NarrativeEvent;
use crate::sim::narration::{AudioBackend, Narrator};
use crate::sim::particles::{Dissolver, ParticleBurst};
use crate::sim::phase::{DescribeStep, Gates, Key, Listener, Phase, PhaseTag, TravelStep, ZoomStep};
use crate::sim::scene::{Element, ElementId, ElementKind, PanelVisual, Scene, CAMERA_Z};
use crate::sim::signal::Completion;
use crate::sim::starfield::Starfield;
use crate::sim::timer::{self, Countdown, BAR_HEIGHT};

// ── Layout ──

const PANEL_GAP: f32 = 0.8;
const PANEL_Y: f32 = 0.5;
const LEVEL_Z_SPACING: f32 = -15.0;
const BORDER_WIDTH: f32 = 0.05;
const SELECTED_SCALE: f32 = 1.1;
const SCALE_EASE: f32 = 0.1;
const PANEL_FLOAT_SPEEDS: (f32, f32) = (1.2, 1.3);
const FLOAT_AMPLITUDE: f32 = 0.1;
const TITLE_SIZE: f32 = 0.3;
const TITLE_OFFSET: f32 = -0.4;
const BIG_TEXT_SIZE: f32 = 1.9;
const BIG_TEXT_FLOAT_SPEED: f32 = 1.5;
const DESCRIPTION_SIZE: f32 = 0.4;
const DESCRIPTION_MAX_WIDTH: f32 = 8.0;
const DESCRIPTION_DEPTH: f32 = 0.8 * CAMERA_Z;

/// Chained phase steps allowed within one tick.
const MAX_STEPS_PER_TICK: usize = 8;

pub const START_TEXT: &str = "START";
pub const MSG_PRESS_ANY_KEY: &str = "Press any key to begin";
pub const MSG_CHOOSE: &str = "Use ← and → to choose. Press Enter to select.";
pub const MSG_LOOK_AROUND: &str = "Use ← and → to look around.";

/// Session counters, logged at shutdown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStats {
    pub level_loads: usize,
    pub timer_starts: usize,
    pub timer_stops: usize,
    pub video_requests: usize,
    /// (level, side, timed out)
    pub choices: Vec<(usize, Side, bool)>,
    pub end_reached: usize,
}

/// Visual instance of one level.
struct LevelInstance {
    left: ElementId,
    right: ElementId,
    countdown: Countdown,
}

impl LevelInstance {
    fn panel(&self, side: Side) -> ElementId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Everything the renderer needs for one frame.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub bursts: &'a [ParticleBurst],
    pub starfield: &'a Starfield,
    pub caption: &'a str,
}

enum Step {
    Idle,
    LoadLevel(usize),
    HoldDescription { level: usize, narration: Completion, until: f64 },
    DissolveDescription { level: usize, narration: Completion },
    Reveal(usize),
    EnterSelection(usize),
    PollTimer(usize),
    FadeToBlack { level: usize, side: Side },
    HandOff { level: usize, side: Side },
    Travel { level: usize, side: Side },
    Arrive(usize),
}

pub struct Orchestrator<A: AudioBackend> {
    story: Story,
    font: Font,
    timing: TimingConfig,
    scene: Scene,
    dissolver: Dissolver,
    choreo: Choreographer,
    narrator: Narrator<A>,
    assets: Box<dyn AssetSource>,
    starfield: Starfield,
    phase: Phase,
    selected: Side,
    levels: BTreeMap<usize, LevelInstance>,
    start_label: Option<ElementId>,
    description: Option<ElementId>,
    end_label: Option<(ElementId, f32)>,
    caption: String,
    events: Vec<NarrativeEvent>,
    stats: SessionStats,
}

impl<A: AudioBackend> Orchestrator<A> {
    pub fn new(
        story: Story,
        font: Font,
        timing: TimingConfig,
        particles: ParticleConfig,
        audio: A,
        assets: Box<dyn AssetSource>,
        seed: u64,
    ) -> Self {
        Orchestrator {
            narrator: Narrator::new(audio, &timing),
            choreo: Choreographer::new(timing.zoom_secs, timing.reset_secs),
            dissolver: Dissolver::new(particles, seed),
            starfield: Starfield::new(seed.wrapping_add(1)),
            story,
            font,
            timing,
            scene: Scene::new(),
            assets,
            phase: Phase::Loading,
            selected: Side::Left,
            levels: BTreeMap::new(),
            start_label: None,
            description: None,
            end_label: None,
            caption: String::new(),
            events: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    // ── Accessors ──

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[cfg(test)]
    pub fn selected(&self) -> Side {
        self.selected
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    #[cfg(test)]
    pub fn narrator(&self) -> &Narrator<A> {
        &self.narrator
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            scene: &self.scene,
            bursts: self.dissolver.bursts(),
            starfield: &self.starfield,
            caption: &self.caption,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.scene.camera.aspect = aspect;
        }
    }

    // ── Transitions ──

    fn enter(&mut self, next: Phase) {
        let from = self.phase.tag();
        let to = next.tag();
        info!(%from, %to, "phase");
        self.phase = next;
        self.events.push(NarrativeEvent::PhaseChanged { from, to });
    }

    fn set_caption(&mut self, text: &str) {
        if self.caption != text {
            self.caption = text.to_string();
            self.events.push(NarrativeEvent::Instructions(self.caption.clone()));
        }
    }

    /// Assets are ready: show the start label and wait for a key.
    pub fn begin(&mut self, _now: f64) {
        if !matches!(self.phase, Phase::Loading) {
            return;
        }
        let block = self.font.layout(START_TEXT, BIG_TEXT_SIZE, None);
        let label = Element::new(
            ElementKind::Label { text: START_TEXT.into(), color: Rgb::WHITE },
            block.surface,
            Vec3::ZERO,
        );
        self.start_label = Some(self.scene.insert(label));
        self.set_caption(MSG_PRESS_ANY_KEY);
        self.enter(Phase::Intro);
    }

    /// Deliver one key to the listener attached for the current phase.
    pub fn handle_input(&mut self, key: Key, now: f64) {
        match self.phase.listener() {
            Some(Listener::AnyKey) => self.on_start_key(now),
            Some(Listener::Choice) => match key {
                Key::Left => self.select(Side::Left),
                Key::Right => self.select(Side::Right),
                Key::Enter => self.commit_choice(false, now),
                Key::Other => {}
            },
            Some(Listener::LookAround) => match key {
                Key::Left => self.starfield.set_parallax(Side::Left),
                Key::Right => self.starfield.set_parallax(Side::Right),
                _ => {}
            },
            None => debug!(?key, phase = %self.phase.tag(), "input ignored"),
        }
    }

    fn on_start_key(&mut self, now: f64) {
        if !matches!(self.phase, Phase::Intro) {
            return;
        }
        self.events.push(NarrativeEvent::AmbientStart);
        let count = self.dissolver.config().default_count;
        let label = match self.start_label.take() {
            Some(id) => self.dissolver.dissolve(&mut self.scene, id, count, now),
            None => Completion::resolved(),
        };
        self.set_caption("");
        self.enter(Phase::Dissolving { label });
    }

    fn select(&mut self, side: Side) {
        self.selected = side;
        self.starfield.set_parallax(side);
        self.events.push(NarrativeEvent::SelectCue);
    }

    fn level_z(index: usize) -> f32 {
        index as f32 * LEVEL_Z_SPACING
    }

    /// Pre-build a level's panels and timer, invisible. An existing
    /// instance for the same index is removed first.
    fn build_level(&mut self, index: usize) {
        let Some(level) = self.story.level(index) else {
            return;
        };
        if let Some(stale) = self.levels.remove(&index) {
            debug!(level = index, "disposing stale level instance");
            self.dissolver.remove(&mut self.scene, stale.left);
            self.dissolver.remove(&mut self.scene, stale.right);
            self.dissolver.remove(&mut self.scene, stale.countdown.bar);
        }

        let z = Self::level_z(index);
        let mut ids = [None, None];
        for (slot, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            let option = level.option(side);
            let visual = PanelVisual {
                side,
                texture: assets::start_texture(self.assets.as_ref(), &option.thumbnail),
                end_texture: assets::end_texture(self.assets.as_ref(), option.end_thumbnail.as_deref()),
                border_width: BORDER_WIDTH,
                border_pulse: 1.0,
                interactive: false,
                selected: false,
                title: None,
            };
            let x = side.sign() * (PANEL_WIDTH / 2.0 + PANEL_GAP);
            let panel = Element::new(
                ElementKind::Panel(visual),
                Surface::quad(PANEL_WIDTH, PANEL_HEIGHT),
                Vec3::new(x, PANEL_Y, z),
            )
            .hidden();
            let id = self.scene.insert(panel);

            let block = self.font.layout(&option.title, TITLE_SIZE, None);
            let title = Element::new(
                ElementKind::Label { text: option.title.clone(), color: Rgb::WHITE },
                block.surface,
                Vec3::new(0.0, -PANEL_HEIGHT / 2.0 + TITLE_OFFSET, 0.0),
            );
            let title_id = self.scene.insert_child(id, title);
            if let Some(p) = self.scene.get_mut(id).and_then(Element::panel_mut) {
                p.title = title_id;
            }
            ids[slot] = Some(id);
        }
        let (Some(left), Some(right)) = (ids[0], ids[1]) else {
            return;
        };

        let width = timer::bar_width(PANEL_WIDTH, PANEL_GAP);
        let bar = Element::new(
            ElementKind::TimerBar { color: Rgb::GREEN },
            Surface::quad(width, BAR_HEIGHT),
            timer::bar_position(PANEL_Y, PANEL_HEIGHT, z),
        )
        .hidden();
        let bar = self.scene.insert(bar);
        let countdown = Countdown::new(bar, level.countdown_ms, width, 0.0);

        debug!(level = index, z, "level pre-built");
        self.levels.insert(index, LevelInstance { left, right, countdown });
    }

    /// Put the level's panels and timer in the scene and fade them in.
    fn reveal_level(&mut self, index: usize, now: f64) -> Vec<Completion> {
        let Some(inst) = self.levels.get(&index) else {
            return vec![Completion::resolved()];
        };
        let ids = [inst.left, inst.right, inst.countdown.bar];
        let secs = self.timing.panel_fade_ms as f64 / 1000.0;
        ids.into_iter()
            .map(|id| {
                if let Some(e) = self.scene.get_mut(id) {
                    e.in_scene = true;
                }
                self.choreo.fade_element(&mut self.scene, id, 1.0, secs, now)
            })
            .collect()
    }

    fn load_level(&mut self, index: usize, now: f64) {
        let Some(level) = self.story.level(index).cloned() else {
            info!(level = index, "no more levels");
            self.show_end_screen(now);
            return;
        };
        self.enter(Phase::LoadingLevel { level: index });
        self.stats.level_loads += 1;
        info!(level = index, "loading level");

        if !self.levels.contains_key(&index) {
            self.build_level(index);
        }
        self.set_caption("");
        let narration = self.narrator.play(level.narration_ref(), now);

        match level.description_text() {
            Some(text) => {
                let cam = self.scene.camera;
                let block = self.font.layout(text, DESCRIPTION_SIZE, Some(DESCRIPTION_MAX_WIDTH));
                let mut label = Element::new(
                    ElementKind::Label { text: text.to_string(), color: Rgb::GREY },
                    block.surface,
                    Vec3::new(cam.home.x, cam.home.y, cam.position.z - DESCRIPTION_DEPTH),
                );
                label.opacity = 0.0;
                let id = self.scene.insert(label);
                self.description = Some(id);
                let secs = self.timing.description_fade_ms as f64 / 1000.0;
                let fade = self.choreo.fade_element(&mut self.scene, id, 1.0, secs, now);
                self.enter(Phase::Describing {
                    level: index,
                    step: DescribeStep::FadingIn(fade),
                    narration,
                });
            }
            None => self.enter(Phase::Narrating {
                level: index,
                gates: Gates { narration, description: Completion::resolved(), reveal: None },
            }),
        }
    }

    fn enter_selection(&mut self, index: usize, now: f64) {
        let Some(inst) = self.levels.get_mut(&index) else {
            warn!(level = index, "level instance missing at selection, ending");
            self.show_end_screen(now);
            return;
        };
        inst.countdown.start(now);
        for id in [inst.left, inst.right] {
            if let Some(p) = self.scene.get_mut(id).and_then(Element::panel_mut) {
                p.interactive = true;
            }
        }
        self.stats.timer_starts += 1;
        self.set_caption(MSG_CHOOSE);
        self.enter(Phase::Selection { level: index });
    }

    /// Finalize the highlighted choice. Only acts in `selection`; Enter and
    /// countdown timeout both land here.
    pub fn commit_choice(&mut self, is_timeout: bool, now: f64) {
        let Phase::Selection { level } = self.phase else {
            debug!(timeout = is_timeout, phase = %self.phase.tag(), "stale choice ignored");
            return;
        };
        let side = self.selected;
        let Some(inst) = self.levels.get_mut(&level) else {
            warn!(level, "choice committed without a level instance");
            return;
        };
        let chosen = inst.panel(side);
        let loser = inst.panel(side.opposite());

        self.narrator.stop();
        inst.countdown.cancel(now, is_timeout, &mut self.scene, &mut self.dissolver);
        self.stats.timer_stops += 1;

        let count = self.dissolver.config().default_count;
        self.dissolver.dissolve(&mut self.scene, loser, count, now);

        let title = self.scene.get_mut(chosen).and_then(Element::panel_mut).and_then(|p| {
            p.interactive = false;
            p.title.take()
        });
        if let Some(title) = title {
            self.dissolver.remove(&mut self.scene, title);
        }

        let zoom = self.choreo.zoom_to_panel(&self.scene, chosen, now, Some(PhaseTag::Zooming));

        info!(level, side = side.as_str(), timeout = is_timeout, "choice committed");
        self.stats.choices.push((level, side, is_timeout));
        self.events.push(NarrativeEvent::ChoiceCommitted { level, side, timeout: is_timeout });
        self.set_caption("");
        self.enter(Phase::Zooming { level, side, step: ZoomStep::Zooming(zoom) });
    }

    /// External video finished. Only acts while awaiting the video.
    pub fn on_video_ended(&mut self, now: f64) {
        let Phase::AwaitingVideo { level, side } = self.phase else {
            warn!(phase = %self.phase.tag(), "stale video-ended event ignored");
            return;
        };
        let chosen = self.levels.get(&level).map(|inst| inst.panel(side));
        if let Some(panel) = chosen.and_then(|id| self.scene.get_mut(id)).and_then(Element::panel_mut) {
            if !panel.swap_to_end() {
                info!(level, "no end thumbnail, keeping start thumbnail");
            }
        }
        self.choreo.fade_to(&mut self.scene, 0.0, 0.0, now);
        let until = now + self.timing.end_frame_stay_ms as f64 / 1000.0;
        self.enter(Phase::Travelling { level, side, step: TravelStep::Holding { until } });
    }

    fn show_end_screen(&mut self, now: f64) {
        if matches!(self.phase, Phase::End) {
            return;
        }
        let cam = self.scene.camera.position;
        let text = self.story.end_text.clone();
        let block = self.font.layout(&text, BIG_TEXT_SIZE, None);
        let label = Element::new(
            ElementKind::Label { text, color: Rgb::WHITE },
            block.surface,
            Vec3::new(cam.x, cam.y, cam.z - CAMERA_Z),
        );
        self.end_label = Some((self.scene.insert(label), cam.y));
        self.choreo.fade_to(&mut self.scene, 0.0, self.timing.end_fade_in_secs, now);

        self.stats.end_reached += 1;
        info!("end of story");
        self.set_caption(MSG_LOOK_AROUND);
        self.enter(Phase::End);
        self.events.push(NarrativeEvent::Finished);
    }

    // ── Per-frame ──

    pub fn tick(&mut self, now: f64) -> Vec<NarrativeEvent> {
        self.narrator.update(now);
        self.choreo.update(&mut self.scene, now, self.phase.tag());
        self.dissolver.update(now);
        self.starfield.update();
        self.animate(now);

        for _ in 0..MAX_STEPS_PER_TICK {
            if !self.advance(now) {
                break;
            }
        }

        for _ in 0..self.dissolver.take_cues() {
            self.events.push(NarrativeEvent::DissolveCue);
        }
        std::mem::take(&mut self.events)
    }

    fn animate(&mut self, now: f64) {
        let t = now as f32;
        let bob = |speed: f32| (t * speed).sin() * FLOAT_AMPLITUDE;
        match self.phase {
            Phase::Intro => {
                if let Some(e) = self.start_label.and_then(|id| self.scene.get_mut(id)) {
                    e.position.y = bob(BIG_TEXT_FLOAT_SPEED);
                }
            }
            Phase::Selection { level } => {
                let Some(inst) = self.levels.get(&level) else { return };
                for side in [Side::Left, Side::Right] {
                    let Some(e) = self.scene.get_mut(inst.panel(side)) else { continue };
                    let speed = match side {
                        Side::Left => PANEL_FLOAT_SPEEDS.0,
                        Side::Right => PANEL_FLOAT_SPEEDS.1,
                    };
                    e.position.y = PANEL_Y + bob(speed);
                    let selected = side == self.selected;
                    let target = if selected { SELECTED_SCALE } else { 1.0 };
                    e.scale = Vec3::lerp(e.scale, Vec3::new(target, target, 1.0), SCALE_EASE);
                    if let Some(p) = e.panel_mut() {
                        p.selected = selected;
                        p.border_pulse = 0.6 + 0.4 * (t * 8.0).sin();
                    }
                }
            }
            Phase::End => {
                if let Some((id, base_y)) = self.end_label {
                    if let Some(e) = self.scene.get_mut(id) {
                        e.position.y = base_y + bob(BIG_TEXT_FLOAT_SPEED);
                    }
                }
            }
            _ => {}
        }
    }

    fn next_step(&self, now: f64) -> Step {
        match &self.phase {
            Phase::Dissolving { label } if label.is_done() => Step::LoadLevel(0),
            Phase::Describing { level, step: DescribeStep::FadingIn(fade), narration } if fade.is_done() => {
                let stay = self.story.level(*level).map_or(0, |l| l.description_stay_ms);
                Step::HoldDescription {
                    level: *level,
                    narration: narration.clone(),
                    until: now + stay as f64 / 1000.0,
                }
            }
            Phase::Describing { level, step: DescribeStep::Holding { until }, narration } if now >= *until => {
                Step::DissolveDescription { level: *level, narration: narration.clone() }
            }
            Phase::Narrating { level, gates } if gates.reveal.is_none() && gates.description.is_done() => {
                Step::Reveal(*level)
            }
            Phase::Narrating { level, gates } if gates.open() => Step::EnterSelection(*level),
            Phase::Selection { level } => Step::PollTimer(*level),
            Phase::Zooming { level, side, step: ZoomStep::Zooming(zoom) } if zoom.is_done() => {
                Step::FadeToBlack { level: *level, side: *side }
            }
            Phase::Zooming { level, side, step: ZoomStep::Fading(fade) } if fade.is_done() => {
                Step::HandOff { level: *level, side: *side }
            }
            Phase::Travelling { level, side, step: TravelStep::Holding { until } } if now >= *until => {
                Step::Travel { level: *level, side: *side }
            }
            Phase::Travelling { level, step: TravelStep::Moving { camera, dissolve }, .. }
                if camera.is_done() && dissolve.is_done() =>
            {
                Step::Arrive(*level)
            }
            _ => Step::Idle,
        }
    }

    /// Take at most one phase step. Returns true if anything moved.
    fn advance(&mut self, now: f64) -> bool {
        match self.next_step(now) {
            Step::Idle => false,
            Step::LoadLevel(index) => {
                self.load_level(index, now);
                true
            }
            Step::HoldDescription { level, narration, until } => {
                self.phase = Phase::Describing { level, step: DescribeStep::Holding { until }, narration };
                true
            }
            Step::DissolveDescription { level, narration } => {
                let count = self.dissolver.config().description_count;
                let description = match self.description.take() {
                    Some(id) => self.dissolver.dissolve(&mut self.scene, id, count, now),
                    None => Completion::resolved(),
                };
                self.enter(Phase::Narrating { level, gates: Gates { narration, description, reveal: None } });
                true
            }
            Step::Reveal(level) => {
                let fades = self.reveal_level(level, now);
                if let Phase::Narrating { gates, .. } = &mut self.phase {
                    gates.reveal = Some(fades);
                }
                true
            }
            Step::EnterSelection(level) => {
                self.enter_selection(level, now);
                true
            }
            Step::PollTimer(level) => {
                let timed_out = match self.levels.get_mut(&level) {
                    Some(inst) => inst.countdown.update(now, &mut self.scene),
                    None => false,
                };
                if timed_out {
                    info!(level, "countdown ran out");
                    self.commit_choice(true, now);
                }
                timed_out
            }
            Step::FadeToBlack { level, side } => {
                let fade = self.choreo.fade_to(&mut self.scene, 1.0, self.timing.fade_to_black_secs, now);
                self.phase = Phase::Zooming { level, side, step: ZoomStep::Fading(fade) };
                true
            }
            Step::HandOff { level, side } => {
                let video = self.story.level(level).map(|l| l.option(side).video.clone());
                match video {
                    Some(video) => {
                        info!(level, side = side.as_str(), video = %video, "handing off to video player");
                        self.stats.video_requests += 1;
                        self.events.push(NarrativeEvent::PlayVideo { level, side, video });
                    }
                    None => warn!(level, "no video for chosen option"),
                }
                self.enter(Phase::AwaitingVideo { level, side });
                true
            }
            Step::Travel { level, side } => {
                let next = level + 1;
                let camera = if self.story.level(next).is_some() {
                    self.build_level(next);
                    let target_z = Self::level_z(next) + CAMERA_Z;
                    self.choreo.reset_camera(&self.scene, target_z, now)
                } else {
                    self.choreo.fade_to(&mut self.scene, 1.0, self.timing.final_fade_secs, now)
                };
                let count = self.dissolver.config().default_count;
                let dissolve = match self.levels.get(&level).map(|inst| inst.panel(side)) {
                    Some(id) => self.dissolver.dissolve(&mut self.scene, id, count, now),
                    None => Completion::resolved(),
                };
                self.phase = Phase::Travelling { level, side, step: TravelStep::Moving { camera, dissolve } };
                true
            }
            Step::Arrive(level) => {
                let next = level + 1;
                if self.story.level(next).is_some() {
                    self.load_level(next, now);
                } else {
                    self.show_end_screen(now);
                }
                true
            }
        }
    }

    /// Stop narration and release every element and retained level.
    pub fn shutdown(&mut self) -> SessionStats {
        if self.narrator.is_active() {
            debug!("stopping narration");
        }
        self.narrator.stop();
        self.choreo.clear();
        let levels = std::mem::take(&mut self.levels);
        for inst in levels.into_values() {
            self.dissolver.remove(&mut self.scene, inst.left);
            self.dissolver.remove(&mut self.scene, inst.right);
            self.dissolver.remove(&mut self.scene, inst.countdown.bar);
        }
        let labels = [self.start_label.take(), self.description.take(), self.end_label.take().map(|(id, _)| id)];
        for id in labels.into_iter().flatten() {
            self.dissolver.remove(&mut self.scene, id);
        }
        self.dissolver.clear();

        let s = &self.stats;
        info!(
            levels_loaded = s.level_loads,
            timer_cycles = s.timer_stops,
            choices = s.choices.len(),
            videos = s.video_requests,
            finished = s.end_reached > 0,
            "session summary"
        );
        self.stats.clone()
    }
}
