/// Entry point and frame loop.
///
/// Startup order: config → log file → story and font (fatal on failure) →
/// sound, video player, orchestrator → terminal. The loop drains keyboard
/// and gamepad input, forwards video-ended, ticks the orchestrator at the
/// configured rate with one sampled `now`, routes its events to sound and
/// video, and renders.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::font::Font;
use domain::story::Story;
use sim::assets::FileAssets;
use sim::clock::{Clock, MonotonicClock};
use sim::event::NarrativeEvent;
use sim::narration::AudioBackend;
use sim::orchestrator::Orchestrator;
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::{NarrationBackend, SoundEngine};
use ui::video::VideoPlayer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const MSG_LOAD_FAILED: &str = "Error: Failed to load resources.";

fn main() -> Result<()> {
    let config = GameConfig::load();
    init_logging(&config);
    info!("twinreel v{}", env!("CARGO_PKG_VERSION"));
    for w in &config.warnings {
        warn!("{w}");
    }

    let story = load_story(&config)?;
    let font = match load_font(&config) {
        Ok(font) => font,
        Err(e) => {
            eprintln!("{MSG_LOAD_FAILED}");
            return Err(e);
        }
    };
    info!(levels = story.len(), "story ready");

    let root = config.general.asset_root.clone();
    let sound = SoundEngine::new();
    let audio = match &sound {
        Some(s) => s.narration_backend(root.clone()),
        None => NarrationBackend::unavailable(root.clone()),
    };
    let mut video = VideoPlayer::new(&config.video);
    let mut orch = Orchestrator::new(
        story,
        font,
        config.timing.clone(),
        config.particles.clone(),
        audio,
        Box::new(FileAssets::new(root)),
        rand::random(),
    );

    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let result = run(&mut orch, &mut renderer, sound.as_ref(), &mut video, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    video.stop();
    if let Some(s) = &sound {
        s.stop_ambient();
    }
    let stats = orch.shutdown();
    result?;

    println!();
    println!("Levels played: {}  Choices made: {}", stats.level_loads, stats.choices.len());
    Ok(())
}

/// Log to the configured file; the terminal belongs to the renderer.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.general.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled, cannot create {}: {e}", config.general.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("twinreel=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn load_story(config: &GameConfig) -> Result<Story> {
    match &config.general.story {
        Some(path) => {
            info!(path = %path.display(), "loading story");
            Story::load(path).with_context(|| format!("story {}", path.display()))
        }
        None => {
            info!("no story file found, using the built-in story");
            Ok(Story::embedded())
        }
    }
}

fn load_font(config: &GameConfig) -> Result<Font> {
    match &config.general.font {
        Some(path) => Font::load(path).with_context(|| format!("font {}", path.display())),
        None => Ok(Font::builtin()),
    }
}

fn run<A: AudioBackend>(
    orch: &mut Orchestrator<A>,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    video: &mut VideoPlayer,
    config: &GameConfig,
) -> Result<()> {
    let clock = MonotonicClock::new();
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.general.tick_rate_ms.max(1));
    let mut last_tick = Instant::now();

    orch.set_aspect(renderer.aspect());
    orch.begin(clock.now());

    loop {
        kb.drain_events();
        gp.update();

        let now = clock.now();
        let mut commands = kb.commands().to_vec();
        commands.extend(gp.commands());
        if commands.contains(&Command::Quit) {
            info!(phase = %orch.phase().tag(), video = video.is_playing(), "quit requested");
            break;
        }
        for cmd in commands {
            if let Command::Key(key) = cmd {
                orch.handle_input(key, now);
            }
        }

        if video.poll_ended() {
            orch.on_video_ended(now);
        }

        if last_tick.elapsed() >= tick_rate {
            orch.set_aspect(renderer.aspect());
            let events = orch.tick(now);
            dispatch(&events, sound, video);
            if events.contains(&NarrativeEvent::Finished) {
                info!(choices = orch.stats().choices.len(), "story finished");
            }
            last_tick = Instant::now();
        }

        renderer.render(&orch.frame()).context("render failed")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn dispatch(events: &[NarrativeEvent], sound: Option<&SoundEngine>, video: &mut VideoPlayer) {
    for event in events {
        match event {
            NarrativeEvent::PlayVideo { video: id, .. } => video.play(id),
            NarrativeEvent::SelectCue => {
                if let Some(s) = sound {
                    s.play_select();
                }
            }
            NarrativeEvent::DissolveCue => {
                if let Some(s) = sound {
                    s.play_dissolve();
                }
            }
            NarrativeEvent::AmbientStart => {
                if let Some(s) = sound {
                    s.start_ambient();
                }
            }
            _ => {}
        }
    }
}
