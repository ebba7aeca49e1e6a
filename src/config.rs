/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD, or the
/// data directories. Falls back to sensible defaults if the file is missing
/// or incomplete. Problems are collected in `warnings` and logged once the
/// log file is open.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub general: GeneralConfig,
    pub timing: TimingConfig,
    pub particles: ParticleConfig,
    pub video: VideoConfig,
    pub gamepad: GamepadConfig,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    /// Resolved story file, or `None` to use the embedded story.
    pub story: Option<PathBuf>,
    /// Resolved bitmap font, or `None` for the built-in font.
    pub font: Option<PathBuf>,
    pub log_file: PathBuf,
    pub tick_rate_ms: u64,
    /// Root for thumbnail references.
    pub asset_root: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub zoom_secs: f64,
    pub reset_secs: f64,
    pub fade_to_black_secs: f64,
    pub final_fade_secs: f64,
    pub end_fade_in_secs: f64,
    pub end_frame_stay_ms: u64,
    pub panel_fade_ms: u64,
    pub description_fade_ms: u64,
    pub narration_start_delay_ms: u64,
    pub narration_retry_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ParticleConfig {
    pub speed: f32,
    pub fade_rate: f32,
    pub dissolve_ms: u64,
    pub default_count: usize,
    pub description_count: usize,
    pub timer_max_count: usize,
}

#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Argv template; `{id}` is replaced by the video reference.
    pub command: Vec<String>,
    pub simulated_secs: f64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub confirm: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    particles: TomlParticles,
    #[serde(default)]
    video: TomlVideo,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_story")]
    story: String,
    #[serde(default)]
    font: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_zoom")]
    zoom_secs: f64,
    #[serde(default = "default_reset")]
    reset_secs: f64,
    #[serde(default = "default_fade_to_black")]
    fade_to_black_secs: f64,
    #[serde(default = "default_final_fade")]
    final_fade_secs: f64,
    #[serde(default = "default_end_fade_in")]
    end_fade_in_secs: f64,
    #[serde(default = "default_end_frame_stay")]
    end_frame_stay_ms: u64,
    #[serde(default = "default_panel_fade")]
    panel_fade_ms: u64,
    #[serde(default = "default_description_fade")]
    description_fade_ms: u64,
    #[serde(default = "default_narration_delay")]
    narration_start_delay_ms: u64,
    #[serde(default = "default_narration_retry")]
    narration_retry_delay_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlParticles {
    #[serde(default = "default_speed")]
    speed: f32,
    #[serde(default = "default_fade_rate")]
    fade_rate: f32,
    #[serde(default = "default_dissolve_ms")]
    dissolve_ms: u64,
    #[serde(default = "default_count")]
    default_count: usize,
    #[serde(default = "default_description_count")]
    description_count: usize,
    #[serde(default = "default_timer_max_count")]
    timer_max_count: usize,
}

#[derive(Deserialize, Debug)]
struct TomlVideo {
    #[serde(default)]
    command: Vec<String>,
    #[serde(default = "default_simulated_secs")]
    simulated_secs: f64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_left")]
    left: Vec<String>,
    #[serde(default = "default_pad_right")]
    right: Vec<String>,
    #[serde(default = "default_pad_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_story() -> String { "story.toml".into() }
fn default_log_file() -> String { "twinreel.log".into() }
fn default_tick_rate() -> u64 { 16 }   // ~60 fps; particle motion is per tick

fn default_zoom() -> f64 { 1.5 }
fn default_reset() -> f64 { 1.5 }
fn default_fade_to_black() -> f64 { 0.5 }
fn default_final_fade() -> f64 { 1.0 }
fn default_end_fade_in() -> f64 { 1.5 }
fn default_end_frame_stay() -> u64 { 500 }
fn default_panel_fade() -> u64 { 500 }
fn default_description_fade() -> u64 { 1000 }
fn default_narration_delay() -> u64 { 50 }
fn default_narration_retry() -> u64 { 100 }

fn default_speed() -> f32 { 0.05 }
fn default_fade_rate() -> f32 { 0.008 }
fn default_dissolve_ms() -> u64 { 1500 }
fn default_count() -> usize { 5000 }
fn default_description_count() -> usize { 1000 }
fn default_timer_max_count() -> usize { 2000 }

fn default_simulated_secs() -> f64 { 4.0 }
const MAX_SIMULATED_SECS: f64 = 3600.0;

fn default_pad_left() -> Vec<String> { vec!["DPadLeft".into(), "LB".into()] }
fn default_pad_right() -> Vec<String> { vec!["DPadRight".into(), "RB".into()] }
fn default_pad_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            story: default_story(),
            font: String::new(),
            log_file: default_log_file(),
            tick_rate_ms: default_tick_rate(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            zoom_secs: default_zoom(),
            reset_secs: default_reset(),
            fade_to_black_secs: default_fade_to_black(),
            final_fade_secs: default_final_fade(),
            end_fade_in_secs: default_end_fade_in(),
            end_frame_stay_ms: default_end_frame_stay(),
            panel_fade_ms: default_panel_fade(),
            description_fade_ms: default_description_fade(),
            narration_start_delay_ms: default_narration_delay(),
            narration_retry_delay_ms: default_narration_retry(),
        }
    }
}

impl Default for TomlParticles {
    fn default() -> Self {
        TomlParticles {
            speed: default_speed(),
            fade_rate: default_fade_rate(),
            dissolve_ms: default_dissolve_ms(),
            default_count: default_count(),
            description_count: default_description_count(),
            timer_max_count: default_timer_max_count(),
        }
    }
}

impl Default for TomlVideo {
    fn default() -> Self {
        TomlVideo { command: Vec::new(), simulated_secs: default_simulated_secs() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            left: default_pad_left(),
            right: default_pad_right(),
            confirm: default_pad_confirm(),
            quit: default_pad_quit(),
        }
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            zoom_secs: t.zoom_secs,
            reset_secs: t.reset_secs,
            fade_to_black_secs: t.fade_to_black_secs,
            final_fade_secs: t.final_fade_secs,
            end_fade_in_secs: t.end_fade_in_secs,
            end_frame_stay_ms: t.end_frame_stay_ms,
            panel_fade_ms: t.panel_fade_ms,
            description_fade_ms: t.description_fade_ms,
            narration_start_delay_ms: t.narration_start_delay_ms,
            narration_retry_delay_ms: t.narration_retry_delay_ms,
        }
    }
}

impl From<TomlParticles> for ParticleConfig {
    fn from(p: TomlParticles) -> Self {
        ParticleConfig {
            speed: p.speed,
            fade_rate: p.fade_rate,
            dissolve_ms: p.dissolve_ms,
            default_count: p.default_count,
            description_count: p.description_count,
            timer_max_count: p.timer_max_count,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TomlTiming::default().into()
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        TomlParticles::default().into()
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = Vec::new();
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::from_toml(toml_cfg, search_dirs, warnings)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: Vec<PathBuf>, mut warnings: Vec<String>) -> Self {
        let general = &toml_cfg.general;

        let story = resolve_file(&general.story, &search_dirs);
        if story.is_none() {
            warnings.push(format!("story file '{}' not found, using the built-in story", general.story));
        }
        let font = if general.font.trim().is_empty() {
            None
        } else {
            // a configured font that cannot be found is still passed on, so
            // loading it fails loudly instead of silently using the built-in
            Some(resolve_file(&general.font, &search_dirs).unwrap_or_else(|| PathBuf::from(&general.font)))
        };
        let asset_root = story
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| search_dirs.first().cloned())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut tick_rate_ms = general.tick_rate_ms;
        if tick_rate_ms == 0 {
            warnings.push("tick_rate_ms must be positive, using 16".into());
            tick_rate_ms = default_tick_rate();
        }

        let mut simulated_secs = toml_cfg.video.simulated_secs;
        if !(0.0..=MAX_SIMULATED_SECS).contains(&simulated_secs) {
            warnings.push(format!(
                "simulated_secs must be between 0 and {MAX_SIMULATED_SECS}, using {}",
                default_simulated_secs()
            ));
            simulated_secs = default_simulated_secs();
        }

        let mut particles: ParticleConfig = toml_cfg.particles.into();
        if !(particles.fade_rate.is_finite() && particles.fade_rate > 0.0) {
            warnings.push(format!("fade_rate must be positive, using {}", default_fade_rate()));
            particles.fade_rate = default_fade_rate();
        }

        GameConfig {
            general: GeneralConfig {
                story,
                font,
                log_file: PathBuf::from(&general.log_file),
                tick_rate_ms,
                asset_root,
            },
            timing: toml_cfg.timing.into(),
            particles,
            video: VideoConfig {
                command: toml_cfg.video.command,
                simulated_secs,
            },
            gamepad: GamepadConfig {
                left: toml_cfg.gamepad.left,
                right: toml_cfg.gamepad.right,
                confirm: toml_cfg.gamepad.confirm,
                quit: toml_cfg.gamepad.quit,
            },
            warnings,
        }
    }
}

/// Resolve a possibly relative file name against the search directories.
fn resolve_file(name: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path.is_file().then_some(path);
    }
    search_dirs.iter().map(|d| d.join(&path)).find(|p| p.is_file())
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/twinreel)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/twinreel");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/twinreel)
    let sys = PathBuf::from("/usr/share/twinreel");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("{}: parse error, using defaults: {e}", path.display()));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}
