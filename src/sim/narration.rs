/// Narration coordinator.
///
/// Wraps one narration clip's lifecycle behind a single "ended" signal that
/// resolves exactly once, whatever happens: natural end, load failure,
/// start failure, or a manual `stop()`. A missing reference ends at once
/// without touching the backend.
///
/// Playback starts a short delay after `play`, and only if the clip is
/// still pending by then: a `stop()` in between wins. A start that fails
/// with `StartRace` is retried once.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::sim::signal::Completion;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output is not available")]
    Unavailable,
    #[error("could not open {reference}: {source}")]
    Io { reference: String, #[source] source: std::io::Error },
    #[error("could not decode {reference}: {reason}")]
    Decode { reference: String, reason: String },
    #[error("clip was not ready to start")]
    StartRace,
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Audio output as seen by the narrator.
pub trait AudioBackend {
    type Clip;

    fn load(&mut self, reference: &str) -> Result<Self::Clip, AudioError>;
    fn start(&mut self, clip: &mut Self::Clip) -> Result<(), AudioError>;
    fn is_finished(&self, clip: &Self::Clip) -> bool;
    fn stop(&mut self, clip: Self::Clip);
}

enum Playback<C> {
    Idle,
    Pending { clip: C, start_at: f64, retried: bool },
    Playing { clip: C },
}

pub struct Narrator<B: AudioBackend> {
    backend: B,
    playback: Playback<B::Clip>,
    ended: Option<Completion>,
    start_delay: f64,
    retry_delay: f64,
}

impl<B: AudioBackend> Narrator<B> {
    pub fn new(backend: B, timing: &TimingConfig) -> Self {
        Narrator {
            backend,
            playback: Playback::Idle,
            ended: None,
            start_delay: timing.narration_start_delay_ms as f64 / 1000.0,
            retry_delay: timing.narration_retry_delay_ms as f64 / 1000.0,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.playback, Playback::Idle)
    }

    /// Start narrating `reference`. Any previous narration is stopped first.
    pub fn play(&mut self, reference: Option<&str>, now: f64) -> Completion {
        self.stop();
        let ended = Completion::new();

        let Some(reference) = reference else {
            debug!("no narration for this level");
            ended.resolve();
            return ended;
        };

        match self.backend.load(reference) {
            Ok(clip) => {
                info!(reference, "narration loaded");
                self.playback = Playback::Pending { clip, start_at: now + self.start_delay, retried: false };
                self.ended = Some(ended.clone());
            }
            Err(e) => {
                warn!(reference, error = %e, "narration failed to load, skipping");
                ended.resolve();
            }
        }
        ended
    }

    pub fn update(&mut self, now: f64) {
        self.playback = match std::mem::replace(&mut self.playback, Playback::Idle) {
            Playback::Idle => Playback::Idle,
            Playback::Pending { clip, start_at, retried } if now < start_at => {
                Playback::Pending { clip, start_at, retried }
            }
            Playback::Pending { mut clip, retried, .. } => match self.backend.start(&mut clip) {
                Ok(()) => {
                    debug!("narration playing");
                    Playback::Playing { clip }
                }
                Err(AudioError::StartRace) if !retried => {
                    warn!("narration start raced, retrying once");
                    Playback::Pending { clip, start_at: now + self.retry_delay, retried: true }
                }
                Err(e) => {
                    warn!(error = %e, "narration failed to start");
                    self.backend.stop(clip);
                    self.finish();
                    Playback::Idle
                }
            },
            Playback::Playing { clip } => {
                if self.backend.is_finished(&clip) {
                    debug!("narration ended");
                    self.backend.stop(clip);
                    self.finish();
                    Playback::Idle
                } else {
                    Playback::Playing { clip }
                }
            }
        };
    }

    /// Interrupt narration. Resolves the ended signal if still pending.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.playback, Playback::Idle) {
            Playback::Pending { clip, .. } | Playback::Playing { clip } => {
                debug!("narration stopped");
                self.backend.stop(clip);
            }
            Playback::Idle => {}
        }
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(ended) = self.ended.take() {
            ended.resolve();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use super::*;

    #[derive(Default, Debug)]
    pub struct AudioScript {
        /// References that fail to load.
        pub missing: HashSet<String>,
        /// Number of `StartRace` failures before a start succeeds.
        pub start_races: HashMap<String, u32>,
        /// References whose start fails outright.
        pub broken: HashSet<String>,
        /// Clips report finished as soon as they start.
        pub finish_immediately: bool,
        /// References that have reached their natural end.
        pub finished: HashSet<String>,
        pub loads: Vec<String>,
        pub starts: Vec<String>,
        pub stops: Vec<String>,
    }

    /// Backend driven entirely by a shared script.
    #[derive(Clone, Default)]
    pub struct ScriptedAudio {
        pub script: Rc<RefCell<AudioScript>>,
    }

    pub struct ScriptedClip {
        reference: String,
        started: bool,
    }

    impl ScriptedAudio {
        pub fn finishing() -> Self {
            let audio = ScriptedAudio::default();
            audio.script.borrow_mut().finish_immediately = true;
            audio
        }
    }

    impl AudioBackend for ScriptedAudio {
        type Clip = ScriptedClip;

        fn load(&mut self, reference: &str) -> Result<ScriptedClip, AudioError> {
            let mut s = self.script.borrow_mut();
            s.loads.push(reference.to_string());
            if s.missing.contains(reference) {
                return Err(AudioError::Io {
                    reference: reference.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(ScriptedClip { reference: reference.to_string(), started: false })
        }

        fn start(&mut self, clip: &mut ScriptedClip) -> Result<(), AudioError> {
            let mut s = self.script.borrow_mut();
            if s.broken.contains(&clip.reference) {
                return Err(AudioError::Playback("scripted failure".into()));
            }
            if let Some(n) = s.start_races.get_mut(&clip.reference) {
                if *n > 0 {
                    *n -= 1;
                    return Err(AudioError::StartRace);
                }
            }
            clip.started = true;
            s.starts.push(clip.reference.clone());
            Ok(())
        }

        fn is_finished(&self, clip: &ScriptedClip) -> bool {
            let s = self.script.borrow();
            clip.started && (s.finish_immediately || s.finished.contains(&clip.reference))
        }

        fn stop(&mut self, clip: ScriptedClip) {
            self.script.borrow_mut().stops.push(clip.reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedAudio;
    use super::*;

    fn narrator(audio: &ScriptedAudio) -> Narrator<ScriptedAudio> {
        Narrator::new(audio.clone(), &TimingConfig::default())
    }

    #[test]
    fn missing_reference_ends_without_playback() {
        let audio = ScriptedAudio::default();
        let mut n = narrator(&audio);
        let ended = n.play(None, 0.0);
        assert!(ended.is_done());
        assert!(!n.is_active());
        assert!(audio.script.borrow().loads.is_empty());
    }

    #[test]
    fn natural_end_resolves_once() {
        let audio = ScriptedAudio::default();
        let mut n = narrator(&audio);
        let ended = n.play(Some("a.ogg"), 0.0);
        n.update(0.01);
        assert!(audio.script.borrow().starts.is_empty());
        n.update(0.06);
        assert_eq!(audio.script.borrow().starts, vec!["a.ogg"]);
        assert!(!ended.is_done());

        audio.script.borrow_mut().finished.insert("a.ogg".into());
        n.update(0.1);
        assert!(ended.is_done());
        assert!(!n.is_active());
        n.stop();
        assert!(!ended.resolve());
    }

    #[test]
    fn stop_right_after_play_ends_once_and_never_starts() {
        let audio = ScriptedAudio::default();
        let mut n = narrator(&audio);
        let ended = n.play(Some("a.ogg"), 0.0);
        n.stop();
        assert!(ended.is_done());
        n.update(1.0);
        n.stop();
        let s = audio.script.borrow();
        assert!(s.starts.is_empty());
        assert_eq!(s.stops, vec!["a.ogg"]);
    }

    #[test]
    fn load_failure_ends_immediately() {
        let audio = ScriptedAudio::default();
        audio.script.borrow_mut().missing.insert("bad.ogg".into());
        let mut n = narrator(&audio);
        assert!(n.play(Some("bad.ogg"), 0.0).is_done());
        assert!(!n.is_active());
    }

    #[test]
    fn start_race_is_retried_once() {
        let audio = ScriptedAudio::default();
        audio.script.borrow_mut().start_races.insert("a.ogg".into(), 1);
        let mut n = narrator(&audio);
        let ended = n.play(Some("a.ogg"), 0.0);
        n.update(0.05);
        assert!(audio.script.borrow().starts.is_empty());
        n.update(0.1);
        assert!(audio.script.borrow().starts.is_empty());
        n.update(0.16);
        assert_eq!(audio.script.borrow().starts, vec!["a.ogg"]);
        assert!(!ended.is_done());
    }

    #[test]
    fn second_start_race_gives_up_and_ends() {
        let audio = ScriptedAudio::default();
        audio.script.borrow_mut().start_races.insert("a.ogg".into(), 2);
        let mut n = narrator(&audio);
        let ended = n.play(Some("a.ogg"), 0.0);
        n.update(0.05);
        n.update(0.2);
        assert!(ended.is_done());
        assert!(audio.script.borrow().starts.is_empty());
    }

    #[test]
    fn playback_failure_ends() {
        let audio = ScriptedAudio::default();
        audio.script.borrow_mut().broken.insert("a.ogg".into());
        let mut n = narrator(&audio);
        let ended = n.play(Some("a.ogg"), 0.0);
        n.update(0.05);
        assert!(ended.is_done());
    }

    #[test]
    fn replaying_resolves_previous_narration() {
        let audio = ScriptedAudio::default();
        let mut n = narrator(&audio);
        let first = n.play(Some("a.ogg"), 0.0);
        let second = n.play(Some("b.ogg"), 0.0);
        assert!(first.is_done());
        assert!(!second.is_done());
    }
}
