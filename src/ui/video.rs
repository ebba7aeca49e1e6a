/// External video playback.
///
/// The chosen video is played by an external command (`[video] command`,
/// with `{id}` replaced by the video reference). The process runs detached
/// from the terminal the renderer owns and is polled each frame for exit,
/// which is reported once as "ended". A player still running when playback
/// is replaced, stopped, or the player is dropped is killed and reaped.
/// With no command, or if the command cannot be started, playback is
/// simulated for `simulated_secs` so the story never stalls.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::VideoConfig;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("could not start video player `{program}`: {source}")]
    Spawn { program: String, #[source] source: std::io::Error },
}

enum Playback {
    Idle,
    Process { video: String, child: Child },
    Simulated { until: Instant },
}

pub struct VideoPlayer {
    command: Vec<String>,
    simulated: Duration,
    playback: Playback,
}

/// Program and arguments with `{id}` substituted, or None for an empty template.
pub fn build_command(template: &[String], video: &str) -> Option<(String, Vec<String>)> {
    let mut parts = template.iter().map(|p| p.replace("{id}", video));
    let program = parts.next().filter(|p| !p.trim().is_empty())?;
    Some((program, parts.collect()))
}

impl VideoPlayer {
    pub fn new(cfg: &VideoConfig) -> Self {
        VideoPlayer {
            command: cfg.command.clone(),
            simulated: Duration::try_from_secs_f64(cfg.simulated_secs.max(0.0)).unwrap_or(Duration::ZERO),
            playback: Playback::Idle,
        }
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self.playback, Playback::Idle)
    }

    fn spawn(&self, video: &str) -> Option<Result<Child, VideoError>> {
        let (program, args) = build_command(&self.command, video)?;
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| VideoError::Spawn { program, source });
        Some(child)
    }

    /// Start playing `video`. Any playback still running is stopped first.
    pub fn play(&mut self, video: &str) {
        self.stop();
        match self.spawn(video) {
            Some(Ok(child)) => {
                info!(video, pid = child.id(), "video player started");
                self.playback = Playback::Process { video: video.to_string(), child };
            }
            Some(Err(e)) => {
                warn!(video, error = %e, "falling back to simulated playback");
                self.simulate(video);
            }
            None => self.simulate(video),
        }
    }

    fn simulate(&mut self, video: &str) {
        info!(video, secs = self.simulated.as_secs_f64(), "simulated video playback");
        let now = Instant::now();
        self.playback = Playback::Simulated { until: now.checked_add(self.simulated).unwrap_or(now) };
    }

    /// Abandon the current playback without reporting an end.
    pub fn stop(&mut self) {
        if let Playback::Process { video, mut child } = std::mem::replace(&mut self.playback, Playback::Idle) {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    info!(video = %video, pid = child.id(), "stopping video player");
                    if let Err(e) = child.kill() {
                        warn!(video = %video, error = %e, "could not kill video player");
                    }
                    let _ = child.wait();
                }
            }
        }
    }

    /// True once, when the current playback has ended.
    pub fn poll_ended(&mut self) -> bool {
        let ended = match &mut self.playback {
            Playback::Idle => false,
            Playback::Simulated { until } => Instant::now() >= *until,
            Playback::Process { video, child } => match child.try_wait() {
                Ok(Some(status)) => {
                    info!(video = %video, %status, "video ended");
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    warn!(video = %video, error = %e, "lost track of video player");
                    true
                }
            },
        };
        if ended {
            self.playback = Playback::Idle;
        }
        ended
    }

    #[cfg(test)]
    fn pid(&self) -> Option<u32> {
        match &self.playback {
            Playback::Process { child, .. } => Some(child.id()),
            _ => None,
        }
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(command: &[&str], secs: f64) -> VideoPlayer {
        VideoPlayer::new(&VideoConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            simulated_secs: secs,
        })
    }

    #[test]
    fn id_is_substituted_everywhere() {
        let template = vec!["mpv".to_string(), "--fs".into(), "videos/{id}.mp4".into()];
        let (program, args) = build_command(&template, "door-leave").unwrap();
        assert_eq!(program, "mpv");
        assert_eq!(args, vec!["--fs", "videos/door-leave.mp4"]);
        assert!(build_command(&[], "x").is_none());
        assert!(build_command(&["  ".to_string()], "x").is_none());
    }

    #[test]
    fn empty_command_simulates_and_ends_once() {
        let mut p = player(&[], 0.0);
        assert!(!p.poll_ended());
        p.play("corridor-left");
        assert!(p.is_playing());
        assert!(p.poll_ended());
        assert!(!p.poll_ended());
        assert!(!p.is_playing());
    }

    #[test]
    fn spawn_failure_falls_back_to_simulation() {
        let mut p = player(&["/nonexistent/twinreel-player", "{id}"], 0.0);
        p.play("radio-answer");
        assert!(p.poll_ended());
    }

    #[test]
    fn simulated_playback_waits() {
        let mut p = player(&[], 30.0);
        p.play("x");
        assert!(!p.poll_ended());
        assert!(p.is_playing());
    }

    #[test]
    fn infinite_simulated_duration_does_not_panic() {
        let mut p = player(&[], f64::INFINITY);
        p.play("x");
        assert!(p.is_playing());
    }

    #[cfg(unix)]
    fn alive(pid: u32) -> bool {
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(unix)]
    #[test]
    fn dropping_the_player_kills_the_process() {
        let mut p = player(&["sleep", "30"], 30.0);
        p.play("x");
        let pid = p.pid().unwrap();
        assert!(alive(pid));
        drop(p);
        assert!(!alive(pid));
    }

    #[cfg(unix)]
    #[test]
    fn new_playback_replaces_the_running_one() {
        let mut p = player(&["sleep", "30"], 30.0);
        p.play("first");
        let first = p.pid().unwrap();
        p.play("second");
        assert!(!alive(first));
        assert!(!p.poll_ended());
        let second = p.pid().unwrap();
        p.stop();
        assert!(!p.is_playing());
        assert!(!alive(second));
        assert!(!p.poll_ended());
    }

    #[cfg(unix)]
    #[test]
    fn process_end_is_reported() {
        let mut p = player(&["true"], 30.0);
        p.play("x");
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ended = false;
        while Instant::now() < deadline {
            if p.poll_ended() {
                ended = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(ended);
    }
}
