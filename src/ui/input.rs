/// Keyboard input tracker.
///
/// Turns crossterm key events into discrete commands for the narrative:
/// a key that is held only counts once (auto-repeat does not re-select or
/// re-commit). Terminals that report Release events end the hold
/// explicitly; elsewhere a hold expires after a short quiet period.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::sim::phase::Key;

/// After this long without a Press/Repeat event the key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// What one fresh key press means to the frame loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Key(Key),
    Quit,
}

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// Map one key to a command.
pub fn command_for(code: KeyCode, modifiers: KeyModifiers) -> Command {
    if modifiers.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c') | KeyCode::Char('C')) {
        return Command::Quit;
    }
    if KEYS_QUIT.contains(&code) {
        Command::Quit
    } else if KEYS_LEFT.contains(&code) {
        Command::Key(Key::Left)
    } else if KEYS_RIGHT.contains(&code) {
        Command::Key(Key::Right)
    } else if KEYS_CONFIRM.contains(&code) {
        Command::Key(Key::Enter)
    } else {
        Command::Key(Key::Other)
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Commands from keys that went "not held" → "held" during the most
    /// recent drain, in arrival order.
    fresh: Vec<Command>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.accept(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn accept(&mut self, key: KeyEvent, at: Instant) {
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self
                    .last_active
                    .get(&key.code)
                    .is_some_and(|t| at.duration_since(*t) < HOLD_TIMEOUT);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh.push(command_for(key.code, key.modifiers));
                }
            }
        }
    }

    /// Commands from this frame's fresh presses.
    pub fn commands(&self) -> &[Command] {
        &self.fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn arrows_enter_and_quit_map_to_commands() {
        assert_eq!(command_for(KeyCode::Left, KeyModifiers::NONE), Command::Key(Key::Left));
        assert_eq!(command_for(KeyCode::Char('d'), KeyModifiers::NONE), Command::Key(Key::Right));
        assert_eq!(command_for(KeyCode::Enter, KeyModifiers::NONE), Command::Key(Key::Enter));
        assert_eq!(command_for(KeyCode::Char('x'), KeyModifiers::NONE), Command::Key(Key::Other));
        assert_eq!(command_for(KeyCode::Esc, KeyModifiers::NONE), Command::Quit);
        assert_eq!(command_for(KeyCode::Char('c'), KeyModifiers::CONTROL), Command::Quit);
    }

    #[test]
    fn held_key_counts_once() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.accept(press(KeyCode::Right), t0);
        input.accept(press(KeyCode::Right), t0 + Duration::from_millis(30));
        assert_eq!(input.commands(), &[Command::Key(Key::Right)]);

        input.fresh.clear();
        input.accept(press(KeyCode::Right), t0 + Duration::from_millis(400));
        assert_eq!(input.commands(), &[Command::Key(Key::Right)]);
    }

    #[test]
    fn release_ends_hold_when_honored() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t0 = Instant::now();
        input.accept(press(KeyCode::Enter), t0);
        let mut release = press(KeyCode::Enter);
        release.kind = KeyEventKind::Release;
        input.accept(release, t0);
        input.accept(press(KeyCode::Enter), t0);
        assert_eq!(input.commands().len(), 2);
    }
}
