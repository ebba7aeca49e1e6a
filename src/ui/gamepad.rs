/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad left / LB / stick left     →  Look / choose left
///   D-pad right / RB / stick right   →  Look / choose right
///   A / Start                        →  Confirm
///   Select                           →  Quit
/// Any other button counts as "any key" on the start screen.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
use tracing::debug;
#[cfg(feature = "gamepad")]
use tracing::info;

use crate::config::GamepadConfig;
use crate::sim::phase::Key;
use crate::ui::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

const BTN_COUNT: usize = 10;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    Start,
    Select,
    DPadLeft,
    DPadRight,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            "DPADLEFT" | "LEFT" => Some(Btn::DPadLeft),
            "DPADRIGHT" | "RIGHT" => Some(Btn::DPadRight),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            Button::DPadLeft  => Some(Btn::DPadLeft),
            Button::DPadRight => Some(Btn::DPadRight),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    left: Vec<Btn>,
    right: Vec<Btn>,
    confirm: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            left:    vec![Btn::DPadLeft, Btn::L1],
            right:   vec![Btn::DPadRight, Btn::R1],
            confirm: vec![Btn::A, Btn::Start],
            quit:    vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    stick_left: BtnState,
    stick_right: BtnState,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,

    action_map: ActionMap,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                if g.gamepads().next().is_some() {
                    info!("gamepad found");
                }
                Some(g)
            }
            Err(e) => {
                info!(error = %e, "gamepad support unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            stick_left: BtnState::default(),
            stick_right: BtnState::default(),
            stick_x: 0.0,
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an
    /// action whose list parses empty keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names
                .iter()
                .filter_map(|s| {
                    let btn = Btn::from_name(s);
                    if btn.is_none() {
                        debug!(name = %s, "unknown gamepad button name");
                    }
                    btn
                })
                .collect()
        }
        let map = &mut self.action_map;
        let l = parse_list(&cfg.left);
        if !l.is_empty() { map.left = l; }
        let r = parse_list(&cfg.right);
        if !r.is_empty() { map.right = r; }
        let c = parse_list(&cfg.confirm);
        if !c.is_empty() { map.confirm = c; }
        let q = parse_list(&cfg.quit);
        if !q.is_empty() { map.quit = q; }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => {
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    self.stick_x = value;
                }
                EventType::Connected => info!("gamepad connected"),
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.release_all();
                }
                _ => {}
            }
        }

        let prev_left = self.stick_left.held;
        let prev_right = self.stick_right.held;
        self.stick_left.held = self.stick_x < -STICK_DEADZONE;
        self.stick_right.held = self.stick_x > STICK_DEADZONE;
        if self.stick_left.held && !prev_left { self.stick_left.just_pressed = true; }
        if self.stick_right.held && !prev_right { self.stick_right.just_pressed = true; }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.press(btn, held);
        }
    }

    fn press(&mut self, btn: Btn, held: bool) {
        let state = &mut self.buttons[btn_index(btn)];
        if held && !state.held {
            state.just_pressed = true;
        }
        state.held = held;
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    /// Commands from this frame's fresh presses. At most one per action.
    pub fn commands(&self) -> Vec<Command> {
        let map = &self.action_map;
        let mut out = Vec::new();
        if self.any_just_pressed(&map.quit) {
            out.push(Command::Quit);
        }
        if self.any_just_pressed(&map.left) || self.stick_left.just_pressed {
            out.push(Command::Key(Key::Left));
        }
        if self.any_just_pressed(&map.right) || self.stick_right.just_pressed {
            out.push(Command::Key(Key::Right));
        }
        if self.any_just_pressed(&map.confirm) {
            out.push(Command::Key(Key::Enter));
        }
        if out.is_empty() && self.buttons.iter().any(|b| b.just_pressed) {
            out.push(Command::Key(Key::Other));
        }
        out
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }
        self.stick_left.just_pressed = false;
        self.stick_right.just_pressed = false;
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in &mut self.buttons { *b = BtnState::default(); }
        self.stick_left = BtnState::default();
        self.stick_right = BtnState::default();
        self.stick_x = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_turns_presses_into_commands() {
        let mut pad = GamepadState::new();
        pad.press(Btn::DPadRight, true);
        pad.press(Btn::A, true);
        assert_eq!(pad.commands(), vec![Command::Key(Key::Right), Command::Key(Key::Enter)]);

        pad.clear_just_pressed();
        assert!(pad.commands().is_empty());
        // still held: no new edge
        pad.press(Btn::A, true);
        assert!(pad.commands().is_empty());
    }

    #[test]
    fn unmapped_button_is_any_key() {
        let mut pad = GamepadState::new();
        pad.press(Btn::Y, true);
        assert_eq!(pad.commands(), vec![Command::Key(Key::Other)]);
    }

    #[test]
    fn config_overrides_mapping_and_ignores_unknown_names() {
        let mut pad = GamepadState::new();
        pad.load_button_config(&GamepadConfig {
            left: vec!["X".into(), "Bogus".into()],
            right: vec!["nothing".into()],
            confirm: vec!["B".into()],
            quit: vec!["Start".into()],
        });
        pad.press(Btn::X, true);
        pad.press(Btn::R1, true);
        pad.press(Btn::Start, true);
        assert_eq!(
            pad.commands(),
            vec![Command::Quit, Command::Key(Key::Left), Command::Key(Key::Right)]
        );
    }
}
