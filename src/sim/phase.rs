/// Orchestrator phases.
///
/// Each variant carries exactly the pending signals that phase is waiting
/// on, so "what are we waiting for" can never drift from "where are we".
/// `PhaseTag` is the fieldless mirror used for guards and logging, and
/// `Listener` says which input handler is attached while a phase is active.
///
/// ```text
/// Loading ─► Intro ─► Dissolving ─► LoadingLevel ─┬─► Describing ─► Narrating ─► Selection
///                                        ▲        └──────────────►─┘                │
///                                        │                                          ▼
///                                   Travelling ◄── AwaitingVideo ◄────────────── Zooming
///                                        │
///                                        └─► End
/// ```

use std::fmt;

use crate::domain::story::Side;
use crate::sim::signal::{all_done, Completion};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PhaseTag {
    Loading,
    Intro,
    Dissolving,
    LoadingLevel,
    Describing,
    Narrating,
    Selection,
    Zooming,
    AwaitingVideo,
    Travelling,
    End,
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseTag::Loading => "loading",
            PhaseTag::Intro => "intro",
            PhaseTag::Dissolving => "dissolving",
            PhaseTag::LoadingLevel => "loading_level",
            PhaseTag::Describing => "describing",
            PhaseTag::Narrating => "narrating",
            PhaseTag::Selection => "selection",
            PhaseTag::Zooming => "zooming",
            PhaseTag::AwaitingVideo => "awaiting_video",
            PhaseTag::Travelling => "travelling",
            PhaseTag::End => "end",
        };
        f.write_str(name)
    }
}

/// Input handler attached while a phase is active.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Listener {
    /// Any key starts the experience.
    AnyKey,
    /// Left/right highlight, Enter commits.
    Choice,
    /// Left/right only shift the background.
    LookAround,
}

/// Discrete input delivered to whichever listener is attached.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Left,
    Right,
    Enter,
    Other,
}

#[derive(Clone, Debug)]
pub enum DescribeStep {
    FadingIn(Completion),
    Holding { until: f64 },
}

/// The two independent gates in front of `Selection`, plus the panel
/// fade-in that starts once the description is out of the way.
#[derive(Clone, Debug)]
pub struct Gates {
    pub narration: Completion,
    pub description: Completion,
    pub reveal: Option<Vec<Completion>>,
}

impl Gates {
    pub fn revealed(&self) -> bool {
        self.reveal.as_deref().is_some_and(all_done)
    }

    pub fn open(&self) -> bool {
        self.narration.is_done() && self.description.is_done() && self.revealed()
    }
}

#[derive(Clone, Debug)]
pub enum ZoomStep {
    Zooming(Completion),
    Fading(Completion),
}

#[derive(Clone, Debug)]
pub enum TravelStep {
    Holding { until: f64 },
    Moving { camera: Completion, dissolve: Completion },
}

#[derive(Clone, Debug)]
pub enum Phase {
    Loading,
    Intro,
    Dissolving { label: Completion },
    LoadingLevel { level: usize },
    Describing { level: usize, step: DescribeStep, narration: Completion },
    Narrating { level: usize, gates: Gates },
    Selection { level: usize },
    Zooming { level: usize, side: Side, step: ZoomStep },
    AwaitingVideo { level: usize, side: Side },
    Travelling { level: usize, side: Side, step: TravelStep },
    End,
}

impl Phase {
    pub fn tag(&self) -> PhaseTag {
        match self {
            Phase::Loading => PhaseTag::Loading,
            Phase::Intro => PhaseTag::Intro,
            Phase::Dissolving { .. } => PhaseTag::Dissolving,
            Phase::LoadingLevel { .. } => PhaseTag::LoadingLevel,
            Phase::Describing { .. } => PhaseTag::Describing,
            Phase::Narrating { .. } => PhaseTag::Narrating,
            Phase::Selection { .. } => PhaseTag::Selection,
            Phase::Zooming { .. } => PhaseTag::Zooming,
            Phase::AwaitingVideo { .. } => PhaseTag::AwaitingVideo,
            Phase::Travelling { .. } => PhaseTag::Travelling,
            Phase::End => PhaseTag::End,
        }
    }

    pub fn listener(&self) -> Option<Listener> {
        match self {
            Phase::Intro => Some(Listener::AnyKey),
            Phase::Selection { .. } => Some(Listener::Choice),
            Phase::End => Some(Listener::LookAround),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_follow_phase() {
        assert_eq!(Phase::Intro.listener(), Some(Listener::AnyKey));
        assert_eq!(Phase::Selection { level: 0 }.listener(), Some(Listener::Choice));
        assert_eq!(Phase::End.listener(), Some(Listener::LookAround));
        assert_eq!(Phase::AwaitingVideo { level: 0, side: Side::Left }.listener(), None);
        assert_eq!(Phase::Loading.listener(), None);
    }

    #[test]
    fn gates_need_narration_description_and_reveal() {
        let narration = Completion::new();
        let fade = Completion::new();
        let mut gates = Gates {
            narration: narration.clone(),
            description: Completion::resolved(),
            reveal: None,
        };
        assert!(!gates.open());
        gates.reveal = Some(vec![fade.clone()]);
        fade.resolve();
        assert!(gates.revealed());
        assert!(!gates.open());
        narration.resolve();
        assert!(gates.open());
    }

    #[test]
    fn tags_render_as_snake_case() {
        assert_eq!(PhaseTag::LoadingLevel.to_string(), "loading_level");
        assert_eq!(Phase::Zooming {
            level: 1,
            side: Side::Right,
            step: ZoomStep::Zooming(Completion::new()),
        }
        .tag(), PhaseTag::Zooming);
    }
}
