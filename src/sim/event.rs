/// Events the engine emits to its collaborators.
/// The frame loop consumes these for captions, sound, and video playback.

use crate::domain::story::Side;
use crate::sim::phase::PhaseTag;

#[derive(Clone, Debug, PartialEq)]
pub enum NarrativeEvent {
    /// Replace the caption line.
    Instructions(String),
    PlayVideo { level: usize, side: Side, video: String },
    SelectCue,
    DissolveCue,
    AmbientStart,
    PhaseChanged { from: PhaseTag, to: PhaseTag },
    ChoiceCommitted { level: usize, side: Side, timeout: bool },
    Finished,
}
