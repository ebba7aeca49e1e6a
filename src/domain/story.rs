/// Story data: the static, ordered list of levels supplied at startup.
///
/// ## Story file (`story.toml`):
///   ```toml
///   end_text = "FIN."
///
///   [[levels]]
///   narration = "audio/intro.ogg"          # optional
///   description = "A door. Two keys."      # optional
///   description_stay_ms = 3000             # optional
///   countdown_ms = 15000                   # optional
///
///   [levels.left]
///   video = "door-open"
///   thumbnail = "thumbs/door-open.png"
///   end_thumbnail = "thumbs/door-open-end.png"   # optional
///   title = "Open it"
///
///   [levels.right]
///   ...
///   ```
///
/// Levels are indexed by their position in the file. An index past the last
/// level is the natural end of the story, not an error.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("could not read story file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("story file {path} is not valid: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("level {level}: {reason}")]
    Invalid { level: usize, reason: String },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// -1 for left, +1 for right.
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChoiceOption {
    /// Opaque reference handed to the video player.
    pub video: String,
    pub thumbnail: String,
    #[serde(default)]
    pub end_thumbnail: Option<String>,
    pub title: String,
}

fn default_stay_ms() -> u64 { 3000 }
fn default_countdown_ms() -> u64 { 15_000 }

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Level {
    #[serde(skip)]
    pub index: usize,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_stay_ms")]
    pub description_stay_ms: u64,
    pub left: ChoiceOption,
    pub right: ChoiceOption,
    #[serde(default = "default_countdown_ms")]
    pub countdown_ms: u64,
}

impl Level {
    pub fn option(&self, side: Side) -> &ChoiceOption {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Description text, ignoring blank strings.
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Narration reference, ignoring blank strings.
    pub fn narration_ref(&self) -> Option<&str> {
        self.narration.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn default_end_text() -> String { "FIN.".into() }

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Story {
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default = "default_end_text")]
    pub end_text: String,
}

const EMBEDDED_STORY: &str = r#"
end_text = "FIN."

[[levels]]
narration = "audio/corridor.ogg"
description = "A corridor splits in two. Something hums behind the walls."
description_stay_ms = 3000
countdown_ms = 15000

[levels.left]
video = "corridor-left"
thumbnail = "thumbs/corridor-left.png"
end_thumbnail = "thumbs/corridor-left-end.png"
title = "Follow the hum"

[levels.right]
video = "corridor-right"
thumbnail = "thumbs/corridor-right.png"
end_thumbnail = "thumbs/corridor-right-end.png"
title = "Walk away"

[[levels]]
description = "The lights go out. A radio crackles."
description_stay_ms = 4000

[levels.left]
video = "radio-answer"
thumbnail = "thumbs/radio-answer.png"
title = "Answer it"

[levels.right]
video = "radio-silence"
thumbnail = "thumbs/radio-silence.png"
title = "Stay silent"

[[levels]]
countdown_ms = 10000

[levels.left]
video = "door-stay"
thumbnail = "thumbs/door-stay.png"
title = "Stay inside"

[levels.right]
video = "door-leave"
thumbnail = "thumbs/door-leave.png"
title = "Step outside"
"#;

impl Story {
    /// Built-in demo story, used when no story file is found.
    pub fn embedded() -> Self {
        // The embedded text is covered by a test; an empty story still runs.
        Self::from_toml_str(EMBEDDED_STORY).unwrap_or_else(|_| Story {
            levels: Vec::new(),
            end_text: default_end_text(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, StoryError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            StoryError::Parse { source, .. } => StoryError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, StoryError> {
        let mut story: Story = toml::from_str(text).map_err(|source| StoryError::Parse {
            path: String::from("<inline>"),
            source,
        })?;
        for (i, level) in story.levels.iter_mut().enumerate() {
            level.index = i;
            for side in [Side::Left, Side::Right] {
                let opt = level.option(side);
                if opt.video.trim().is_empty() {
                    return Err(StoryError::Invalid {
                        level: i,
                        reason: format!("{} option has an empty video reference", side.as_str()),
                    });
                }
            }
            if level.countdown_ms == 0 {
                return Err(StoryError::Invalid {
                    level: i,
                    reason: "countdown_ms must be greater than zero".into(),
                });
            }
        }
        Ok(story)
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_story_parses() {
        let story = Story::from_toml_str(EMBEDDED_STORY).unwrap();
        assert_eq!(story.len(), 3);
        assert_eq!(story.end_text, "FIN.");
        assert_eq!(story.levels[2].index, 2);
        assert_eq!(story.levels[2].description_text(), None);
        assert_eq!(story.levels[1].narration_ref(), None);
        assert_eq!(story.levels[0].countdown_ms, 15_000);
        assert_eq!(story.levels[2].countdown_ms, 10_000);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let story = Story::from_toml_str(
            r#"
            [[levels]]
            left = { video = "a", thumbnail = "a.png", title = "A" }
            right = { video = "b", thumbnail = "b.png", title = "B" }
            "#,
        )
        .unwrap();
        let level = story.level(0).unwrap();
        assert_eq!(level.description_stay_ms, 3000);
        assert_eq!(level.countdown_ms, 15_000);
        assert_eq!(level.left.end_thumbnail, None);
        assert_eq!(story.end_text, "FIN.");
        assert!(story.level(1).is_none());
    }

    #[test]
    fn blank_optional_strings_are_absent() {
        let story = Story::from_toml_str(
            r#"
            [[levels]]
            narration = "  "
            description = ""
            left = { video = "a", thumbnail = "a.png", title = "A" }
            right = { video = "b", thumbnail = "b.png", title = "B" }
            "#,
        )
        .unwrap();
        assert_eq!(story.levels[0].narration_ref(), None);
        assert_eq!(story.levels[0].description_text(), None);
    }

    #[test]
    fn rejects_empty_video_reference() {
        let err = Story::from_toml_str(
            r#"
            [[levels]]
            left = { video = "", thumbnail = "a.png", title = "A" }
            right = { video = "b", thumbnail = "b.png", title = "B" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, StoryError::Invalid { level: 0, .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Story::load(Path::new("/nonexistent/story.toml")),
            Err(StoryError::Io { .. })
        ));
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.as_str(), "right");
        assert_eq!(Side::Left.sign(), -1.0);
    }
}
