/// Bitmap glyph font.
///
/// Text in the scene is real geometry: each lit glyph pixel becomes one quad
/// of the text's `Surface`, so text can be projected by the renderer and
/// dissolved into particles like any other element.
///
/// The built-in face is 3x5. A replacement face can be loaded from a TOML
/// file:
///   ```toml
///   height = 5
///   [glyphs]
///   A = ["###", "#.#", "###", "#.#", "#.#"]
///   ```
/// Any non-space, non-'.' character in a row marks a lit pixel.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::surface::{Quad, Surface};

#[derive(Debug, Error)]
pub enum FontError {
    #[error("could not read font file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("font file {path} is not valid: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("glyph '{glyph}' has {rows} rows, expected {height}")]
    BadGlyph { glyph: String, rows: usize, height: usize },
    #[error("font defines no glyphs")]
    Empty,
}

#[derive(Deserialize)]
struct FontFile {
    height: usize,
    glyphs: HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug)]
struct Glyph {
    width: usize,
    /// Lit pixels as (column, row-from-top).
    pixels: Vec<(usize, usize)>,
}

#[derive(Clone, Debug)]
pub struct Font {
    height: usize,
    glyphs: HashMap<char, Glyph>,
}

/// A laid-out block of text, centred on the origin.
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub surface: Surface,
    pub width: f32,
    pub height: f32,
}

const BUILTIN: &[(char, [&str; 5])] = &[
    ('A', [".#.", "#.#", "###", "#.#", "#.#"]),
    ('B', ["##.", "#.#", "##.", "#.#", "##."]),
    ('C', [".##", "#..", "#..", "#..", ".##"]),
    ('D', ["##.", "#.#", "#.#", "#.#", "##."]),
    ('E', ["###", "#..", "##.", "#..", "###"]),
    ('F', ["###", "#..", "##.", "#..", "#.."]),
    ('G', [".##", "#..", "#.#", "#.#", ".##"]),
    ('H', ["#.#", "#.#", "###", "#.#", "#.#"]),
    ('I', ["###", ".#.", ".#.", ".#.", "###"]),
    ('J', ["..#", "..#", "..#", "#.#", ".#."]),
    ('K', ["#.#", "#.#", "##.", "#.#", "#.#"]),
    ('L', ["#..", "#..", "#..", "#..", "###"]),
    ('M', ["#.#", "###", "###", "#.#", "#.#"]),
    ('N', ["##.", "#.#", "#.#", "#.#", "#.#"]),
    ('O', [".#.", "#.#", "#.#", "#.#", ".#."]),
    ('P', ["##.", "#.#", "##.", "#..", "#.."]),
    ('Q', [".#.", "#.#", "#.#", "##.", ".##"]),
    ('R', ["##.", "#.#", "##.", "#.#", "#.#"]),
    ('S', [".##", "#..", ".#.", "..#", "##."]),
    ('T', ["###", ".#.", ".#.", ".#.", ".#."]),
    ('U', ["#.#", "#.#", "#.#", "#.#", "###"]),
    ('V', ["#.#", "#.#", "#.#", "#.#", ".#."]),
    ('W', ["#.#", "#.#", "###", "###", "#.#"]),
    ('X', ["#.#", "#.#", ".#.", "#.#", "#.#"]),
    ('Y', ["#.#", "#.#", ".#.", ".#.", ".#."]),
    ('Z', ["###", "..#", ".#.", "#..", "###"]),
    ('0', ["###", "#.#", "#.#", "#.#", "###"]),
    ('1', [".#.", "##.", ".#.", ".#.", "###"]),
    ('2', ["##.", "..#", ".#.", "#..", "###"]),
    ('3', ["##.", "..#", ".#.", "..#", "##."]),
    ('4', ["#.#", "#.#", "###", "..#", "..#"]),
    ('5', ["###", "#..", "##.", "..#", "##."]),
    ('6', [".##", "#..", "###", "#.#", "###"]),
    ('7', ["###", "..#", ".#.", ".#.", ".#."]),
    ('8', ["###", "#.#", "###", "#.#", "###"]),
    ('9', ["###", "#.#", "###", "..#", "##."]),
    ('.', ["...", "...", "...", "...", ".#."]),
    (',', ["...", "...", "...", ".#.", "#.."]),
    ('!', [".#.", ".#.", ".#.", "...", ".#."]),
    ('?', ["##.", "..#", ".#.", "...", ".#."]),
    ('\'', [".#.", ".#.", "...", "...", "..."]),
    ('-', ["...", "...", "###", "...", "..."]),
    (':', ["...", ".#.", "...", ".#.", "..."]),
];

fn parse_rows(rows: &[&str]) -> Glyph {
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut pixels = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if ch != '.' && ch != ' ' {
                pixels.push((x, y));
            }
        }
    }
    Glyph { width, pixels }
}

impl Font {
    pub fn builtin() -> Self {
        let glyphs = BUILTIN
            .iter()
            .map(|(ch, rows)| (*ch, parse_rows(rows)))
            .collect();
        Font { height: 5, glyphs }
    }

    pub fn load(path: &Path) -> Result<Self, FontError> {
        let text = std::fs::read_to_string(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            FontError::Parse { source, .. } => FontError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, FontError> {
        let file: FontFile = toml::from_str(text).map_err(|source| FontError::Parse {
            path: String::from("<inline>"),
            source,
        })?;
        let mut glyphs = HashMap::with_capacity(file.glyphs.len());
        for (name, rows) in &file.glyphs {
            let Some(ch) = name.chars().next() else { continue };
            if rows.len() != file.height {
                return Err(FontError::BadGlyph {
                    glyph: name.clone(),
                    rows: rows.len(),
                    height: file.height,
                });
            }
            let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
            glyphs.insert(ch.to_ascii_uppercase(), parse_rows(&refs));
        }
        if glyphs.is_empty() || file.height == 0 {
            return Err(FontError::Empty);
        }
        Ok(Font { height: file.height, glyphs })
    }

    fn advance(&self, ch: char) -> usize {
        // one blank column between glyphs; unknown glyphs advance like a space
        self.glyphs.get(&ch).map_or(self.height / 2 + 1, |g| g.width + 1)
    }

    fn line_columns(&self, line: &str) -> usize {
        line.chars().map(|c| self.advance(c.to_ascii_uppercase())).sum::<usize>().saturating_sub(1)
    }

    /// Lay out `text` with glyph height `size` (world units).
    /// Lines wider than `max_width` are wrapped on spaces when possible.
    pub fn layout(&self, text: &str, size: f32, max_width: Option<f32>) -> TextBlock {
        let px = size / self.height as f32;
        let lines = match max_width {
            Some(w) if w > 0.0 => self.wrap(text, (w / px).floor() as usize),
            _ => vec![text.to_string()],
        };

        let line_gap = 2;
        let rows_total = lines.len() * self.height + lines.len().saturating_sub(1) * line_gap;
        let cols_total = lines.iter().map(|l| self.line_columns(l)).max().unwrap_or(0);
        let width = cols_total as f32 * px;
        let height = rows_total as f32 * px;

        let mut quads = Vec::new();
        for (li, line) in lines.iter().enumerate() {
            // centre each line horizontally
            let line_w = self.line_columns(line) as f32 * px;
            let mut cx = -line_w / 2.0;
            let top = height / 2.0 - (li * (self.height + line_gap)) as f32 * px;
            for ch in line.chars() {
                let ch = ch.to_ascii_uppercase();
                if let Some(g) = self.glyphs.get(&ch) {
                    for &(gx, gy) in &g.pixels {
                        quads.push(Quad {
                            x: cx + gx as f32 * px,
                            y: top - (gy + 1) as f32 * px,
                            w: px,
                            h: px,
                        });
                    }
                }
                cx += self.advance(ch) as f32 * px;
            }
        }

        TextBlock { surface: Surface { quads }, width, height }
    }

    fn wrap(&self, text: &str, max_cols: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && self.line_columns(&candidate) > max_cols {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layout_is_centred_and_sized() {
        let font = Font::builtin();
        let block = font.layout("FIN.", 1.0, None);
        // F(3)+1 + I(3)+1 + N(3)+1 + .(3) = 15 columns, 5 rows, px = 0.2
        assert!((block.width - 3.0).abs() < 1e-4);
        assert!((block.height - 1.0).abs() < 1e-4);
        let (min_x, min_y, max_x, max_y) = block.surface.bounds().unwrap();
        assert!((min_x + max_x).abs() < 0.21);
        assert!((min_y + max_y).abs() < 1e-4);
    }

    #[test]
    fn lowercase_renders_as_uppercase() {
        let font = Font::builtin();
        let a = font.layout("start", 1.0, None);
        let b = font.layout("START", 1.0, None);
        assert_eq!(a.surface, b.surface);
        assert!(!a.surface.quads.is_empty());
    }

    #[test]
    fn spaces_only_text_has_no_area() {
        let font = Font::builtin();
        assert_eq!(font.layout("   ", 1.0, None).surface.area(), 0.0);
    }

    #[test]
    fn long_text_wraps_within_max_width() {
        let font = Font::builtin();
        let block = font.layout("YOU ARE IN A DARK ROOM. A CHOICE APPEARS.", 0.4, Some(6.0));
        assert!(block.width <= 6.0 + 1e-4);
        assert!(block.height > 0.4);
    }

    #[test]
    fn loads_font_from_toml() {
        let font = Font::from_toml_str(
            r###"
            height = 2
            [glyphs]
            A = ["##", "#."]
            "###,
        )
        .unwrap();
        let block = font.layout("a", 2.0, None);
        assert_eq!(block.surface.quads.len(), 3);
    }

    #[test]
    fn rejects_malformed_fonts() {
        assert!(matches!(
            Font::from_toml_str("height = 3\n[glyphs]\nA = [\"#\"]\n"),
            Err(FontError::BadGlyph { .. })
        ));
        assert!(matches!(Font::from_toml_str("height = 3\n[glyphs]\n"), Err(FontError::Empty)));
        assert!(matches!(Font::from_toml_str("not toml ["), Err(FontError::Parse { .. })));
        assert!(matches!(
            Font::load(Path::new("/nonexistent/font.toml")),
            Err(FontError::Io { .. })
        ));
    }
}
