/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Project the scene into the next frame in the `front` buffer
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The 3D scene goes through a pinhole projection from the engine camera.
/// Terminal cells are about twice as tall as wide, so the view aspect is
/// `cols * 0.5 / rows`. Drawing is painter's order: stars, then elements
/// far to near, then particles, then the caption line on top.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::math::{Rgb, Vec3};
use crate::sim::assets::Texture;
use crate::sim::orchestrator::Frame;
use crate::sim::scene::{Camera, Element, ElementKind, WorldTransform};

const NEAR: f32 = 0.1;
const CELL_ASPECT: f32 = 0.5;
const BASE_BG: Rgb = Rgb::new(22, 22, 35);
const CAPTION_ROWS: usize = 2;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: rgb(BASE_BG) };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

const fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string centred on row `y`.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let start = self.width.saturating_sub(len) / 2;
        for (i, ch) in s.chars().enumerate() {
            let x = start + i;
            if x >= self.width {
                break;
            }
            self.set(x, y, Cell { ch, fg, bg });
        }
    }
}

// ── Projection ──

/// Maps world points to fractional terminal (col, row) through the camera.
#[derive(Clone, Copy, Debug)]
pub struct Projector {
    cam: Camera,
    cols: f32,
    rows: f32,
    focal: f32,
}

impl Projector {
    pub fn new(cam: Camera, cols: usize, rows: usize) -> Self {
        let focal = 1.0 / (cam.fov_deg.to_radians() / 2.0).tan();
        Projector { cam, cols: cols as f32, rows: rows as f32, focal }
    }

    /// (col, row, depth) of a world point, or None behind the near plane.
    pub fn project(&self, p: Vec3) -> Option<(f32, f32, f32)> {
        let rel = p - self.cam.position;
        let depth = -rel.z;
        if depth <= NEAR {
            return None;
        }
        let ndc_x = rel.x * self.focal / (depth * self.cam.aspect);
        let ndc_y = rel.y * self.focal / depth;
        let col = (ndc_x + 1.0) / 2.0 * self.cols;
        let row = (1.0 - ndc_y) / 2.0 * self.rows;
        Some((col, row, depth))
    }

    /// Integer cell range covered by the projection of a local rect.
    fn cell_rect(&self, t: &WorldTransform, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(usize, usize, usize, usize)> {
        let a = t.position + Vec3::new(x0, y0, 0.0).scale_by(t.scale);
        let b = t.position + Vec3::new(x1, y1, 0.0).scale_by(t.scale);
        let (ac, ar, _) = self.project(a)?;
        let (bc, br, _) = self.project(b)?;
        let c0 = ac.min(bc).floor();
        let c1 = ac.max(bc).ceil().max(c0 + 1.0);
        let r0 = ar.min(br).floor();
        let r1 = ar.max(br).ceil().max(r0 + 1.0);
        if c1 <= 0.0 || r1 <= 0.0 || c0 >= self.cols || r0 >= self.rows {
            return None;
        }
        let clamp = |v: f32, max: f32| v.clamp(0.0, max) as usize;
        Some((clamp(c0, self.cols), clamp(r0, self.rows), clamp(c1, self.cols), clamp(r1, self.rows)))
    }
}

/// Stable tint for an image name so each thumbnail reads differently.
fn texture_tint(tex: &Texture) -> Rgb {
    match tex {
        Texture::Placeholder => Rgb::new(90, 90, 90),
        Texture::Remote { .. } => Rgb::new(60, 160, 170),
        Texture::Image { name } => {
            let h = name.bytes().fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            Rgb::new(80 + (h & 0x7f) as u8, 80 + ((h >> 8) & 0x7f) as u8, 80 + ((h >> 16) & 0x7f) as u8)
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(rgb(BASE_BG)),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// View aspect the camera should use for the current terminal size.
    pub fn aspect(&self) -> f32 {
        let rows = self.scene_rows().max(1) as f32;
        (self.term_w.max(1) as f32 * CELL_ASPECT) / rows
    }

    fn scene_rows(&self) -> usize {
        self.term_h.saturating_sub(CAPTION_ROWS)
    }

    pub fn render(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(rgb(BASE_BG)), Clear(ClearType::All))?;
        }

        let rows = self.scene_rows();
        compose(&mut self.front, frame, rows);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = rgb(BASE_BG);
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

// ── Compose: build front buffer content ──

fn compose(buf: &mut FrameBuffer, frame: &Frame<'_>, scene_rows: usize) {
    let scene = frame.scene;
    let light = 1.0 - scene.fade.clamp(0.0, 1.0);
    let bg = rgb(BASE_BG.dim(light));
    buf.fill(Cell { ch: ' ', fg: Color::White, bg });

    let proj = Projector::new(scene.camera, buf.width, scene_rows);

    // stars
    for star in frame.starfield.positions() {
        let Some((c, r, depth)) = proj.project(scene.camera.position + star) else { continue };
        if c < 0.0 || r < 0.0 || r >= scene_rows as f32 {
            continue;
        }
        let k = (1.0 - depth / 40.0).clamp(0.15, 0.8) * light;
        buf.set(c as usize, r as usize, Cell { ch: '·', fg: rgb(Rgb::WHITE.dim(k)), bg });
    }

    // elements, far to near
    let mut drawable: Vec<(f32, &Element, WorldTransform)> = scene
        .iter()
        .filter_map(|(id, e)| {
            let t = scene.world_transform(id)?;
            let (_, _, depth) = proj.project(t.position)?;
            (t.visible && t.opacity > 0.01).then_some((depth, e, t))
        })
        .collect();
    drawable.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (_, element, t) in drawable {
        draw_element(buf, &proj, element, &t, light, bg, scene_rows);
    }

    // particles
    for burst in frame.bursts {
        let color = rgb(Rgb::WHITE.dim(burst.opacity * light));
        for p in &burst.points {
            let world = burst.position + p.scale_by(burst.scale);
            let Some((c, r, _)) = proj.project(world) else { continue };
            if c >= 0.0 && r >= 0.0 && r < scene_rows as f32 {
                buf.set(c as usize, r as usize, Cell { ch: '.', fg: color, bg });
            }
        }
    }

    // caption overlay, unaffected by the global fade
    let caption_row = scene_rows + CAPTION_ROWS / 2;
    buf.put_centered(caption_row, frame.caption, rgb(Rgb::GREY), rgb(BASE_BG));
}

fn draw_element(
    buf: &mut FrameBuffer,
    proj: &Projector,
    element: &Element,
    t: &WorldTransform,
    light: f32,
    bg: Color,
    scene_rows: usize,
) {
    let k = t.opacity * light;
    let mut fill = |rect: (usize, usize, usize, usize), ch: char, color: Rgb| {
        let (c0, r0, c1, r1) = rect;
        for r in r0..r1.min(scene_rows) {
            for c in c0..c1 {
                buf.set(c, r, Cell { ch, fg: rgb(color.dim(k)), bg });
            }
        }
    };

    match &element.kind {
        ElementKind::Panel(panel) => {
            let Some((x0, y0, x1, y1)) = element.surface.bounds() else { return };
            let Some(rect) = proj.cell_rect(t, x0, y0, x1, y1) else { return };
            let tint = texture_tint(&panel.texture);
            fill(rect, '▒', tint);

            if panel.border_width > 0.001 {
                // highlight only while the choice can be made
                let base = if panel.interactive && panel.selected { Rgb::WHITE } else { Rgb::GREY };
                let color = base.dim(panel.border_pulse);
                let (c0, r0, c1, r1) = rect;
                let last_row = r1.saturating_sub(1);
                let last_col = c1.saturating_sub(1);
                fill((c0, r0, c1, r0 + 1), '─', color);
                fill((c0, last_row, c1, r1), '─', color);
                fill((c0, r0, c0 + 1, r1), '│', color);
                fill((last_col, r0, c1, r1), '│', color);
            }

            // the texture name stands in for the image
            let (c0, r0, c1, r1) = rect;
            let label = panel.texture.label();
            let width = c1 - c0;
            let row = (r0 + r1) / 2;
            if label.chars().count() + 2 <= width && row < scene_rows {
                let start = c0 + (width - label.chars().count()) / 2;
                for (i, ch) in label.chars().enumerate() {
                    buf.set(start + i, row, Cell { ch, fg: rgb(Rgb::WHITE.dim(k)), bg });
                }
            }
        }
        ElementKind::TimerBar { color } => {
            for q in &element.surface.quads {
                if let Some(rect) = proj.cell_rect(t, q.x, q.y, q.x + q.w, q.y + q.h) {
                    fill(rect, '▀', *color);
                }
            }
        }
        ElementKind::Label { color, .. } => {
            for q in &element.surface.quads {
                if let Some(rect) = proj.cell_rect(t, q.x, q.y, q.x + q.w, q.y + q.h) {
                    fill(rect, '█', *color);
                }
            }
        }
    }
}
