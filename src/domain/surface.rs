/// Renderable surfaces and area-weighted point sampling.
///
/// A surface is a flat list of axis-aligned quads in the element's local
/// space (z = 0). Panels and the timer bar are one quad; text is one quad
/// per lit glyph pixel. Sampling picks a quad with probability proportional
/// to its area, then a uniform point inside it, so the point cloud covers the
/// visible shape evenly.

use rand::Rng;
use thiserror::Error;

use super::math::Vec3;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Quad {
    /// Lower-left corner.
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Quad {
    pub fn centered(w: f32, h: f32) -> Self {
        Quad { x: -w / 2.0, y: -h / 2.0, w, h }
    }

    pub fn area(&self) -> f32 {
        (self.w * self.h).max(0.0)
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Surface {
    pub quads: Vec<Quad>,
}

impl Surface {
    pub fn quad(w: f32, h: f32) -> Self {
        Surface { quads: vec![Quad::centered(w, h)] }
    }

    pub fn area(&self) -> f32 {
        self.quads.iter().map(Quad::area).sum()
    }

    /// Bounding box as (min_x, min_y, max_x, max_y), or None when empty.
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        let first = self.quads.first()?;
        let mut b = (first.x, first.y, first.x + first.w, first.y + first.h);
        for q in &self.quads[1..] {
            b.0 = b.0.min(q.x);
            b.1 = b.1.min(q.y);
            b.2 = b.2.max(q.x + q.w);
            b.3 = b.3.max(q.y + q.h);
        }
        Some(b)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("surface has no sampleable area ({quads} quads, total area {area})")]
    Degenerate { quads: usize, area: f32 },
}

/// Prepared sampler: cumulative area table over the surface's quads.
pub struct Sampler<'a> {
    surface: &'a Surface,
    cumulative: Vec<f32>,
    total: f32,
}

impl<'a> Sampler<'a> {
    pub fn build(surface: &'a Surface) -> Result<Self, SampleError> {
        let mut cumulative = Vec::with_capacity(surface.quads.len());
        let mut total = 0.0_f32;
        for q in &surface.quads {
            total += q.area();
            cumulative.push(total);
        }
        if !(total.is_finite() && total > 0.0) {
            return Err(SampleError::Degenerate { quads: surface.quads.len(), area: total });
        }
        Ok(Sampler { surface, cumulative, total })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let pick = rng.gen::<f32>() * self.total;
        let idx = self
            .cumulative
            .partition_point(|&c| c <= pick)
            .min(self.surface.quads.len() - 1);
        let q = &self.surface.quads[idx];
        Vec3::new(q.x + rng.gen::<f32>() * q.w, q.y + rng.gen::<f32>() * q.h, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_or_flat_surface_is_degenerate() {
        assert!(matches!(
            Sampler::build(&Surface::default()),
            Err(SampleError::Degenerate { quads: 0, .. })
        ));
        assert!(Sampler::build(&Surface::quad(4.0, 0.0)).is_err());
    }

    #[test]
    fn samples_stay_inside_quad() {
        let s = Surface::quad(4.5, 2.5);
        let sampler = Sampler::build(&s).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = sampler.sample(&mut rng);
            assert!(p.x >= -2.25 && p.x <= 2.25);
            assert!(p.y >= -1.25 && p.y <= 1.25);
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn sampling_is_area_weighted() {
        // Left quad is 9x the area of the right one.
        let s = Surface {
            quads: vec![
                Quad { x: -4.0, y: 0.0, w: 3.0, h: 3.0 },
                Quad { x: 2.0, y: 0.0, w: 1.0, h: 1.0 },
            ],
        };
        let sampler = Sampler::build(&s).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 10_000;
        let left = (0..n).filter(|_| sampler.sample(&mut rng).x < 0.0).count();
        let share = left as f32 / n as f32;
        assert!((share - 0.9).abs() < 0.03, "left share was {share}");
    }

    #[test]
    fn bounds_cover_all_quads() {
        let s = Surface {
            quads: vec![
                Quad { x: -1.0, y: -1.0, w: 1.0, h: 1.0 },
                Quad { x: 2.0, y: 0.5, w: 1.0, h: 2.0 },
            ],
        };
        assert_eq!(s.bounds(), Some((-1.0, -1.0, 3.0, 2.5)));
        assert_eq!(Surface::default().bounds(), None);
    }
}
