/// Background star field with eased parallax rotation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::math::Vec3;
use crate::domain::story::Side;

const STAR_COUNT: usize = 600;
const AREA: f32 = 50.0;
const EASE: f32 = 0.05;
pub const PARALLAX_STEP: f32 = 0.3;

pub struct Starfield {
    stars: Vec<Vec3>,
    pub rotation_y: f32,
    target_y: f32,
}

impl Starfield {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stars = (0..STAR_COUNT)
            .map(|_| {
                Vec3::new(
                    (rng.gen::<f32>() - 0.5) * AREA,
                    (rng.gen::<f32>() - 0.5) * AREA,
                    (rng.gen::<f32>() - 0.5) * AREA,
                )
            })
            .collect();
        Starfield { stars, rotation_y: 0.0, target_y: 0.0 }
    }

    /// Looking left turns the field one way, right the other.
    pub fn set_parallax(&mut self, side: Side) {
        match side {
            Side::Left => self.target_y -= PARALLAX_STEP,
            Side::Right => self.target_y += PARALLAX_STEP,
        }
    }

    pub fn target(&self) -> f32 {
        self.target_y
    }

    pub fn update(&mut self) {
        self.rotation_y += EASE * (self.target_y - self.rotation_y);
    }

    /// Star positions with the current rotation applied.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        let angle = self.rotation_y;
        self.stars.iter().map(move |s| s.rotate_y(angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallax_shifts_target_and_rotation_eases() {
        let mut field = Starfield::new(1);
        field.set_parallax(Side::Left);
        assert!((field.target() + 0.3).abs() < 1e-6);
        field.update();
        assert!((field.rotation_y + 0.015).abs() < 1e-6);
        for _ in 0..500 {
            field.update();
        }
        assert!((field.rotation_y + 0.3).abs() < 1e-3);
        field.set_parallax(Side::Right);
        field.set_parallax(Side::Right);
        assert!((field.target() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn stars_fill_the_cube() {
        let field = Starfield::new(2);
        assert_eq!(field.positions().count(), STAR_COUNT);
        assert!(field.positions().all(|p| p.x.abs() <= 25.0 && p.y.abs() <= 25.0 && p.z.abs() <= 25.0));
    }
}
