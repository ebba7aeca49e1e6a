/// Small value types shared by the engine: 3D vectors, RGB colors,
/// and the `Lerp` trait that lets a tween interpolate either of them.

use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec3::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Component-wise product (applies a scale to a local offset).
    pub fn scale_by(self, s: Vec3) -> Self {
        Vec3::new(self.x * s.x, self.y * s.y, self.z * s.z)
    }

    /// Rotate around the Y axis by `angle` radians.
    pub fn rotate_y(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Vec3::new(self.x * cos + self.z * sin, self.y, -self.x * sin + self.z * cos)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GREY: Rgb = Rgb::new(170, 170, 170);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Darken toward black; `k` = 1.0 keeps the color, 0.0 is black.
    pub fn dim(self, k: f32) -> Self {
        let k = k.clamp(0.0, 1.0);
        Rgb::new(
            (self.r as f32 * k) as u8,
            (self.g as f32 * k) as u8,
            (self.b as f32 * k) as u8,
        )
    }
}

/// Linear interpolation between two values of the same type.
pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
        Vec3::new(
            f32::lerp(a.x, b.x, t),
            f32::lerp(a.y, b.y, t),
            f32::lerp(a.z, b.z, t),
        )
    }
}

impl Lerp for Rgb {
    fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let ch = |x: u8, y: u8| f32::lerp(x as f32, y as f32, t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(ch(a.r, b.r), ch(a.g, b.g), ch(a.b, b.b))
    }
}
