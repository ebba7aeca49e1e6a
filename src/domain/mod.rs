pub mod font;
pub mod math;
pub mod story;
pub mod surface;
pub mod tween;
