pub mod assets;
pub mod choreo;
pub mod clock;
pub mod event;
pub mod narration;
pub mod orchestrator;
pub mod particles;
pub mod phase;
pub mod scene;
pub mod signal;
pub mod starfield;
pub mod timer;
