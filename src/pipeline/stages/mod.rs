//! Generic stage implementations.
//!
//! Real filter stages (color remap, dithering, overlay, ...) live with the
//! application. These two are payload-agnostic building blocks.

pub mod map;
pub mod passthrough;

pub use map::MapStage;
pub use passthrough::Passthrough;
