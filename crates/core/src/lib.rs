//! Attention tracking core.
//!
//! Turns a stream of camera frames into a debounced FOCUSED / DISTRACTED
//! signal plus an annotated, encoded video feed. Each bounded context keeps
//! its ports in `domain` and its adapters in `infrastructure`.

pub mod annotation;
pub mod attention;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
