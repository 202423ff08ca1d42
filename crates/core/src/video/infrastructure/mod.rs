#[cfg(feature = "camera")]
pub mod camera_source;
pub mod image_sequence_source;
pub mod jpeg_frame_encoder;
pub mod retrying_frame_source;
