pub mod detection_result;
pub mod detector_params;
pub mod face_detector;
