pub mod onnx_face_detector;
pub mod scaled_face_detector;
