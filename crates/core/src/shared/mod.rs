pub mod constants;
pub mod encoded_frame;
pub mod frame;
pub mod model_resolver;
pub mod region;
