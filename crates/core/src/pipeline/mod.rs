pub mod attention_service;
pub mod frame_broadcaster;
pub mod infrastructure;
pub mod pipeline_logger;

#[cfg(test)]
pub(crate) mod test_support;
