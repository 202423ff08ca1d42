pub mod threaded_frame_producer;
