pub mod manual_clock;
pub mod monotonic_clock;
