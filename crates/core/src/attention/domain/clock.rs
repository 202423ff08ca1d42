use std::time::Duration;

/// Monotonic time source for the attention timer.
///
/// Readings are offsets from an arbitrary, fixed origin. Only differences
/// between readings carry meaning.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}
