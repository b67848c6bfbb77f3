pub mod error;
pub mod metrics;
pub mod progress;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
