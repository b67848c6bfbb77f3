pub mod adapter;
pub mod error;
pub mod sql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
