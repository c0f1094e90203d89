pub mod config;
pub mod dashboard;
pub mod errors;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
