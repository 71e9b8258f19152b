pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod records;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DashboardError, Result};
