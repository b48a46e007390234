//! Routing error types
//!
//! "No route" is never an error: searches return `Option`, enumerations and
//! candidate selection return possibly empty lists.

use thiserror::Error;

use cgr_core::PlanError;

use crate::ConfigWarning;

/// Errors raised by the routing crate
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Contact plan error
    #[error("Contact plan error: {0}")]
    Plan(#[from] PlanError),

    /// Configuration rejected
    #[error("Invalid configuration: {}", format_warnings(.0))]
    InvalidConfig(Vec<ConfigWarning>),
}

fn format_warnings(warnings: &[ConfigWarning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
