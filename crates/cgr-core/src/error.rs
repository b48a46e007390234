//! Error types for contact plan construction and capacity bookkeeping

use thiserror::Error;

use crate::contact::{ContactId, NodeId, Time, Volume};

/// Errors raised while building or mutating a [`ContactPlan`](crate::ContactPlan)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Contact window is empty or inverted
    #[error("Invalid contact window: start {start} is not before end {end}")]
    InvalidWindow { start: Time, end: Time },

    /// Contact rate must be strictly positive
    #[error("Invalid contact rate: {0}")]
    InvalidRate(Volume),

    /// Confidence must lie in [0, 1]
    #[error("Invalid contact confidence: {0}")]
    InvalidConfidence(f64),

    /// Contact starts and ends at the same node
    #[error("Contact loops back to node {0}")]
    SelfLoop(NodeId),

    /// Committed volume must not be negative
    #[error("Invalid volume to commit: {0}")]
    NegativeVolume(Volume),

    /// Contact id was not issued by this plan
    #[error("Unknown contact {0}")]
    UnknownContact(ContactId),
}

/// Result type for plan operations
pub type PlanResult<T> = Result<T, PlanError>;
