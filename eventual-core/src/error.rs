//! Conventional error type.
//!
//! The settlement core is generic over any `Clone + Send + Sync`
//! rejection reason. This module provides the conventional reason type
//! used by callers that do not bring a domain-specific one.

use thiserror::Error;

/// Conventional rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A resolver function failed before it could settle its cell.
    #[error("resolver failed: {0}")]
    Resolver(String),

    /// A `map`/`chain` transform failed.
    #[error("transform failed: {0}")]
    Transform(String),
}
