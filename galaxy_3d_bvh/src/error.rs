//! Error types for the Galaxy3D BVH
//!
//! This module defines the error types returned by tree mutation, validation,
//! flattening and configuration.

use std::fmt;

/// Result type for Galaxy3D BVH operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D BVH errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Broken parent/child linkage found while removing or validating.
    /// The tree is left exactly as it was before the call.
    StructuralDefect(String),

    /// Wide insertion found no candidate subtree with room left
    CapacityExhausted(String),

    /// A node would be (or was found) reachable by two distinct paths
    CycleDetected(String),

    /// Configuration rejected at construction time
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StructuralDefect(msg) => write!(f, "Structural defect: {}", msg),
            Error::CapacityExhausted(msg) => write!(f, "Capacity exhausted: {}", msg),
            Error::CycleDetected(msg) => write!(f, "Cycle detected: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
