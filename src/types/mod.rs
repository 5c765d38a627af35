//! Core domain types for the review lifecycle tracker.
//!
//! This module contains the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod ids;
pub mod pr;

// Re-export commonly used types at the module level
pub use ids::{InvalidRepoId, PrNumber, RepoId};
pub use pr::{ClosedPr, PrSnapshot, PrUpdate, ReviewRecord, TrackedPr};
