//! Domain types for video generation.
//!
//! This module contains:
//! - GenerationRequest / GenerationResult: values sent to and received from
//!   the companion service
//! - GenerationError: the failure taxonomy shared by every layer

pub mod error;
pub mod generation;

// Re-export commonly used types
pub use error::GenerationError;
pub use generation::{GenerationRequest, GenerationResult};
