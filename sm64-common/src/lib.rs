//! SM64 Common - Shared types and conversions
//!
//! This crate contains everything shared across the bridge crates:
//! - Host vectors (glam) and packed engine vectors
//! - Host/engine space conversion (units, axes, angles, time base)
//! - Configuration types
//! - Common error types

pub mod error;
pub mod space;
pub mod types;

pub use error::*;
pub use space::*;
pub use types::*;
