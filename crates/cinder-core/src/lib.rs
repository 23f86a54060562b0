//! Cinder Core - Foundational types for the Cinder engine
//!
//! This crate provides the core types that all other Cinder crates depend on:
//! - `EntityId` - Stable entity identifiers
//! - `Vec2`, `Vec3`, `Color` - Spatial and color types
//! - `lerp_towards` - Clamped interpolation used by easing code
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{CinderError, Result};
pub use id::EntityId;
pub use types::{lerp_towards, Color, Vec2, Vec3};
