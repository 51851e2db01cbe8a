//! Common utilities shared across the catalog workspace crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (header inspection, size limits, clock skew)
pub mod jwt;
