//! # Wirebox Support
//!
//! Shared helpers for the wirebox crates.
//!
//! This crate provides:
//! - Rendering of provider chains for cycle diagnostics
//! - "Did you mean?" suggestions for unknown provider names
//! - Short display names for construction targets

pub mod rendering;
