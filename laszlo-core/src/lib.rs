//! Core domain models for the OpenLaszlo bridge
//!
//! This crate contains the data structures shared by both compile
//! strategies: CompileOptions, CompileResult, and the output naming rules.

pub mod error;
pub mod models;

pub use error::CoreError;
pub use models::*;
