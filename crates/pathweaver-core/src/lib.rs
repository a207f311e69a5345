//! Pathweaver Core: shared domain abstractions.
//!
//! This crate defines the ports every other crate depends on: persistence,
//! structured generation, media rendering, asset inventory, time, identifiers
//! and the cooperative sleep primitive. It contains no infrastructure code.

pub mod assets;
pub mod clock;
pub mod error;
pub mod generator;
pub mod id;
pub mod repository;
pub mod sleeper;
