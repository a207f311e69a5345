//! Domain model of a generated story.

pub mod aggregates;
pub mod commands;
pub mod outline;
pub mod settings;
pub mod tree;
