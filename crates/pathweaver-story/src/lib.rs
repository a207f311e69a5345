//! Pathweaver: branching story synthesis.
//!
//! Turns a single prompt into an outline, expands a bounded-depth tree of
//! player choices, flattens and persists it, dispatches media generation for
//! every node and waits for the rendered assets before finalizing the story.

pub mod application;
pub mod domain;
