//! Identifier generator abstraction for determinism.
//!
//! In production, identifiers are random UUIDs. In tests, a sequential
//! implementation is injected so flattened trees are reproducible.

use uuid::Uuid;

/// Source of fresh, globally unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns an identifier never returned before by this generator.
    fn next_id(&mut self) -> Uuid;
}

/// Production generator backed by random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}
