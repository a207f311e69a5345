//! Test identifiers: deterministic `IdGenerator` implementation for tests.

use pathweaver_core::id::IdGenerator;
use uuid::Uuid;

/// Hands out `Uuid::from_u128(start)`, `Uuid::from_u128(start + 1)`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: u128,
}

impl SequentialIdGenerator {
    /// Create a generator whose first identifier is `Uuid::from_u128(start)`.
    #[must_use]
    pub fn starting_at(start: u128) -> Self {
        Self { next: start }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> Uuid {
        let id = Uuid::from_u128(self.next);
        self.next += 1;
        id
    }
}
