//! Shared test mocks and utilities for the Pathweaver story engine.

mod assets;
mod clock;
mod generator;
mod id;
mod repository;
mod sleeper;

pub use assets::{RecordingAssetRenderer, RenderBehavior, ScriptedAssetInventory};
pub use clock::FixedClock;
pub use generator::{ScriptedGenerator, ScriptedReply};
pub use id::SequentialIdGenerator;
pub use repository::{FailingStoryRepository, InMemoryStoryRepository};
pub use sleeper::RecordingSleeper;
