//! Application services: generation steps and their orchestration.

pub mod command_handlers;
pub mod completion_gate;
pub mod dispatcher;
pub mod flattener;
pub mod orchestrator;
pub mod outline_generator;
pub mod prompts;
pub mod query_handlers;
pub mod retry;
pub mod tree_builder;

#[cfg(test)]
pub(crate) mod testing;
