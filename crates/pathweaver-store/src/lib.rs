//! Pathweaver: PostgreSQL persistence for stories and their choice trees.

pub mod pg_story_repository;
pub mod schema;
