// ABOUTME: In-memory SQLite engine wrapper for flashstore.
// ABOUTME: Provides statement execution, JSON row materialization, and typed fault classification.

pub mod engine;
pub mod error;

pub use engine::{Engine, Row};
pub use error::EngineError;
