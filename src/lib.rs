//! FEM Result Agent
//!
//! Compiles structured finite-element result queries into command scripts
//! for the META post-processor, runs them in batch mode and turns the
//! engine's side effects into answers:
//! - per-entity result queries filtered through an LLM log interpreter
//! - maximum-result and model-information queries
//! - seven-view contour captures stitched into one image per load case
//! - CSV exports of every node or element result

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod tools;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::FemToolkit;
pub use error::{FemError, FemResult};
pub use tools::{ToolCall, ToolOutput, ToolRegistry};
