//! Lexical associative memory for the ARA Guardian assistant.
//!
//! A flat knowledge base of text lines is indexed by normalized tokens and
//! category, linked by a bounded co-occurrence graph, and queried with
//! substring and token-overlap scoring.

pub mod config;
pub mod memory;
pub mod storage;

pub use config::EngineConfig;
pub use memory::engine::BrainEngine;
pub use memory::entry::{MemoryNode, NodeId};
pub use memory::query::{QueryOutcome, NO_MEMORY_SENTINEL};
