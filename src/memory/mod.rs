//! Core logic for indexing, associating and matching memory lines.

pub mod associations;
pub mod compression;
pub mod engine;
pub mod entry;
pub mod index;
pub mod loader;
pub mod query;
pub mod tokenizer;

pub use engine::{format_interaction, BrainEngine, INTERACTIONS_CATEGORY};
pub use entry::{MemoryNode, NodeId};
pub use index::{IndexStats, MemoryIndex};
pub use query::{QueryOutcome, ScoredNode, NO_MEMORY_SENTINEL};
pub use tokenizer::{content_id, tokenize, STOPWORDS};
