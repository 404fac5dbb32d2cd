//! Token normalization and content hashing.

use sha2::{Digest, Sha256};

use super::entry::NodeId;

/// Common English words ignored by indexing and scoring.
///
/// Changing this list changes match results for existing corpora.
pub const STOPWORDS: [&str; 40] = [
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "this",
    "with",
];

/// Splits text into lowercase alphanumeric tokens longer than two characters,
/// with stopwords removed. Order is preserved and duplicates are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Derives a node id from line content: the first 16 hex chars of its SHA-256.
pub fn content_id(content: &str) -> NodeId {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    NodeId::from(hex)
}
