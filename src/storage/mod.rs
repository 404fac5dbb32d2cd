//! Durable copies of the memory: compressed snapshots and a plain-text interaction log.

use bincode::{deserialize, serialize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::memory::compression::{CompressionAlgorithm, CompressionMetrics, Compressor};
use crate::memory::engine::BrainEngine;
use crate::memory::entry::MemoryNode;
use crate::memory::index::MemoryIndex;
use crate::memory::loader::{classify, LineKind};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Decompression error: {0}")]
    Decompression(#[from] lz4_flex::block::DecompressError),
    #[error("Snapshot checksum mismatch: expected {expected:08x}, found {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("Line would not reload as content: {0:?}")]
    UnstorableLine(String),
    #[error("Category cannot be written as a section header: {0:?}")]
    UnstorableCategory(String),
}

/// Where snapshots and the interaction log live
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub snapshot_path: PathBuf,
    pub log_path: PathBuf,
    pub compression_algorithm: CompressionAlgorithm,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("storage/memory.snapshot"),
            log_path: PathBuf::from("storage/interactions.txt"),
            compression_algorithm: CompressionAlgorithm::LZ4,
        }
    }
}

/// On-disk snapshot frame
#[derive(Serialize, Deserialize)]
struct SnapshotBlock {
    version: u32,
    algorithm: CompressionAlgorithm,
    node_count: u64,
    checksum: u32,
    payload: Vec<u8>,
}

pub struct StorageManager {
    config: StorageConfig,
    compressor: Compressor,
    // category of the last line appended by this manager
    last_category: Mutex<Option<String>>,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> io::Result<Self> {
        for path in [&config.snapshot_path, &config.log_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            compressor: Compressor::new(config.compression_algorithm),
            config,
            last_category: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Writes every node (with its associations) to the snapshot file.
    ///
    /// The file is written beside the target and renamed over it, so a
    /// crash never leaves a half-written snapshot behind.
    pub fn save_snapshot(&self, engine: &BrainEngine) -> Result<CompressionMetrics, StorageError> {
        let nodes = engine.snapshot_nodes();
        let data = serialize(&nodes)?;
        let (payload, metrics) = self.compressor.compress(&data);

        let block = SnapshotBlock {
            version: SNAPSHOT_VERSION,
            algorithm: self.compressor.algorithm(),
            node_count: nodes.len() as u64,
            checksum: crc32fast::hash(&payload),
            payload,
        };
        let encoded = serialize(&block)?;

        let tmp = self.config.snapshot_path.with_extension("tmp");
        fs::write(&tmp, &encoded)?;
        fs::rename(&tmp, &self.config.snapshot_path)?;

        info!(
            path = %self.config.snapshot_path.display(),
            nodes = nodes.len(),
            ratio = metrics.compression_ratio(),
            "Saved memory snapshot"
        );
        Ok(metrics)
    }

    /// Reads the snapshot back into an index, verifying its checksum.
    pub fn load_snapshot(&self, config: EngineConfig) -> Result<MemoryIndex, StorageError> {
        let encoded = fs::read(&self.config.snapshot_path)?;
        let block: SnapshotBlock = deserialize(&encoded)?;

        if block.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(block.version));
        }
        let actual = crc32fast::hash(&block.payload);
        if actual != block.checksum {
            return Err(StorageError::ChecksumMismatch {
                expected: block.checksum,
                actual,
            });
        }

        let data = Compressor::new(block.algorithm).decompress(&block.payload)?;
        let nodes: Vec<MemoryNode> = deserialize(&data)?;
        debug!(nodes = nodes.len(), expected = block.node_count, "Restored memory snapshot");
        Ok(MemoryIndex::from_nodes(nodes, config))
    }

    /// Appends an inserted line to the interaction log in corpus format.
    ///
    /// A header line is written whenever the category changes. Lines that
    /// would reload as a header or separator, and categories that would not
    /// reload as a header, are refused so the log always reloads to the
    /// same nodes and categories.
    pub fn append_line(&self, line: &str, category: &str) -> Result<(), StorageError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        if line.contains(['\n', '\r']) || classify(line) != LineKind::Content(line) {
            return Err(StorageError::UnstorableLine(line.to_string()));
        }
        if classify(category) != LineKind::Header(category) {
            return Err(StorageError::UnstorableCategory(category.to_string()));
        }

        let mut last = self.last_category.lock();
        let mut out = String::new();
        if last.as_deref() != Some(category) {
            out.push_str(category);
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.log_path)?;
        file.write_all(out.as_bytes())?;
        file.flush()?;

        *last = Some(category.to_string());
        Ok(())
    }

    /// Returns the log contents, or an empty string if nothing was logged yet.
    pub fn read_log(&self) -> Result<String, StorageError> {
        read_optional(&self.config.log_path)
    }
}

fn read_optional(path: &Path) -> Result<String, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
