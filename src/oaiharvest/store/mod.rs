//! # Storage Layer
//!
//! A [`RecordStore`] persists or removes the stored form of one record for one
//! metadata format. The harvester only talks to the trait, so other backends
//! (an archive file, a key-value store) can sit behind the same contract.
//!
//! ## Implementations
//!
//! - [`fs::DirectoryStore`]: one XML file per (identifier, metadataPrefix)
//!   below a root directory, laid out by [`crate::path::PathBuilder`].
//! - [`memory::InMemoryStore`]: same paths and content rules, kept in a map.
//!   Used for testing.
//!
//! ## Contract
//!
//! - `write` and `delete` for the same identifier and prefix always address
//!   the same path.
//! - A record without metadata is skipped, not an error.
//! - Deleting something that is not there is not an error.
//! - Stores are shared read-only between worker threads, hence `Send + Sync`.

use crate::error::Result;
use crate::model::Record;
use std::path::{Path, PathBuf};

pub mod fs;
pub mod memory;

/// What `write` did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// The record carried no metadata; nothing was stored.
    NoContent(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written(path) | WriteOutcome::NoContent(path) => path,
        }
    }
}

/// What `delete` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(PathBuf),
    Missing(PathBuf),
}

pub trait RecordStore: Send + Sync {
    /// Store the record's metadata, replacing any earlier version.
    fn write(&self, record: &Record, metadata_prefix: &str) -> Result<WriteOutcome>;

    /// Remove the stored metadata of the record, if any.
    fn delete(&self, record: &Record, metadata_prefix: &str) -> Result<DeleteOutcome>;

    /// Where the record is (or would be) stored.
    fn path_for(&self, identifier: &str, metadata_prefix: &str) -> PathBuf;
}
