use super::{DeleteOutcome, RecordStore, WriteOutcome};
use crate::config::StoreConfig;
use crate::content;
use crate::error::{HarvestError, Result};
use crate::model::Record;
use crate::path::PathBuilder;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory record store for testing.
///
/// Keys are the same paths a [`super::fs::DirectoryStore`] with the same
/// configuration would write, so path behavior can be asserted without
/// touching the filesystem.
pub struct InMemoryStore {
    config: StoreConfig,
    paths: PathBuilder,
    files: Mutex<HashMap<PathBuf, String>>,
    fail_identifier: Mutex<Option<String>>,
    simulate_write_error: AtomicBool,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let paths = PathBuilder::from_config(&config);
        Self {
            config,
            paths,
            files: Mutex::new(HashMap::new()),
            fail_identifier: Mutex::new(None),
            simulate_write_error: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Make writes of one particular identifier fail.
    pub fn fail_on(&self, identifier: &str) {
        *lock(&self.fail_identifier) = Some(identifier.to_string());
    }

    pub fn get(&self, identifier: &str, metadata_prefix: &str) -> Option<String> {
        let path = self.paths.path_for(identifier, metadata_prefix);
        lock(&self.files).get(&path).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn should_fail(&self, identifier: &str) -> bool {
        self.simulate_write_error.load(Ordering::SeqCst)
            || lock(&self.fail_identifier).as_deref() == Some(identifier)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordStore for InMemoryStore {
    fn write(&self, record: &Record, metadata_prefix: &str) -> Result<WriteOutcome> {
        let path = self.paths.path_for(record.identifier(), metadata_prefix);
        let Some(metadata) = record.content() else {
            return Ok(WriteOutcome::NoContent(path));
        };
        if self.should_fail(record.identifier()) {
            return Err(HarvestError::io(
                path,
                std::io::Error::other("simulated write error"),
            ));
        }
        let content = content::normalize(metadata, self.config.resolve_entities);
        lock(&self.files).insert(path.clone(), content);
        Ok(WriteOutcome::Written(path))
    }

    fn delete(&self, record: &Record, metadata_prefix: &str) -> Result<DeleteOutcome> {
        let path = self.paths.path_for(record.identifier(), metadata_prefix);
        match lock(&self.files).remove(&path) {
            Some(_) => Ok(DeleteOutcome::Removed(path)),
            None => Ok(DeleteOutcome::Missing(path)),
        }
    }

    fn path_for(&self, identifier: &str, metadata_prefix: &str) -> PathBuf {
        self.paths.path_for(identifier, metadata_prefix)
    }
}
