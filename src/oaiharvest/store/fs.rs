use super::{DeleteOutcome, RecordStore, WriteOutcome};
use crate::config::StoreConfig;
use crate::content;
use crate::error::{HarvestError, Result};
use crate::model::Record;
use crate::path::PathBuilder;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Writes each record to its own XML file below a root directory.
pub struct DirectoryStore {
    config: StoreConfig,
    paths: PathBuilder,
}

impl DirectoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let paths = PathBuilder::from_config(&config);
        Self { config, paths }
    }

    /// Create the parent directory of `path` and any missing ancestors.
    /// Succeeds if another writer created it first.
    fn ensure_parent(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if !parent.is_dir() {
            debug!("Creating target directory {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
        Ok(())
    }

    fn write_atomic(&self, target: &Path, content: &str) -> Result<()> {
        let parent = target.parent().unwrap_or(self.config.root.as_path());
        let tmp_path = parent.join(format!(".record-{}.tmp", Uuid::new_v4()));

        let written = fs::write(&tmp_path, content)
            .map_err(|e| HarvestError::io(&tmp_path, e))
            .and_then(|()| fs::rename(&tmp_path, target).map_err(|e| HarvestError::io(target, e)));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }
}

impl RecordStore for DirectoryStore {
    fn write(&self, record: &Record, metadata_prefix: &str) -> Result<WriteOutcome> {
        let path = self.paths.path_for(record.identifier(), metadata_prefix);

        let Some(metadata) = record.content() else {
            info!(
                "No metadata for {} in {}; nothing written",
                record.identifier(),
                metadata_prefix
            );
            return Ok(WriteOutcome::NoContent(path));
        };

        self.ensure_parent(&path)?;
        debug!("Writing to file {}", path.display());

        let content = content::normalize(metadata, self.config.resolve_entities);
        self.write_atomic(&path, &content)?;
        Ok(WriteOutcome::Written(path))
    }

    fn delete(&self, record: &Record, metadata_prefix: &str) -> Result<DeleteOutcome> {
        let path = self.paths.path_for(record.identifier(), metadata_prefix);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(DeleteOutcome::Removed(path))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing to remove at {}", path.display());
                Ok(DeleteOutcome::Missing(path))
            }
            Err(e) => Err(HarvestError::io(path, e)),
        }
    }

    fn path_for(&self, identifier: &str, metadata_prefix: &str) -> PathBuf {
        self.paths.path_for(identifier, metadata_prefix)
    }
}
