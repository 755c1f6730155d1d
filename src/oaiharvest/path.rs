//! # Record Paths
//!
//! Maps a record identifier and metadata prefix to the file the record is
//! stored in:
//!
//! ```text
//! <root>/[<escaped-subdirs>/]<escaped-identifier>.<metadataPrefix>.xml
//! ```
//!
//! This layout is what other tooling reads, so the escaping rules are fixed:
//!
//! - ASCII letters, digits and `_ . - ~` are kept as they are.
//! - `:` is kept on platforms that allow it in file names, and escaped to
//!   `%3A` on Windows.
//! - Every other byte of the UTF-8 name is percent-escaped with uppercase hex,
//!   including `%` itself, which keeps the mapping injective.
//!
//! With sub-directory decomposition enabled, the name is first split on the
//! platform separator (after turning the marker, if any, into separators) and
//! each component is escaped on its own. Empty components are dropped and
//! dot-only components are escaped, so the result always stays below the root.

use crate::config::{StoreConfig, SubdirMode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{PathBuf, MAIN_SEPARATOR};

const ESCAPED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

#[cfg(not(windows))]
const FILENAME_ESCAPED: &AsciiSet = &ESCAPED.remove(b':');

#[cfg(windows)]
const FILENAME_ESCAPED: &AsciiSet = ESCAPED;

pub const FILE_SUFFIX: &str = "xml";

/// Derives record file paths below a fixed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuilder {
    root: PathBuf,
    subdirs: SubdirMode,
}

impl PathBuilder {
    pub fn new(root: impl Into<PathBuf>, subdirs: SubdirMode) -> Self {
        Self {
            root: root.into(),
            subdirs,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone(), config.subdirs)
    }

    /// The file name a record would have before any escaping.
    pub fn raw_filename(identifier: &str, metadata_prefix: &str) -> String {
        format!("{}.{}.{}", identifier, metadata_prefix, FILE_SUFFIX)
    }

    /// Compute the path of the stored record. Total: every input string maps
    /// to a path strictly below the root.
    pub fn path_for(&self, identifier: &str, metadata_prefix: &str) -> PathBuf {
        let filename = Self::raw_filename(identifier, metadata_prefix);
        let mut path = self.root.clone();

        match self.subdirs {
            SubdirMode::Off => path.push(escape_component(&filename)),
            SubdirMode::Separator => push_components(&mut path, &filename),
            SubdirMode::Marker(marker) => {
                let replaced = filename.replace(marker, &MAIN_SEPARATOR.to_string());
                push_components(&mut path, &replaced);
            }
        }
        path
    }
}

fn push_components(path: &mut PathBuf, filename: &str) {
    for component in filename.split(MAIN_SEPARATOR).filter(|c| !c.is_empty()) {
        path.push(escape_component(component));
    }
}

/// Percent-escape one path component.
pub fn escape_component(component: &str) -> String {
    if component.chars().all(|c| c == '.') {
        return component.replace('.', "%2E");
    }
    utf8_percent_encode(component, FILENAME_ESCAPED).to_string()
}
