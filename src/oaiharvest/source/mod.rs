//! # Record Sources
//!
//! The boundary to whatever produces records. An OAI-PMH protocol client sits
//! behind [`RecordSource`]: it owns the verbs, resumption tokens and selective
//! harvesting, and hands out a forward-only stream of [`Record`]s. Nothing in
//! this crate speaks OAI-PMH itself.
//!
//! The stream is lazy and may only be consumed once; its length is unknown
//! until it is exhausted. Errors are yielded in-band so a harvester can decide
//! whether one bad item ends the run.
//!
//! [`dump::DumpSource`] is the one built-in source: it replays records from a
//! JSON-lines dump on disk.

use crate::error::{HarvestError, Result};
use crate::model::Record;
use chrono::NaiveDate;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

pub mod dump;

pub type RecordStream = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Arguments of a "list records" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRecordsRequest {
    pub base_url: String,
    pub metadata_prefix: String,
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub set: Option<String>,
}

impl ListRecordsRequest {
    pub fn new(base_url: impl Into<String>, metadata_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            metadata_prefix: metadata_prefix.into(),
            from: None,
            until: None,
            set: None,
        }
    }

    pub fn with_from(mut self, from: Option<NaiveDate>) -> Self {
        self.from = from;
        self
    }

    pub fn with_until(mut self, until: Option<NaiveDate>) -> Self {
        self.until = until;
        self
    }

    pub fn with_set(mut self, set: Option<String>) -> Self {
        self.set = set;
        self
    }

    /// Reject a `from` bound that lies after the `until` bound.
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(until)) = (self.from, self.until) {
            if from > until {
                return Err(HarvestError::Config(format!(
                    "--from {} is after --until {}",
                    from, until
                )));
            }
        }
        Ok(())
    }
}

pub trait RecordSource {
    fn list_records(&self, request: &ListRecordsRequest) -> Result<RecordStream>;
}

/// Pick a source for a provider base URL.
///
/// `file://` URLs and existing local paths are record dumps. Network providers
/// need an OAI-PMH protocol client, which is not part of this crate.
pub fn source_for(base_url: &str) -> Result<Box<dyn RecordSource>> {
    if let Some(rest) = base_url.strip_prefix("file://") {
        return Ok(Box::new(dump::DumpSource::new(file_url_path(rest)?)));
    }
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        return Err(HarvestError::Config(format!(
            "no OAI-PMH protocol client is available for {}",
            base_url
        )));
    }
    if Path::new(base_url).is_file() {
        return Ok(Box::new(dump::DumpSource::new(base_url)));
    }
    Err(HarvestError::Config(format!(
        "unsupported provider reference {:?}",
        base_url
    )))
}

/// The local path of a `file://` URL, given the part after the scheme. Only
/// an empty host or `localhost` is accepted.
fn file_url_path(rest: &str) -> Result<PathBuf> {
    let path = match rest.find('/') {
        Some(0) => rest,
        Some(i) if rest[..i].eq_ignore_ascii_case("localhost") => &rest[i..],
        _ => {
            return Err(HarvestError::Config(format!(
                "file://{} must name a local absolute path",
                rest
            )))
        }
    };
    let decoded = percent_decode_str(path).decode_utf8().map_err(|_| {
        HarvestError::Config(format!("file://{} is not valid UTF-8 once decoded", rest))
    })?;
    Ok(PathBuf::from(decoded.into_owned()))
}
