//! # Harvesters
//!
//! A [`Harvester`] drives one harvest run: it asks a [`RecordSource`] for the
//! records of one provider and metadata format and hands each one to a
//! [`RecordStore`]. It holds no protocol state of its own; pagination and
//! retries belong to the source.
//!
//! Records flagged deleted in their header are removed from the store, every
//! other record is written (records without metadata are skipped by the store).
//!
//! ## Failure policy
//!
//! - [`FailurePolicy::FailFast`]: the first error, from the source or the
//!   store, ends the run and is returned.
//! - [`FailurePolicy::KeepGoing`]: record-level errors are collected in the
//!   [`HarvestReport`] and the run continues with the next record.
//!
//! Errors raised before iteration starts (the source refusing the request)
//! always end the run.

use crate::config::StoreConfig;
use crate::error::{HarvestError, Result};
use crate::model::Record;
use crate::source::{ListRecordsRequest, RecordSource};
use crate::store::fs::DirectoryStore;
use crate::store::{DeleteOutcome, RecordStore, WriteOutcome};
use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::ThreadPoolBuilder;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    FailFast,
    KeepGoing,
}

/// A record that could not be processed under [`FailurePolicy::KeepGoing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestFailure {
    /// `None` when the source failed before a record could be read.
    pub identifier: Option<String>,
    pub message: String,
}

/// Tally of one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub written: usize,
    /// Records without metadata for the requested format.
    pub skipped: usize,
    /// Records flagged deleted upstream.
    pub deleted: usize,
    pub failures: Vec<HarvestFailure>,
}

impl HarvestReport {
    pub fn processed(&self) -> usize {
        self.written + self.skipped + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn count(&mut self, step: Step) {
        match step {
            Step::Written => self.written += 1,
            Step::Skipped => self.skipped += 1,
            Step::Deleted => self.deleted += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Written,
    Skipped,
    Deleted,
}

struct Failed {
    identifier: Option<String>,
    error: HarvestError,
}

pub trait Harvester {
    fn harvest(
        &self,
        source: &dyn RecordSource,
        request: &ListRecordsRequest,
    ) -> Result<HarvestReport>;
}

/// Harvests into any [`RecordStore`].
pub struct StoreHarvester<S: RecordStore> {
    store: S,
    policy: FailurePolicy,
    jobs: usize,
}

/// The production harvester: records end up as files in a directory.
pub type DirectoryHarvester = StoreHarvester<DirectoryStore>;

impl DirectoryHarvester {
    pub fn in_directory(config: StoreConfig) -> Self {
        Self::new(DirectoryStore::new(config))
    }
}

impl<S: RecordStore> StoreHarvester<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: FailurePolicy::FailFast,
            jobs: 1,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of records written concurrently. `1` keeps the run sequential.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn step(
        &self,
        item: Result<Record>,
        metadata_prefix: &str,
    ) -> std::result::Result<Step, Failed> {
        let record = item.map_err(|error| Failed {
            identifier: None,
            error,
        })?;
        let outcome = if record.header.deleted {
            self.store
                .delete(&record, metadata_prefix)
                .map(|outcome| match outcome {
                    DeleteOutcome::Removed(_) | DeleteOutcome::Missing(_) => Step::Deleted,
                })
        } else {
            self.store
                .write(&record, metadata_prefix)
                .map(|outcome| match outcome {
                    WriteOutcome::Written(_) => Step::Written,
                    WriteOutcome::NoContent(_) => Step::Skipped,
                })
        };
        outcome.map_err(|error| Failed {
            identifier: Some(record.header.identifier.clone()),
            error,
        })
    }

    fn absorb(&self, report: &mut HarvestReport, failed: Failed) -> Result<()> {
        match self.policy {
            FailurePolicy::FailFast => Err(failed.error),
            FailurePolicy::KeepGoing => {
                warn!(
                    "Skipping {}: {}",
                    failed.identifier.as_deref().unwrap_or("<unreadable record>"),
                    failed.error
                );
                report.failures.push(HarvestFailure {
                    identifier: failed.identifier,
                    message: failed.error.to_string(),
                });
                Ok(())
            }
        }
    }

    fn run_sequential(
        &self,
        source: &dyn RecordSource,
        request: &ListRecordsRequest,
    ) -> Result<HarvestReport> {
        let mut report = HarvestReport::default();
        for item in source.list_records(request)? {
            match self.step(item, &request.metadata_prefix) {
                Ok(step) => report.count(step),
                Err(failed) => self.absorb(&mut report, failed)?,
            }
        }
        Ok(report)
    }

    fn run_parallel(
        &self,
        source: &dyn RecordSource,
        request: &ListRecordsRequest,
    ) -> Result<HarvestReport> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| HarvestError::Config(format!("unable to start worker pool: {}", e)))?;
        let stream = source.list_records(request)?;
        let report = Mutex::new(HarvestReport::default());

        pool.install(|| {
            stream.par_bridge().try_for_each(|item| {
                let step = self.step(item, &request.metadata_prefix);
                let mut report = lock(&report);
                match step {
                    Ok(step) => {
                        report.count(step);
                        Ok(())
                    }
                    Err(failed) => self.absorb(&mut report, failed),
                }
            })
        })?;

        Ok(report.into_inner().unwrap_or_else(|p| p.into_inner()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: RecordStore> Harvester for StoreHarvester<S> {
    fn harvest(
        &self,
        source: &dyn RecordSource,
        request: &ListRecordsRequest,
    ) -> Result<HarvestReport> {
        info!(
            "Harvesting {} from {}",
            request.metadata_prefix, request.base_url
        );
        let report = if self.jobs > 1 {
            self.run_parallel(source, request)?
        } else {
            self.run_sequential(source, request)?
        };
        info!(
            "Finished {}: {} written, {} without metadata, {} deleted, {} failed",
            request.base_url,
            report.written,
            report.skipped,
            report.deleted,
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Header;
    use crate::source::RecordStream;
    use crate::store::memory::InMemoryStore;

    /// Yields the given records, with a source error at `fail_at` if set.
    struct VecSource {
        records: Vec<Record>,
        fail_at: Option<usize>,
    }

    impl VecSource {
        fn new(records: Vec<Record>) -> Self {
            Self {
                records,
                fail_at: None,
            }
        }
    }

    impl RecordSource for VecSource {
        fn list_records(&self, _request: &ListRecordsRequest) -> Result<RecordStream> {
            let fail_at = self.fail_at;
            let items: Vec<Result<Record>> = self
                .records
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, record)| {
                    if Some(i) == fail_at {
                        Err(HarvestError::Source("connection reset".to_string()))
                    } else {
                        Ok(record)
                    }
                })
                .collect();
            Ok(Box::new(items.into_iter()))
        }
    }

    struct RefusingSource;

    impl RecordSource for RefusingSource {
        fn list_records(&self, _request: &ListRecordsRequest) -> Result<RecordStream> {
            Err(HarvestError::Source("badArgument".to_string()))
        }
    }

    fn record(identifier: &str, metadata: Option<&str>) -> Record {
        Record::new(Header::new(identifier), metadata.map(str::to_string))
    }

    fn request() -> ListRecordsRequest {
        ListRecordsRequest::new("http://example.org/oai", "oai_dc")
    }

    fn harvester() -> StoreHarvester<InMemoryStore> {
        StoreHarvester::new(InMemoryStore::new(StoreConfig::new("/out")))
    }

    #[test]
    fn test_writes_every_record() {
        let h = harvester();
        let source = VecSource::new(vec![
            record("oai:example.org:1", Some("<dc><title>A &amp; B</title></dc>")),
            record("oai:example.org:2", Some("<dc/>")),
        ]);
        let report = h.harvest(&source, &request()).unwrap();
        assert_eq!(report.written, 2);
        assert!(report.is_clean());
        assert_eq!(
            h.store().get("oai:example.org:1", "oai_dc").as_deref(),
            Some("<dc><title>A & B</title></dc>")
        );
    }

    #[test]
    fn test_records_without_metadata_are_skipped() {
        let h = harvester();
        let source = VecSource::new(vec![record("a", None), record("b", Some("<b/>"))]);
        let report = h.harvest(&source, &request()).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(h.store().len(), 1);
    }

    #[test]
    fn test_deleted_records_remove_earlier_harvest() {
        let h = harvester();
        h.harvest(&VecSource::new(vec![record("a", Some("<a/>"))]), &request())
            .unwrap();
        assert_eq!(h.store().len(), 1);

        let tombstone = Record::new(Header::new("a").mark_deleted(), None);
        let report = h
            .harvest(&VecSource::new(vec![tombstone.clone()]), &request())
            .unwrap();
        assert_eq!(report.deleted, 1);
        assert!(h.store().is_empty());

        // Already gone: still fine.
        let report = h
            .harvest(&VecSource::new(vec![tombstone]), &request())
            .unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[test]
    fn test_fail_fast_stops_at_first_source_error() {
        let h = harvester();
        let mut source = VecSource::new(vec![
            record("a", Some("<a/>")),
            record("b", Some("<b/>")),
            record("c", Some("<c/>")),
        ]);
        source.fail_at = Some(1);
        let err = h.harvest(&source, &request()).unwrap_err();
        assert!(matches!(err, HarvestError::Source(_)));
        assert_eq!(h.store().len(), 1);
        assert!(h.store().get("c", "oai_dc").is_none());
    }

    #[test]
    fn test_keep_going_collects_failures() {
        let h = harvester().with_policy(FailurePolicy::KeepGoing);
        h.store().fail_on("b");
        let mut source = VecSource::new(vec![
            record("a", Some("<a/>")),
            record("b", Some("<b/>")),
            record("c", Some("<c/>")),
            record("d", Some("<d/>")),
        ]);
        source.fail_at = Some(2);

        let report = h.harvest(&source, &request()).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].identifier.as_deref(), Some("b"));
        assert_eq!(report.failures[1].identifier, None);
        assert!(report.failures[1].message.contains("connection reset"));
    }

    #[test]
    fn test_fail_fast_on_store_error() {
        let h = harvester();
        h.store().set_simulate_write_error(true);
        let source = VecSource::new(vec![record("a", Some("<a/>"))]);
        assert!(matches!(
            h.harvest(&source, &request()),
            Err(HarvestError::Io { .. })
        ));
    }

    #[test]
    fn test_source_refusal_ends_run_regardless_of_policy() {
        let h = harvester().with_policy(FailurePolicy::KeepGoing);
        assert!(h.harvest(&RefusingSource, &request()).is_err());
    }

    #[test]
    fn test_parallel_harvest_writes_everything() {
        let h = harvester().with_jobs(4);
        let records = (0..50)
            .map(|i| record(&format!("oai:example.org:{}", i), Some("<dc/>")))
            .collect();
        let report = h.harvest(&VecSource::new(records), &request()).unwrap();
        assert_eq!(report.written, 50);
        assert_eq!(h.store().len(), 50);
    }

    #[test]
    fn test_parallel_keep_going() {
        let h = harvester()
            .with_jobs(3)
            .with_policy(FailurePolicy::KeepGoing);
        h.store().fail_on("oai:example.org:7");
        let records = (0..20)
            .map(|i| record(&format!("oai:example.org:{}", i), Some("<dc/>")))
            .collect();
        let report = h.harvest(&VecSource::new(records), &request()).unwrap();
        assert_eq!(report.written, 19);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_jobs_is_at_least_one() {
        let h = harvester().with_jobs(0);
        let report = h
            .harvest(&VecSource::new(vec![record("a", Some("<a/>"))]), &request())
            .unwrap();
        assert_eq!(report.processed(), 1);
    }

    #[test]
    fn test_keep_going_stops_on_directory_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("file://{}", dir.path().display());
        let source = crate::source::source_for(&url).unwrap();
        let h = harvester().with_policy(FailurePolicy::KeepGoing);
        let result = h.harvest(source.as_ref(), &ListRecordsRequest::new(url, "oai_dc"));
        assert!(matches!(result, Err(HarvestError::Config(_))));
        assert!(h.store().is_empty());
    }
}
