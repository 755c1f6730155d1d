use super::{ListRecordsRequest, RecordSource, RecordStream};
use crate::error::{HarvestError, Result};
use crate::model::{Header, Record};
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use tracing::debug;

/// Replays records from a JSON-lines dump, one record object per line:
///
/// ```text
/// {"header": {"identifier": "oai:example.org:1", "datestamp": "2024-01-31"}, "metadata": "<dc/>"}
/// ```
///
/// The `from`, `until` and `set` arguments of the request are applied to the
/// headers the same way a provider would apply them. A line that cannot be
/// read ends the stream after its error is yielded; a line that cannot be
/// parsed does not.
pub struct DumpSource {
    path: PathBuf,
}

impl DumpSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for DumpSource {
    fn list_records(&self, request: &ListRecordsRequest) -> Result<RecordStream> {
        request.validate()?;
        let meta = fs::metadata(&self.path).map_err(|e| HarvestError::io(&self.path, e))?;
        if !meta.is_file() {
            return Err(HarvestError::Config(format!(
                "record dump {} is not a file",
                self.path.display()
            )));
        }
        let file = File::open(&self.path).map_err(|e| HarvestError::io(&self.path, e))?;
        debug!("Replaying records from {}", self.path.display());
        Ok(Box::new(DumpStream {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            done: false,
            filter: Filter::from_request(request),
        }))
    }
}

struct DumpStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    done: bool,
    filter: Filter,
}

impl Iterator for DumpStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(HarvestError::io(&self.path, e)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    return Some(Err(HarvestError::Source(format!(
                        "{}:{}: {}",
                        self.path.display(),
                        self.line_no,
                        e
                    ))))
                }
            };
            match self.filter.accepts(&record.header) {
                Ok(true) => return Some(Ok(record)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

struct Filter {
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
    set: Option<String>,
}

impl Filter {
    fn from_request(request: &ListRecordsRequest) -> Self {
        Self {
            from: request.from,
            until: request.until,
            set: request.set.clone(),
        }
    }

    fn accepts(&self, header: &Header) -> Result<bool> {
        if let Some(set) = &self.set {
            if !header.set_specs.iter().any(|spec| in_set(spec, set)) {
                return Ok(false);
            }
        }
        if self.from.is_none() && self.until.is_none() {
            return Ok(true);
        }
        let day = datestamp_day(&header.datestamp).ok_or_else(|| {
            HarvestError::Source(format!(
                "record {} has an invalid datestamp {:?}",
                header.identifier, header.datestamp
            ))
        })?;
        Ok(self.from.map_or(true, |from| day >= from)
            && self.until.map_or(true, |until| day <= until))
    }
}

/// Set membership is hierarchical: a record in `a:b` is also in `a`.
fn in_set(spec: &str, set: &str) -> bool {
    spec == set
        || spec
            .strip_prefix(set)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// The day part of a `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ssZ` datestamp.
fn datestamp_day(datestamp: &str) -> Option<NaiveDate> {
    let day = datestamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
