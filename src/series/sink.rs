//! Durable series sink and its reader.
//!
//! The writer flushes after every record so an abrupt stop loses at most the row
//! being written. The reader tolerates exactly that: a malformed final row is
//! skipped with a warning, while a malformed row anywhere else is an error.

use csv::{ReaderBuilder, StringRecord, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::codec::{decode_per_core, decode_timestamp, encode_float, encode_per_core};
use crate::constants::series::{CPU_PERCENT_FIELD, TIMESTAMP_FIELD};
use crate::error::{HarnessError, Result};
use crate::types::{Series, SwitchEvent, UtilizationSample};

/// Append-only writer for one run's series.
pub struct SeriesWriter<W: Write> {
    writer: Writer<W>,
    path: PathBuf,
    core_count: Option<usize>,
    written: u64,
}

impl SeriesWriter<File> {
    /// Create (truncate) the sink at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| HarnessError::SinkWrite {
            path: path.clone(),
            source: e.into(),
        })?;
        Self::from_writer(file, path)
    }
}

impl<W: Write> SeriesWriter<W> {
    /// Wrap an arbitrary writer; `path` only labels errors.
    pub fn from_writer(inner: W, path: impl Into<PathBuf>) -> Result<Self> {
        let mut sink = Self {
            writer: Writer::from_writer(inner),
            path: path.into(),
            core_count: None,
            written: 0,
        };
        sink.write_row(&[TIMESTAMP_FIELD, CPU_PERCENT_FIELD])?;
        debug!("Series sink {:?} opened", sink.path);
        Ok(sink)
    }

    /// Append one sample and flush it.
    ///
    /// The first sample fixes the core count; later samples must match it.
    pub fn append(&mut self, sample: &UtilizationSample) -> Result<()> {
        let actual = sample.core_count();
        match self.core_count {
            Some(expected) if expected != actual => {
                return Err(HarnessError::CoreCountMismatch { expected, actual });
            }
            Some(_) => {}
            None => self.core_count = Some(actual),
        }

        let timestamp = encode_float(sample.timestamp);
        let per_core = encode_per_core(&sample.per_core);
        self.write_row(&[timestamp.as_str(), per_core.as_str()])?;
        self.written += 1;
        Ok(())
    }

    pub fn samples_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        let path = self.path;
        self.writer
            .into_inner()
            .map_err(|e| HarnessError::SinkWrite {
                path,
                source: e.into_error().into(),
            })
    }

    fn write_row(&mut self, fields: &[&str]) -> Result<()> {
        self.writer
            .write_record(fields)
            .and_then(|_| self.writer.flush().map_err(csv::Error::from))
            .map_err(|source| HarnessError::SinkWrite {
                path: self.path.clone(),
                source,
            })
    }
}

/// Decode a series from any reader.
///
/// Returns an empty series when there are no data rows; [`load_series`] turns that
/// into [`HarnessError::EmptySeries`].
pub fn read_series<R: Read>(reader: R) -> Result<Series> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Series::default());
    }
    if headers.get(0) != Some(TIMESTAMP_FIELD) || headers.get(1) != Some(CPU_PERCENT_FIELD) {
        return Err(HarnessError::MalformedRecord {
            line: 1,
            reason: format!(
                "expected header \"{},{}\", found {:?}",
                TIMESTAMP_FIELD, CPU_PERCENT_FIELD, headers
            ),
        });
    }

    let rows: Vec<csv::Result<StringRecord>> = reader.records().collect();
    let last = rows.len().saturating_sub(1);
    let mut samples: Vec<UtilizationSample> = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let decoded = row
            .map_err(|e| (e.position().map(|p| p.line()).unwrap_or(0), e.to_string()))
            .and_then(|record| {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                decode_row(&record).map_err(|reason| (line, reason))
            });

        match decoded {
            Ok(sample) => {
                if let Some(first) = samples.first() {
                    if first.core_count() != sample.core_count() {
                        return Err(HarnessError::CoreCountMismatch {
                            expected: first.core_count(),
                            actual: sample.core_count(),
                        });
                    }
                }
                samples.push(sample);
            }
            Err((line, reason)) if index == last => {
                warn!("Skipping torn final record at line {}: {}", line, reason);
            }
            Err((line, reason)) => {
                return Err(HarnessError::MalformedRecord { line, reason });
            }
        }
    }

    Ok(Series::new(samples))
}

fn decode_row(record: &StringRecord) -> std::result::Result<UtilizationSample, String> {
    if record.len() != 2 {
        return Err(format!("expected 2 fields, found {}", record.len()));
    }
    let timestamp = decode_timestamp(&record[0])?;
    let per_core = decode_per_core(&record[1])?;
    Ok(UtilizationSample::new(timestamp, per_core))
}

/// Load the series at `path`, failing with [`HarnessError::EmptySeries`] when it has
/// no samples.
pub fn load_series(path: impl AsRef<Path>) -> Result<Series> {
    let path = path.as_ref();
    let series = read_series(File::open(path)?)?;
    if series.is_empty() {
        return Err(HarnessError::EmptySeries(path.to_path_buf()));
    }
    debug!("Loaded {} samples from {:?}", series.len(), path);
    Ok(series)
}

/// Persist switch events as `timestamp,core_index` rows.
pub fn write_switch_events(path: impl AsRef<Path>, events: &[SwitchEvent]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_switch_events(path: impl AsRef<Path>) -> Result<Vec<SwitchEvent>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let events = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SwitchEvent>, _>>()?;
    Ok(events)
}
