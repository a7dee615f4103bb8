//! Run reports and their on-disk artifacts.
//!
//! One CSV file per specification at `<root>/<store>/<host>/<name>.csv`. The
//! file is written once, in full, through a temporary file in the same
//! directory, and never replaced. Its existence is the resume marker.

use crate::error::ReportError;
use crate::metrics::MetricsSnapshot;
use crate::store::StoreKind;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Header row of every artifact.
pub const HEADER: [&str; 5] = ["'Time'", "'ReadOps'", "'ReadErr'", "'WriteOps'", "'WriteErr'"];

/// One sampled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub tick: u32,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
}

/// Ordered, append-only series of samples for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    samples: Vec<Sample>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(ticks: usize) -> Self {
        Self {
            samples: Vec::with_capacity(ticks),
        }
    }

    pub fn push(&mut self, tick: u32, snapshot: MetricsSnapshot) {
        self.samples.push(Sample { tick, snapshot });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum over every sample.
    pub fn totals(&self) -> MetricsSnapshot {
        self.samples.iter().fold(MetricsSnapshot::default(), |acc, s| MetricsSnapshot {
            read_ops: acc.read_ops + s.snapshot.read_ops,
            read_errors: acc.read_errors + s.snapshot.read_errors,
            write_ops: acc.write_ops + s.snapshot.write_ops,
            write_errors: acc.write_errors + s.snapshot.write_errors,
        })
    }

    /// Serialize as CSV: header, then `tick,readOps,readErr,writeOps,writeErr` rows.
    pub fn write_csv<W: Write>(&self, out: W) -> io::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        writer.write_record(HEADER)?;
        for sample in &self.samples {
            let s = &sample.snapshot;
            writer.write_record([
                sample.tick.to_string(),
                s.read_ops.to_string(),
                s.read_errors.to_string(),
                s.write_ops.to_string(),
                s.write_errors.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Locates, checks and writes run artifacts under one output root.
#[derive(Debug, Clone)]
pub struct ReportSink {
    root: PathBuf,
    host: String,
}

impl ReportSink {
    pub fn new(root: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            host: host.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Deterministic artifact location for a store and run name.
    pub fn artifact_path(&self, store: StoreKind, name: &str) -> PathBuf {
        self.root
            .join(store.name())
            .join(&self.host)
            .join(format!("{name}.csv"))
    }

    /// Whether the run already has an artifact (and must be skipped).
    pub fn exists(&self, store: StoreKind, name: &str) -> bool {
        self.artifact_path(store, name).exists()
    }

    /// Create the output root. Failing here means no run can produce output.
    pub fn prepare(&self) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.root).map_err(|source| ReportError::CreateDir {
            path: self.root.clone(),
            source,
        })
    }

    /// Write `report` to its artifact path, creating parent directories.
    ///
    /// Never overwrites: an existing artifact yields [`ReportError::AlreadyExists`].
    pub fn persist(
        &self,
        store: StoreKind,
        name: &str,
        report: &RunReport,
    ) -> Result<PathBuf, ReportError> {
        let path = self.artifact_path(store, name);
        let dir = path
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        std::fs::create_dir_all(&dir).map_err(|source| ReportError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        if path.exists() {
            return Err(ReportError::AlreadyExists { path });
        }

        let write_err = |source: io::Error| ReportError::Write {
            path: path.clone(),
            source,
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        report.write_csv(temp.as_file_mut()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        temp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                ReportError::AlreadyExists { path: path.clone() }
            } else {
                write_err(e.error)
            }
        })?;

        tracing::debug!("Wrote {} samples to {}", report.len(), path.display());
        Ok(path)
    }
}
