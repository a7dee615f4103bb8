//! Error types for the sweep engine.
//!
//! Per-operation store faults never show up here: adapters swallow them and
//! report a failed attempt. What remains is classified by blast radius:
//! provisioning faults end one specification, artifact directory faults end
//! the process.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreKind;

/// Misuse of a [`WorkloadDraft`](crate::spec::WorkloadDraft).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// The draft was already finalized by `build()`.
    #[error("builder already closed")]
    BuilderClosed,
}

/// Failure to provision or initialize a store handle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to {kind} at {target}: {reason}")]
    Connect {
        kind: StoreKind,
        target: String,
        reason: String,
    },

    #[error("schema initialization failed for {kind}: {reason}")]
    Init { kind: StoreKind, reason: String },

    #[error("failed to start async runtime for {kind}")]
    Runtime {
        kind: StoreKind,
        #[source]
        source: io::Error,
    },

    #[error("{0} support is not compiled into this build")]
    Unsupported(StoreKind),
}

/// Failure to persist a run report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create artifact directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write artifact {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
}

/// Failure of a single specification (or of the whole sweep, see [`SweepError::is_fatal`]).
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("provisioning {spec} failed")]
    Provisioning {
        spec: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to spawn worker {name}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("sweep interrupted")]
    Interrupted,
}

impl SweepError {
    /// Whether this error must stop the whole sweep rather than one specification.
    ///
    /// Only artifact directory faults qualify: without a place to write results
    /// nothing else in the sweep can produce output.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SweepError::Report(ReportError::CreateDir { .. }))
    }
}
