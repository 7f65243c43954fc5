//! Refresh pipeline: locate -> download -> parse -> reconcile.
//!
//! One invocation runs the four stages strictly in sequence. Each run owns
//! a private scratch directory for the downloaded spreadsheet, so
//! overlapping runs never race on the artifact path; the directory is
//! removed on every exit path. No retries happen here - the external
//! scheduler decides whether to call `run` again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::fetch::{FetchError, FetchPayload};
use crate::models::MedicineRecord;
use crate::parser::{ParseError, ParseSpreadsheet};
use crate::source::{LocateSource, SourceError};

/// File name of the transient artifact inside the per-run scratch directory.
const ARTIFACT_NAME: &str = "latest-medicines.xlsx";

/// Pipeline failure, carrying the originating stage's error.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Download(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("persistence error: {0}")]
    Store(#[from] DbError),

    #[error("refresh cancelled")]
    Cancelled,
}

impl RefreshError {
    /// Stable category string reported to callers.
    pub fn category(&self) -> &'static str {
        match self {
            RefreshError::Source(SourceError::NoCandidate) => "no_candidate_found",
            RefreshError::Source(_) => "source_unavailable",
            RefreshError::Download(_) => "download_failed",
            RefreshError::Parse(_) => "unreadable_spreadsheet",
            RefreshError::Store(_) => "persistence_error",
            RefreshError::Cancelled => "cancelled",
        }
    }
}

/// Outcome summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records parsed from the snapshot and submitted to reconciliation.
    pub record_count: usize,
    /// Records that did not exist in the store before this run.
    pub newly_created: usize,
}

/// Cooperative cancellation flag, checked at stage boundaries only. A
/// cancel mid-download or mid-write takes effect at the next boundary.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Orchestrates one refresh of the medicine store.
pub struct RefreshPipeline<L, F, P> {
    locator: L,
    fetcher: F,
    parser: P,
    cancel: CancelToken,
}

impl<L, F, P> RefreshPipeline<L, F, P>
where
    L: LocateSource,
    F: FetchPayload,
    P: ParseSpreadsheet,
{
    pub fn new(locator: L, fetcher: F, parser: P) -> Self {
        Self {
            locator,
            fetcher,
            parser,
            cancel: CancelToken::new(),
        }
    }

    /// Attach a cancellation token shared with the caller.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the four stages once.
    ///
    /// The store lock is held only for the reconcile stage, so reads stay
    /// live while the snapshot is being located, downloaded, and parsed.
    /// The scratch directory is removed whether the run succeeds, fails,
    /// or is cancelled; a failed removal is logged and never escalated.
    pub fn run(&self, db: &Mutex<Database>) -> Result<RefreshReport, RefreshError> {
        self.ensure_live()?;
        let url = self.locator.locate_latest()?;
        info!(url = %url, "located latest spreadsheet");

        self.ensure_live()?;
        // Scratch dir is unique per run; its guard removes the artifact on
        // every exit path, including the early-return errors below.
        let scratch = tempfile::Builder::new()
            .prefix("medindex-refresh-")
            .tempdir()
            .map_err(FetchError::Io)?;
        let artifact = scratch.path().join(ARTIFACT_NAME);
        self.fetcher.fetch(&url, &artifact)?;
        info!(path = %artifact.display(), "downloaded spreadsheet");

        self.ensure_live()?;
        let records = self.parser.parse(&artifact)?;
        info!(count = records.len(), "parsed medicine records");

        self.ensure_live()?;
        let newly_created = reconcile_locked(db, &records)?;
        info!(
            total = records.len(),
            created = newly_created,
            "reconciled snapshot into store"
        );

        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to remove scratch directory");
        }

        Ok(RefreshReport {
            record_count: records.len(),
            newly_created,
        })
    }

    fn ensure_live(&self) -> Result<(), RefreshError> {
        if self.cancel.is_cancelled() {
            Err(RefreshError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn reconcile_locked(db: &Mutex<Database>, records: &[MedicineRecord]) -> Result<usize, RefreshError> {
    let mut db = db.lock().map_err(|_| DbError::LockPoisoned)?;
    Ok(db.reconcile(records)?)
}
