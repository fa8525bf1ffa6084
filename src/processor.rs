use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, HttpCatalog, VideoPayload};
use crate::error::{RecordError, WalkError};
use crate::filename::{FilenameDecoder, MediaRecord, TIMESTAMP_FORMAT};
use crate::walker::{self, CancelToken, WalkSummary};
use crate::watermark::resolve_watermark;

/// Everything a sync run needs, supplied by the caller
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub target_dir: PathBuf,
    pub catalog_url: String,
    pub extensions: Vec<String>,
    pub watermark_timeout: Duration,
    pub submit_timeout: Duration,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_dir.exists() {
            bail!("Target directory does not exist: {}", self.target_dir.display());
        }
        if !self.target_dir.is_dir() {
            bail!("Target path is not a directory: {}", self.target_dir.display());
        }
        if self.catalog_url.trim().is_empty() {
            bail!("Catalog URL must not be empty");
        }
        if self.watermark_timeout.is_zero() {
            bail!("Watermark timeout must be positive");
        }
        if self.submit_timeout <= self.watermark_timeout {
            bail!(
                "Submit timeout ({:?}) must be longer than the watermark timeout ({:?})",
                self.submit_timeout,
                self.watermark_timeout
            );
        }
        Ok(())
    }
}

/// What happened to one decoded file
#[derive(Debug)]
pub enum SubmissionOutcome {
    Sent,
    SkippedAlreadySynced,
    Failed(RecordError),
}

impl SubmissionOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SubmissionOutcome::Sent)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SubmissionOutcome::SkippedAlreadySynced)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SubmissionOutcome::Failed(_))
    }
}

/// Tally of a sync run, in walk order
#[derive(Debug)]
pub struct SyncReport {
    pub watermark: NaiveDateTime,
    pub entries: Vec<(String, SubmissionOutcome)>,
    pub files_seen: usize,
    pub not_matched: usize,
    pub cancelled: bool,
    /// Set when the walk itself broke; entries hold what ran before that
    pub traversal_error: Option<WalkError>,
}

impl SyncReport {
    fn new(watermark: NaiveDateTime) -> Self {
        SyncReport {
            watermark,
            entries: Vec::new(),
            files_seen: 0,
            not_matched: 0,
            cancelled: false,
            traversal_error: None,
        }
    }

    pub fn sent(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_sent()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_failed()).count()
    }

    pub fn outcome(&self, file_name: &str) -> Option<&SubmissionOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, outcome)| outcome)
    }

    /// Per-record failures do not count against the run
    pub fn is_success(&self) -> bool {
        self.traversal_error.is_none()
    }

    pub fn print_summary(&self) {
        println!();
        println!("=== SYNC COMPLETE ===");
        println!("Watermark: {}", self.watermark.format(TIMESTAMP_FORMAT));
        println!("Files scanned: {}", self.files_seen);
        println!("Not matching the name pattern: {}", self.not_matched);
        println!("Sent: {}", self.sent());
        println!("Skipped (already synced): {}", self.skipped());
        println!("Failed: {}", self.failed());

        if self.cancelled {
            println!();
            println!("Run was cancelled before the walk finished");
        }
        if let Some(err) = &self.traversal_error {
            println!();
            println!("Run aborted: {}", err);
        }
    }
}

pub struct Processor<C: Catalog = HttpCatalog> {
    target_dir: PathBuf,
    decoder: FilenameDecoder,
    catalog: C,
    cancel: CancelToken,
}

impl Processor<HttpCatalog> {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let catalog = HttpCatalog::new(
            &config.catalog_url,
            config.watermark_timeout,
            config.submit_timeout,
        );
        Self::with_catalog(config, catalog)
    }
}

impl<C: Catalog> Processor<C> {
    pub fn with_catalog(config: SyncConfig, catalog: C) -> Result<Self> {
        config.validate()?;
        let decoder = FilenameDecoder::new(&config.extensions)?;

        Ok(Processor {
            target_dir: config.target_dir,
            decoder,
            catalog,
            cancel: CancelToken::new(),
        })
    }

    /// Share a cancellation flag with the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve the watermark, then submit every decoded file newer than it
    pub fn run(&self) -> SyncReport {
        if self.cancel.is_cancelled() {
            let mut report = SyncReport::new(crate::watermark::epoch());
            report.cancelled = true;
            return report;
        }

        let watermark = resolve_watermark(&self.catalog);
        let mut report = SyncReport::new(watermark);

        info!(dir = %self.target_dir.display(), "starting catalog sync");
        println!("Syncing {} against the catalog", self.target_dir.display());
        println!(
            "Latest synced timestamp: {}",
            watermark.format(TIMESTAMP_FORMAT)
        );
        println!();

        let entries = &mut report.entries;
        let mut summary = WalkSummary::default();
        let walked = walker::walk(
            &self.target_dir,
            &self.decoder,
            &self.cancel,
            &mut summary,
            |record| {
                let outcome = self.process_record(&record, watermark);
                print_outcome(&record.file_name, &outcome);
                entries.push((record.file_name, outcome));
                Ok(())
            },
        );

        report.files_seen = summary.files_seen;
        report.not_matched = summary.not_matched;
        match walked {
            Ok(()) => {}
            Err(WalkError::Cancelled) => {
                warn!("sync cancelled");
                report.cancelled = true;
            }
            Err(err) => {
                error!("{err}");
                report.traversal_error = Some(err);
            }
        }

        info!(
            sent = report.sent(),
            skipped = report.skipped(),
            failed = report.failed(),
            "catalog sync finished"
        );
        report
    }

    fn process_record(&self, record: &MediaRecord, watermark: NaiveDateTime) -> SubmissionOutcome {
        let timestamp = match record.timestamp() {
            Ok(ts) => ts,
            Err(source) => {
                let err = RecordError::TimestampParse {
                    value: record.normalized_timestamp.clone(),
                    source,
                };
                warn!(file = %record.file_name, "{err}");
                return SubmissionOutcome::Failed(err);
            }
        };

        // Equal to the watermark means the catalog already has it
        if timestamp <= watermark {
            return SubmissionOutcome::SkippedAlreadySynced;
        }

        if self.cancel.is_cancelled() {
            return SubmissionOutcome::Failed(RecordError::Cancelled);
        }

        match self.catalog.store(&VideoPayload::from_record(record)) {
            Ok(()) => SubmissionOutcome::Sent,
            Err(e) => {
                warn!(file = %record.file_name, "{e}");
                SubmissionOutcome::Failed(RecordError::Submit(e))
            }
        }
    }
}

fn print_outcome(file_name: &str, outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Sent => println!("✓ Sent: {}", file_name),
        SubmissionOutcome::SkippedAlreadySynced => {
            println!("- Skipped (already synced): {}", file_name)
        }
        SubmissionOutcome::Failed(e) => println!("✗ Failed: {}: {}", file_name, e),
    }
}
