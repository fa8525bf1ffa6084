use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::WalkError;
use crate::filename::{FilenameDecoder, MediaRecord};

/// Shared flag checked between files and before network calls
#[derive(Debug, Clone, Default)]
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

/// What a finished walk saw
#[derive(Debug, Default)]
pub struct WalkSummary {
    pub files_seen: usize,
    pub records: usize,
    pub not_matched: usize,
    /// Handler errors, keyed by file name. They never stop the walk.
    pub handler_errors: Vec<(String, anyhow::Error)>,
}

/// Recursively visit every regular file under `root` in file-name order and
/// hand each decodable one to `on_record`.
///
/// Only traversal errors (unreadable directories, vanished paths) end the
/// walk early. Counters in `summary` are kept up to date either way.
pub fn walk<F>(
    root: &Path,
    decoder: &FilenameDecoder,
    cancel: &CancelToken,
    summary: &mut WalkSummary,
    mut on_record: F,
) -> Result<(), WalkError>
where
    F: FnMut(MediaRecord) -> anyhow::Result<()>,
{
    for entry_result in WalkDir::new(root).sort_by_file_name() {
        if cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        let entry = entry_result.map_err(|err| {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            WalkError::Traversal { path, source: err }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        summary.files_seen += 1;

        let Some(record) = decoder.decode_path(entry.path()) else {
            summary.not_matched += 1;
            debug!(path = %entry.path().display(), "skip: file name does not match");
            continue;
        };
        summary.records += 1;

        let file_name = record.file_name.clone();
        if let Err(e) = on_record(record) {
            warn!(file = %file_name, "record handler failed: {e:#}");
            summary.handler_errors.push((file_name, e));
        }
    }

    Ok(())
}

/// Collect every decodable record under `root` without side effects
pub fn scan(root: &Path, decoder: &FilenameDecoder) -> Result<Vec<MediaRecord>, WalkError> {
    let mut found = Vec::new();
    let mut summary = WalkSummary::default();
    walk(root, decoder, &CancelToken::new(), &mut summary, |record| {
        found.push(record);
        Ok(())
    })?;
    Ok(found)
}
