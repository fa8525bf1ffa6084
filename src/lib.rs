pub mod args;
pub mod catalog;
pub mod error;
pub mod filename;
pub mod processor;
pub mod walker;
pub mod watermark;

pub use catalog::{Catalog, HttpCatalog, VideoPayload};
pub use error::{CatalogError, RecordError, WalkError, WatermarkUnavailable};
pub use filename::{FilenameDecoder, MediaRecord, TIMESTAMP_FORMAT};
pub use processor::{Processor, SubmissionOutcome, SyncConfig, SyncReport};
pub use walker::CancelToken;
