use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::WatermarkUnavailable;
use crate::filename::TIMESTAMP_FORMAT;

/// Cutoff used when the catalog is empty or unreachable; forces a full resync
pub fn epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Ask the catalog for the newest timestamp it already holds.
///
/// Never fails: an unavailable watermark is logged once and the epoch is
/// returned instead.
pub fn resolve_watermark(catalog: &dyn Catalog) -> NaiveDateTime {
    match fetch_watermark(catalog) {
        Ok(watermark) => {
            info!(watermark = %watermark.format(TIMESTAMP_FORMAT), "catalog watermark resolved");
            watermark
        }
        Err(e) => {
            warn!("catalog watermark unavailable, syncing everything: {e}");
            epoch()
        }
    }
}

/// Fallible half of [`resolve_watermark`]
pub fn fetch_watermark(catalog: &dyn Catalog) -> Result<NaiveDateTime, WatermarkUnavailable> {
    let value = catalog.max_timestamp()?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(epoch());
    }

    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| {
        WatermarkUnavailable::Parse {
            value: value.to_string(),
            source,
        }
    })
}
