use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;

/// Layout of a normalized timestamp, e.g. `2025-09-13 18:06:25`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extensions accepted when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// A media file decoded from its name, e.g. `Trip A 2024-01-02 03-04-05.mp4`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub title: String,
    /// Timestamp as written in the file name (`YYYY-MM-DD HH-MM-SS`)
    pub raw_timestamp: String,
    pub file_name: String,
    /// Timestamp in `YYYY-MM-DD HH:MM:SS` form
    pub normalized_timestamp: String,
}

impl MediaRecord {
    /// Parse the normalized timestamp for comparison against a watermark
    pub fn timestamp(&self) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(&self.normalized_timestamp, TIMESTAMP_FORMAT)
    }
}

/// Matches `<title> <YYYY-MM-DD HH-MM-SS>.<ext>` against an extension allow-list
#[derive(Debug, Clone)]
pub struct FilenameDecoder {
    pattern: Regex,
}

impl FilenameDecoder {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            bail!("At least one media extension must be allowed");
        }

        // ASCII-only classes: full-width digits or U+3000 must not match
        let pattern = format!(
            r"^(.+?)[ \t\n\f\r]([0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}[ \t\n\f\r][0-9]{{2}}-[0-9]{{2}}-[0-9]{{2}})\.(?i:{})$",
            alternatives.join("|")
        );
        let pattern = Regex::new(&pattern)
            .with_context(|| format!("Invalid extension list: {}", alternatives.join(",")))?;

        Ok(FilenameDecoder { pattern })
    }

    /// Decode a base file name. `None` means the file is not one of ours.
    pub fn decode(&self, file_name: &str) -> Option<MediaRecord> {
        let captures = self.pattern.captures(file_name)?;

        let title = captures[1].trim();
        if title.is_empty() {
            return None;
        }
        let raw_timestamp = captures[2].to_string();
        let normalized_timestamp = normalize_timestamp(&raw_timestamp);

        Some(MediaRecord {
            title: title.to_string(),
            raw_timestamp,
            file_name: file_name.to_string(),
            normalized_timestamp,
        })
    }

    /// Decode the base name of a path
    pub fn decode_path(&self, path: &Path) -> Option<MediaRecord> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        self.decode(file_name)
    }
}

/// Convert `YYYY-MM-DD HH-MM-SS` to `YYYY-MM-DD HH:MM:SS`.
///
/// Anything that is not a date and a three-part time separated by a single
/// space is returned unchanged; parsing it later fails and the record is
/// reported instead of submitted.
pub fn normalize_timestamp(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(' ').collect();
    if parts.len() != 2 || parts[1].split('-').count() != 3 {
        return raw.to_string();
    }
    format!("{} {}", parts[0], parts[1].replace('-', ":"))
}
