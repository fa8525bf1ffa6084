use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::filename::DEFAULT_EXTENSIONS;
use crate::processor::SyncConfig;

#[derive(Debug, Parser)]
#[command(
    name = "sync_media",
    version,
    about = "Register dated video files with a remote catalog",
    after_help = "Example:\n  sync_media sync --dir /Volumes/Videos --catalog-url http://catalog.local/hv/api/videos"
)]
pub struct Args {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send files newer than the catalog's latest timestamp
    Sync(SyncArgs),
    /// List the files that would be considered, without contacting the catalog
    Scan(SourceArgs),
}

/// Where to look and what counts as a media file
#[derive(Debug, ClapArgs)]
pub struct SourceArgs {
    /// Directory to scan recursively
    #[arg(short, long, env = "SYNC_MEDIA_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Allowed extensions, comma separated
    #[arg(
        long,
        env = "SYNC_MEDIA_EXTENSIONS",
        value_delimiter = ',',
        default_values = DEFAULT_EXTENSIONS.iter().copied()
    )]
    pub extensions: Vec<String>,
}

#[derive(Debug, ClapArgs)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Catalog base URL; `max-timestamp` and `store` are resolved against it
    #[arg(long, env = "SYNC_MEDIA_CATALOG_URL")]
    pub catalog_url: String,

    /// Seconds to wait for the catalog's latest timestamp
    #[arg(long, env = "SYNC_MEDIA_WATERMARK_TIMEOUT", default_value_t = 5)]
    pub watermark_timeout: u64,

    /// Seconds to wait for each store request
    #[arg(long, env = "SYNC_MEDIA_SUBMIT_TIMEOUT", default_value_t = 10)]
    pub submit_timeout: u64,
}

impl SourceArgs {
    /// Validate the directory exists and is a directory
    pub fn validate(&self) -> Result<()> {
        if !self.dir.exists() {
            bail!("Directory does not exist: {}", self.dir.display());
        }
        if !self.dir.is_dir() {
            bail!("Path is not a directory: {}", self.dir.display());
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            bail!("At least one extension must be given");
        }
        Ok(())
    }
}

impl SyncArgs {
    pub fn into_config(self) -> Result<SyncConfig> {
        self.source.validate()?;

        let config = SyncConfig {
            target_dir: self.source.dir,
            catalog_url: self.catalog_url,
            extensions: self.source.extensions,
            watermark_timeout: Duration::from_secs(self.watermark_timeout),
            submit_timeout: Duration::from_secs(self.submit_timeout),
        };
        config.validate()?;

        Ok(config)
    }
}
