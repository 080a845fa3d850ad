pub mod batch;
pub mod info;
pub mod query;
pub mod summary;

use anyhow::{Context, Result};
use geoelev::{ElevationService, ElevationServiceBuilder};
use std::path::PathBuf;

/// Options shared by every command that needs a service.
pub struct ServiceOptions {
    pub data_dir: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub open_handles: usize,
    pub cache_all: bool,
}

impl ServiceOptions {
    /// Builder for the configured data directory.
    pub fn builder(&self) -> Result<ElevationServiceBuilder> {
        let data_dir = self.data_dir.as_ref().context(
            "GEOELEV_DATA_DIR environment variable not set. Use --data-dir or set GEOELEV_DATA_DIR",
        )?;
        if !data_dir.is_dir() {
            anyhow::bail!("Data directory does not exist: {}", data_dir.display());
        }

        let mut builder = ElevationServiceBuilder::new(data_dir)
            .open_handles(self.open_handles)
            .resident(self.cache_all);
        if let Some(summary) = &self.summary {
            builder = builder.summary_file(summary);
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<ElevationService> {
        self.builder()?
            .build()
            .context("Failed to create elevation service")
    }
}
