//! sheetimg-core: extract pictures embedded in a spreadsheet and name each
//! file after the SKU found on the picture's row.

pub mod config;
pub mod error;
pub mod extract;
pub mod naming;
pub mod reader;
pub mod sku;

use anyhow::{Context, Result};
use std::fs;

pub use config::{ColumnRef, ExtractorConfig};
pub use error::ExtractError;
pub use extract::{ExtractOptions, ExtractionReport, ImageOutcome, Naming, Progress, SavedImage};
pub use sku::SkuIndex;

/// Main extraction interface
pub struct ImageExtractor {
    config: ExtractorConfig,
}

impl ImageExtractor {
    /// Create an extractor with the built-in defaults
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create an extractor with custom configuration
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run without progress reporting
    pub fn run(&self, options: ExtractOptions) -> Result<ExtractionReport> {
        self.run_with_progress(options, |_| {})
    }

    /// Create the output directory, load the workbook, index SKUs and
    /// extract every picture of the active sheet.
    ///
    /// Errors are fatal: the output directory could not be created or the
    /// workbook could not be loaded. Per-image failures are inside the report.
    pub fn run_with_progress<F>(
        &self,
        options: ExtractOptions,
        mut on_progress: F,
    ) -> Result<ExtractionReport>
    where
        F: FnMut(Progress<'_>),
    {
        let config = &self.config;
        let sku_column = config.sku_column_index()?;

        if !options.dry_run {
            fs::create_dir_all(&config.output_dir).with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    config.output_dir.display()
                )
            })?;
        }

        let workbook = reader::read_workbook(&config.input)?;
        let sheet = &workbook.active_sheet;
        on_progress(Progress::SheetLoaded {
            name: &sheet.name,
            max_row: sheet.max_row(),
        });

        let skus = SkuIndex::build(sheet, sku_column, config.first_data_row);
        on_progress(Progress::SkusIndexed { count: skus.len() });

        let outcomes = if sheet.images.is_empty() {
            on_progress(Progress::NoImages);
            Vec::new()
        } else {
            on_progress(Progress::ImagesFound {
                count: sheet.images.len(),
            });
            extract::extract_images(
                sheet,
                &skus,
                &config.output_dir,
                options,
                &mut on_progress,
            )
        };

        Ok(ExtractionReport {
            sheet_name: sheet.name.clone(),
            output_dir: config.output_dir.clone(),
            sku_count: skus.len(),
            outcomes,
            dry_run: options.dry_run,
        })
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}
