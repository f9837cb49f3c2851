use anyhow::{Context, Result};
use clap::Parser;
use sheetimg_core::{ColumnRef, ExtractOptions, ExtractorConfig, ImageExtractor};
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "sheetimg")]
#[command(about = "Extract images embedded in a spreadsheet, named after the SKU on their row", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the Excel file (defaults to the configured input)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Directory the images are written to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Column holding the SKU, as a number (2) or letters (B)
    #[arg(long, value_name = "COL")]
    sku_column: Option<ColumnRef>,

    /// First data row; rows above it are headers
    #[arg(long, value_name = "ROW")]
    first_row: Option<u32>,

    /// Show the file names that would be written without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn load_config(cli: &Cli) -> Result<ExtractorConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        ExtractorConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetimg.toml");
        if default_config_path.exists() {
            ExtractorConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            ExtractorConfig::default()
        }
    };

    if let Some(file) = &cli.file {
        config.input = file.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if let Some(column) = &cli.sku_column {
        config.sku_column = column.clone();
    }
    if let Some(row) = cli.first_row {
        config.first_data_row = row;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let extractor = ImageExtractor::with_config(config);
    let options = ExtractOptions {
        dry_run: cli.dry_run,
    };

    formatter::print_start(extractor.config(), options);

    match extractor.run_with_progress(options, |event| formatter::print_progress(&event)) {
        Ok(report) => formatter::print_summary(&report),
        // Load failures end the run but are not a process failure
        Err(e) => formatter::print_fatal(&e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "sheetimg",
            "catalog.xlsx",
            "--output",
            "out",
            "--sku-column",
            "C",
            "--first-row",
            "3",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.input, PathBuf::from("catalog.xlsx"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.sku_column_index().unwrap(), 3);
        assert_eq!(config.first_data_row, 3);
    }

    #[test]
    fn test_invalid_column_is_rejected() {
        let cli = Cli::parse_from(["sheetimg", "--sku-column", "0"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["sheetimg", "--config", "does-not-exist.toml"]);
        assert!(load_config(&cli).is_err());
    }
}
