//! Console output for extraction runs

use colored::*;
use sheetimg_core::{ExtractOptions, ExtractionReport, ExtractorConfig, Naming, Progress};

const RULE_WIDTH: usize = 70;

/// Print the run header
pub fn print_start(config: &ExtractorConfig, options: ExtractOptions) {
    println!("{}", "Extracting images from Excel workbook...".bold());
    println!("File: {}", config.input.display());
    if options.dry_run {
        println!("{}", "[DRY RUN] No files will be written".yellow());
    }
    println!();
}

/// Print one progress event as it happens
pub fn print_progress(event: &Progress<'_>) {
    match event {
        Progress::SheetLoaded { name, max_row } => {
            println!("{} {}", "Active sheet:".bold(), name.cyan().bold());
            println!("{} {}", "Rows:".bold(), max_row);
            println!();
        }
        Progress::SkusIndexed { count } => {
            println!("{}", format!("✓ {} SKUs found", count).green());
            println!();
        }
        Progress::NoImages => {
            println!("{}", "⚠ No images found in the workbook".yellow().bold());
            println!();
            println!("Hint: images must be embedded in the sheet,");
            println!("      not only copied and pasted as links.");
        }
        Progress::ImagesFound { count } => {
            println!("{} images found in the sheet", count);
            println!();
        }
        Progress::Image(outcome) => match &outcome.result {
            Ok(saved) if saved.naming == Naming::Generic => {
                println!(
                    "  {} Image {} saved: {}",
                    "✓".green(),
                    outcome.index + 1,
                    saved.file_name
                );
            }
            Ok(saved) => {
                let row = saved
                    .row
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let sku = saved.sku.as_deref().unwrap_or("none");
                println!(
                    "  {} Image {}: {} (row {}, SKU: {})",
                    "✓".green(),
                    saved.extracted,
                    saved.file_name,
                    row,
                    sku
                );
            }
            Err(e) => {
                eprintln!(
                    "  {} Failed to extract image {}: {}",
                    "✗".red(),
                    outcome.index + 1,
                    e
                );
            }
        },
    }
}

/// Print the end-of-run summary
pub fn print_summary(report: &ExtractionReport) {
    let rule = "=".repeat(RULE_WIDTH);
    println!();
    println!("{}", rule);
    if report.dry_run {
        println!("{}", "✓ Dry run complete!".green().bold());
        println!("{} images would be extracted", report.extracted_count());
    } else {
        println!("{}", "✓ Extraction complete!".green().bold());
        println!("{} images extracted", report.extracted_count());
    }
    if report.failed_count() > 0 {
        println!(
            "{}",
            format!("{} images skipped after errors", report.failed_count()).red()
        );
    }
    println!("Folder: {}", report.output_dir.display());
    println!("{}", rule);
}

/// Print a failure that ended the run before any image was processed
pub fn print_fatal(error: &anyhow::Error) {
    eprintln!("{} {:#}", "✗ Error:".red().bold(), error);
}
