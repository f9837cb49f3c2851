//! Configuration for an extraction run

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Workbook read when nothing else is configured
pub const DEFAULT_INPUT: &str = "ARTICLES BAZAR.xlsx";
/// Directory images are written to when nothing else is configured
pub const DEFAULT_OUTPUT_DIR: &str = "images_produits";
/// Column B holds the product reference
pub const DEFAULT_SKU_COLUMN: u32 = 2;
/// Row 1 is the header
pub const DEFAULT_FIRST_DATA_ROW: u32 = 2;

/// A column given either as a 1-based number or as letters (`B`, `AA`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(u32),
    Letters(String),
}

impl ColumnRef {
    /// 1-based column index
    pub fn to_index(&self) -> Result<u32> {
        match self {
            ColumnRef::Index(0) => anyhow::bail!("Column numbers start at 1"),
            ColumnRef::Index(i) => Ok(*i),
            ColumnRef::Letters(letters) => column_index_from_letters(letters)
                .ok_or_else(|| anyhow::anyhow!("Invalid column reference '{}'", letters)),
        }
    }
}

impl Default for ColumnRef {
    fn default() -> Self {
        ColumnRef::Index(DEFAULT_SKU_COLUMN)
    }
}

impl FromStr for ColumnRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u32>() {
            Ok(i) => ColumnRef::Index(i),
            Err(_) => ColumnRef::Letters(s.trim().to_string()),
        })
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "{}", i),
            ColumnRef::Letters(s) => write!(f, "{}", s),
        }
    }
}

/// Convert column letters like "B" or "AA" into a 1-based index
fn column_index_from_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Workbook to read
    pub input: PathBuf,
    /// Directory the images are written to
    pub output_dir: PathBuf,
    /// Column holding the product reference
    pub sku_column: ColumnRef,
    /// First row holding data (1-based); rows above are headers
    pub first_data_row: u32,
}

impl ExtractorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ExtractorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 1-based index of the SKU column
    pub fn sku_column_index(&self) -> Result<u32> {
        self.sku_column.to_index()
    }

    /// Check the values that cannot be represented as a valid run
    pub fn validate(&self) -> Result<()> {
        self.sku_column_index()
            .map_err(|e| anyhow::anyhow!("Configuration error: sku_column: {}", e))?;

        if self.first_data_row == 0 {
            anyhow::bail!("Configuration error: first_data_row starts at 1");
        }

        if self.input.as_os_str().is_empty() {
            anyhow::bail!("Configuration error: input path is empty");
        }

        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("Configuration error: output_dir is empty");
        }

        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sku_column: ColumnRef::default(),
            first_data_row: DEFAULT_FIRST_DATA_ROW,
        }
    }
}
