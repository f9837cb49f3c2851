//! Workbook data structures

use crate::error::ExtractError;
use std::collections::HashMap;

/// A loaded workbook, reduced to what extraction needs: the active sheet
#[derive(Debug, Clone)]
pub struct Workbook {
    pub active_sheet: Sheet,
}

/// Represents a worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// Non-empty cells keyed by 0-based (row, col)
    pub cells: HashMap<(u32, u32), CellValue>,
    pub used_range: Option<(u32, u32)>, // (rows, cols)
    /// Embedded pictures in stored order
    pub images: Vec<EmbeddedImage>,
}

impl Sheet {
    /// Create an empty sheet with no cells and no images
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: HashMap::new(),
            used_range: None,
            images: Vec::new(),
        }
    }

    /// Get a cell value at the given 0-based position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Last used row, 1-based. Zero when the sheet has no cells.
    pub fn max_row(&self) -> u32 {
        self.used_range.map(|(rows, _)| rows).unwrap_or(0)
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    /// Render the value as text, or `None` for empty and error cells.
    ///
    /// Integral numbers drop the fractional part so a numeric reference
    /// like `1042` does not become `1042.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Error(_) => None,
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Boolean(true) => Some("TRUE".to_string()),
            CellValue::Boolean(false) => Some("FALSE".to_string()),
        }
    }
}

/// How a picture is attached to the sheet.
///
/// Variant order is the order pictures are listed within a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnchorKind {
    /// `xdr:twoCellAnchor`: moves and sizes with cells
    TwoCell,
    /// `xdr:oneCellAnchor`: top-left pinned to a cell
    OneCell,
    /// `xdr:absoluteAnchor`: positioned in EMUs, no cell
    Absolute,
}

/// Stored position of a picture.
///
/// The `from` row is kept as the raw text of the drawing part so a
/// malformed anchor only fails its own image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnchor {
    pub kind: AnchorKind,
    pub from_row: Option<String>,
}

impl ImageAnchor {
    /// Anchor pinned to a 0-based row
    pub fn cell(kind: AnchorKind, row: u32) -> Self {
        Self {
            kind,
            from_row: Some(row.to_string()),
        }
    }

    /// Anchor with no cell position
    pub fn absolute() -> Self {
        Self {
            kind: AnchorKind::Absolute,
            from_row: None,
        }
    }

    /// Anchor row, 1-based.
    ///
    /// `Ok(None)` means the anchor has no row at all (absolute placement).
    pub fn row(&self) -> Result<Option<u32>, ExtractError> {
        if self.kind == AnchorKind::Absolute {
            return Ok(None);
        }
        let raw = self
            .from_row
            .as_deref()
            .ok_or_else(|| ExtractError::MalformedAnchor("anchor has no <from> row".into()))?;
        let row = raw.trim().parse::<u32>().map_err(|_| {
            ExtractError::MalformedAnchor(format!("invalid anchor row '{}'", raw))
        })?;
        let row = row.checked_add(1).ok_or_else(|| {
            ExtractError::MalformedAnchor(format!("anchor row '{}' out of range", raw))
        })?;
        Ok(Some(row))
    }
}

/// Where the bytes of a picture live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Media part found in the package
    Embedded { part: String, bytes: Vec<u8> },
    /// Relationship or part missing; carries the reason
    Unresolved { reason: String },
}

/// A picture embedded in a worksheet drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub anchor: ImageAnchor,
    pub media: MediaSource,
}

impl EmbeddedImage {
    /// Raw image bytes, or the reason they could not be found
    pub fn bytes(&self) -> Result<&[u8], ExtractError> {
        match &self.media {
            MediaSource::Embedded { bytes, .. } => Ok(bytes),
            MediaSource::Unresolved { reason } => Err(ExtractError::MissingMedia(reason.clone())),
        }
    }
}
