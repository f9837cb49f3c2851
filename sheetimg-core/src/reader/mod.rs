//! Excel/ODS file reader using calamine, with pictures read from the XLSX package

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod workbook;
pub mod xml_parser;

pub use workbook::{
    AnchorKind, CellValue, EmbeddedImage, ImageAnchor, MediaSource, Sheet, Workbook,
};

/// Read a workbook from a file path, keeping only its active sheet.
///
/// Cell values come from calamine for every format it supports. Embedded
/// pictures are only available for OOXML packages (`.xlsx`, `.xlsm`); other
/// formats load with no images.
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    let is_ooxml = matches!(extension.as_deref(), Some("xlsx") | Some("xlsm"));

    let mut archive = if is_ooxml {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        Some(
            zip::ZipArchive::new(BufReader::new(file))
                .with_context(|| format!("Not a valid XLSX package: {}", path.display()))?,
        )
    } else {
        None
    };

    let sheet_names = excel.sheet_names();
    if sheet_names.is_empty() {
        anyhow::bail!("Workbook has no sheets: {}", path.display());
    }

    let info = match archive.as_mut() {
        Some(archive_ref) => xml_parser::extract_workbook_info(archive_ref)
            .with_context(|| format!("Failed to read workbook structure: {}", path.display()))?,
        None => xml_parser::WorkbookInfo::default(),
    };

    // Out-of-range tabs fall back to the first sheet
    let active_index = if info.active_tab < sheet_names.len() {
        info.active_tab
    } else {
        0
    };
    let active_name = sheet_names[active_index].clone();

    let range = excel
        .worksheet_range(&active_name)
        .with_context(|| format!("Failed to read sheet '{}'", active_name))?;
    let mut sheet = parse_sheet(&active_name, &range);

    if let Some(ref mut archive_ref) = archive {
        let sheet_part = info
            .sheets
            .iter()
            .find(|s| s.name == active_name)
            .and_then(|s| s.part.clone());
        if let Some(part) = sheet_part {
            sheet.images = xml_parser::extract_sheet_images(archive_ref, &part)
                .with_context(|| format!("Failed to read drawings of sheet '{}'", active_name))?;
        }
    }

    Ok(Workbook {
        active_sheet: sheet,
    })
}

/// Convert a calamine range into a sheet keyed by absolute 0-based positions
pub fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::empty(name);

    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return sheet;
    };

    let mut cells = HashMap::new();
    for row in start.0..=end.0 {
        for col in start.1..=end.1 {
            if let Some(data) = range.get_value((row, col)) {
                if !matches!(data, Data::Empty) {
                    cells.insert((row, col), parse_cell_value(data));
                }
            }
        }
    }

    sheet.cells = cells;
    sheet.used_range = Some((end.0 + 1, end.1 + 1));
    sheet
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sheet_keeps_absolute_positions() {
        // Data starting at B2 (0-based (1, 1))
        let mut range: Range<Data> = Range::new((1, 1), (3, 2));
        range.set_value((1, 1), Data::String("Name".into()));
        range.set_value((1, 2), Data::String("Ref".into()));
        range.set_value((2, 2), Data::Float(1042.0));
        range.set_value((3, 2), Data::String("AB-7".into()));

        let sheet = parse_sheet("Articles", &range);
        assert_eq!(sheet.name, "Articles");
        assert_eq!(sheet.max_row(), 4);
        assert_eq!(sheet.get_cell(2, 2), Some(&CellValue::Number(1042.0)));
        assert_eq!(
            sheet.get_cell(3, 2),
            Some(&CellValue::Text("AB-7".to_string()))
        );
        // Empty cells are not stored
        assert_eq!(sheet.get_cell(2, 1), None);
    }

    #[test]
    fn test_parse_empty_range() {
        let range: Range<Data> = Range::empty();
        let sheet = parse_sheet("Empty", &range);
        assert_eq!(sheet.max_row(), 0);
        assert!(sheet.cells.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = read_workbook("does/not/exist.xlsx").unwrap_err();
        assert!(err.to_string().contains("Failed to open workbook"));
    }
}
