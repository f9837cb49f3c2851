//! Per-image extraction: anchor → SKU → file name → bytes on disk

use crate::error::ExtractError;
use crate::naming::{self, NamePlanner};
use crate::reader::{EmbeddedImage, Sheet};
use crate::sku::SkuIndex;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Switches for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Plan file names without creating the directory or writing files
    pub dry_run: bool,
}

/// How an output name was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// From the SKU on the anchor row
    Sku,
    /// Anchor row has no usable SKU: `unknown_<index>`
    Unknown,
    /// Anchor has no row: `image_<index + 1>`
    Generic,
}

/// An image written (or planned, on a dry run)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub file_name: String,
    pub path: PathBuf,
    /// Anchor row, 1-based
    pub row: Option<u32>,
    /// SKU looked up for the row, before sanitization
    pub sku: Option<String>,
    pub naming: Naming,
    /// Byte length of the image data
    pub size: usize,
    /// Running count of images extracted so far, this one included
    pub extracted: usize,
}

/// Result for one image, by 0-based position in the sheet
#[derive(Debug)]
pub struct ImageOutcome {
    pub index: usize,
    pub result: Result<SavedImage, ExtractError>,
}

/// Events emitted while a run progresses
#[derive(Debug)]
pub enum Progress<'a> {
    SheetLoaded { name: &'a str, max_row: u32 },
    SkusIndexed { count: usize },
    NoImages,
    ImagesFound { count: usize },
    Image(&'a ImageOutcome),
}

/// Summary of a completed run
#[derive(Debug)]
pub struct ExtractionReport {
    pub sheet_name: String,
    pub output_dir: PathBuf,
    pub sku_count: usize,
    pub outcomes: Vec<ImageOutcome>,
    pub dry_run: bool,
}

impl ExtractionReport {
    pub fn total_images(&self) -> usize {
        self.outcomes.len()
    }

    pub fn extracted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Images that were written, in sheet order
    pub fn saved(&self) -> impl Iterator<Item = &SavedImage> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Extract every picture of `sheet` into `output_dir`.
///
/// A failing image is reported through its outcome and does not stop the
/// remaining ones.
pub fn extract_images<F>(
    sheet: &Sheet,
    skus: &SkuIndex,
    output_dir: &Path,
    options: ExtractOptions,
    on_progress: &mut F,
) -> Vec<ImageOutcome>
where
    F: FnMut(Progress<'_>),
{
    let mut planner = options.dry_run.then(NamePlanner::new);
    let mut outcomes = Vec::with_capacity(sheet.images.len());
    let mut extracted = 0usize;

    for (index, image) in sheet.images.iter().enumerate() {
        let result = extract_one(
            index,
            image,
            skus,
            output_dir,
            planner.as_mut(),
            extracted + 1,
        );
        if result.is_ok() {
            extracted += 1;
        }
        let outcome = ImageOutcome { index, result };
        on_progress(Progress::Image(&outcome));
        outcomes.push(outcome);
    }

    outcomes
}

fn extract_one(
    index: usize,
    image: &EmbeddedImage,
    skus: &SkuIndex,
    output_dir: &Path,
    planner: Option<&mut NamePlanner>,
    extracted: usize,
) -> Result<SavedImage, ExtractError> {
    let row = image.anchor.row()?;

    let (stem, sku, naming) = match row {
        None => (naming::generic_stem(index), None, Naming::Generic),
        Some(row) => match skus.get(row) {
            Some(sku) => {
                let safe = naming::sanitize_sku(sku);
                if safe.is_empty() {
                    (naming::unknown_stem(index), Some(sku.to_string()), Naming::Unknown)
                } else {
                    (safe, Some(sku.to_string()), Naming::Sku)
                }
            }
            None => (naming::unknown_stem(index), None, Naming::Unknown),
        },
    };

    let bytes = image.bytes()?;

    let (file_name, path) = match planner {
        Some(planner) => {
            let name = planner.claim(output_dir, &stem);
            let path = output_dir.join(&name);
            (name, path)
        }
        None => {
            let (name, path, mut file) = naming::create_unique_file(output_dir, &stem)
                .map_err(|source| ExtractError::Write {
                    path: output_dir.join(naming::candidate_file_name(&stem, 0)),
                    source,
                })?;
            file.write_all(bytes)
                .and_then(|_| file.flush())
                .map_err(|source| ExtractError::Write {
                    path: path.clone(),
                    source,
                })?;
            (name, path)
        }
    };

    Ok(SavedImage {
        file_name,
        path,
        row,
        sku,
        naming,
        size: bytes.len(),
        extracted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{AnchorKind, ImageAnchor, MediaSource};
    use std::fs;

    fn image_at(row0: u32, bytes: &[u8]) -> EmbeddedImage {
        EmbeddedImage {
            anchor: ImageAnchor::cell(AnchorKind::TwoCell, row0),
            media: MediaSource::Embedded {
                part: "xl/media/image1.png".to_string(),
                bytes: bytes.to_vec(),
            },
        }
    }

    fn sheet_with_images(images: Vec<EmbeddedImage>) -> Sheet {
        let mut sheet = Sheet::empty("Articles");
        sheet.images = images;
        sheet
    }

    fn run(sheet: &Sheet, skus: &SkuIndex, dir: &Path, dry_run: bool) -> Vec<ImageOutcome> {
        extract_images(sheet, skus, dir, ExtractOptions { dry_run }, &mut |_| {})
    }

    #[test]
    fn test_names_from_sku_and_collisions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus: SkuIndex = [(2, "AB/12 34".to_string()), (3, "AB/12 34".to_string())]
            .into_iter()
            .collect();
        // 0-based rows 1 and 2 are 1-based rows 2 and 3
        let sheet = sheet_with_images(vec![image_at(1, b"one"), image_at(2, b"two")]);

        let outcomes = run(&sheet, &skus, dir.path(), false);
        let first = outcomes[0].result.as_ref().unwrap();
        let second = outcomes[1].result.as_ref().unwrap();

        assert_eq!(first.file_name, "AB1234.png");
        assert_eq!(first.row, Some(2));
        assert_eq!(first.sku.as_deref(), Some("AB/12 34"));
        assert_eq!(second.file_name, "AB1234_1.png");
        assert_eq!(second.extracted, 2);

        assert_eq!(fs::read(dir.path().join("AB1234.png"))?, b"one");
        assert_eq!(fs::read(dir.path().join("AB1234_1.png"))?, b"two");
        Ok(())
    }

    #[test]
    fn test_missing_sku_uses_zero_based_index() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus = SkuIndex::default();
        let sheet = sheet_with_images(vec![image_at(5, b"x"), image_at(6, b"y")]);

        let outcomes = run(&sheet, &skus, dir.path(), false);
        let names: Vec<_> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().file_name.clone())
            .collect();
        assert_eq!(names, vec!["unknown_0.png", "unknown_1.png"]);
        assert_eq!(outcomes[0].result.as_ref().unwrap().naming, Naming::Unknown);
        Ok(())
    }

    #[test]
    fn test_sku_that_sanitizes_to_nothing_uses_placeholder() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus: SkuIndex = [(2, "///".to_string())].into_iter().collect();
        let sheet = sheet_with_images(vec![image_at(1, b"x")]);

        let outcomes = run(&sheet, &skus, dir.path(), false);
        assert_eq!(
            outcomes[0].result.as_ref().unwrap().file_name,
            "unknown_0.png"
        );
        Ok(())
    }

    #[test]
    fn test_absolute_anchor_uses_generic_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus: SkuIndex = [(2, "SKU".to_string())].into_iter().collect();
        let mut absolute = image_at(0, b"abs");
        absolute.anchor = ImageAnchor::absolute();
        let sheet = sheet_with_images(vec![image_at(1, b"a"), absolute]);

        let outcomes = run(&sheet, &skus, dir.path(), false);
        let saved = outcomes[1].result.as_ref().unwrap();
        assert_eq!(saved.file_name, "image_2.png");
        assert_eq!(saved.naming, Naming::Generic);
        assert_eq!(saved.sku, None);
        assert_eq!(saved.row, None);
        Ok(())
    }

    #[test]
    fn test_failures_do_not_stop_the_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus: SkuIndex = [(2, "A".to_string()), (3, "B".to_string())]
            .into_iter()
            .collect();

        let mut broken_anchor = image_at(0, b"x");
        broken_anchor.anchor.from_row = Some("n/a".to_string());
        let missing_media = EmbeddedImage {
            anchor: ImageAnchor::cell(AnchorKind::OneCell, 1),
            media: MediaSource::Unresolved {
                reason: "rId7 not found".to_string(),
            },
        };
        let sheet = sheet_with_images(vec![broken_anchor, missing_media, image_at(2, b"b")]);

        let mut seen = 0;
        let outcomes = extract_images(
            &sheet,
            &skus,
            dir.path(),
            ExtractOptions::default(),
            &mut |event| {
                if let Progress::Image(_) = event {
                    seen += 1;
                }
            },
        );
        assert_eq!(seen, 3);
        assert!(matches!(
            outcomes[0].result,
            Err(ExtractError::MalformedAnchor(_))
        ));
        assert!(matches!(
            outcomes[1].result,
            Err(ExtractError::MissingMedia(_))
        ));
        // No empty file is left behind for the missing media
        assert!(!dir.path().join("A.png").exists());

        let saved = outcomes[2].result.as_ref().unwrap();
        assert_eq!(saved.file_name, "B.png");
        assert_eq!(saved.extracted, 1);
        Ok(())
    }

    #[test]
    fn test_out_of_range_anchor_row_fails_only_its_image() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let skus: SkuIndex = [(2, "OK".to_string())].into_iter().collect();

        let mut overflowing = image_at(0, b"x");
        overflowing.anchor.from_row = Some(u32::MAX.to_string());
        let sheet = sheet_with_images(vec![overflowing, image_at(1, b"ok")]);

        let outcomes = run(&sheet, &skus, dir.path(), false);
        assert!(matches!(
            outcomes[0].result,
            Err(ExtractError::MalformedAnchor(_))
        ));
        assert_eq!(outcomes[1].result.as_ref().unwrap().file_name, "OK.png");
        assert_eq!(fs::read(dir.path().join("OK.png"))?, b"ok");
        Ok(())
    }

    #[test]
    fn test_write_error_is_reported_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let skus: SkuIndex = [(2, "A".to_string())].into_iter().collect();
        let sheet = sheet_with_images(vec![image_at(1, b"a")]);

        let outcomes = run(&sheet, &skus, &missing, false);
        assert!(matches!(
            outcomes[0].result,
            Err(ExtractError::Write { .. })
        ));
    }

    #[test]
    fn test_dry_run_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("A.png"), b"old")?;
        let skus: SkuIndex = [(2, "A".to_string()), (3, "A".to_string())]
            .into_iter()
            .collect();
        let sheet = sheet_with_images(vec![image_at(1, b"1"), image_at(2, b"2")]);

        let outcomes = run(&sheet, &skus, dir.path(), true);
        assert_eq!(outcomes[0].result.as_ref().unwrap().file_name, "A_1.png");
        assert_eq!(outcomes[1].result.as_ref().unwrap().file_name, "A_2.png");
        assert!(!dir.path().join("A_1.png").exists());
        assert_eq!(fs::read(dir.path().join("A.png"))?, b"old");
        Ok(())
    }
}
