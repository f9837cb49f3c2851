//! Per-image error reporting

use std::path::PathBuf;
use thiserror::Error;

/// Failure while handling a single embedded image.
///
/// These never abort a run: the image is reported and skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The anchor exists but its row/column cannot be read
    #[error("malformed anchor: {0}")]
    MalformedAnchor(String),

    /// The picture points at a relationship or media part that is not in the package
    #[error("image data not found: {0}")]
    MissingMedia(String),

    /// Writing the output file failed
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
