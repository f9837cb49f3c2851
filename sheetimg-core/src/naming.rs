//! Output file naming: SKU sanitization and collision-free creation

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Extension given to every extracted image
pub const IMAGE_EXTENSION: &str = "png";

/// Keep only alphanumerics, `-` and `_`
pub fn sanitize_sku(sku: &str) -> String {
    sku.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Placeholder stem for an image whose row has no SKU (0-based index)
pub fn unknown_stem(index: usize) -> String {
    format!("unknown_{}", index)
}

/// Stem for an image whose anchor has no row (1-based number)
pub fn generic_stem(index: usize) -> String {
    format!("image_{}", index + 1)
}

/// `stem.png` for attempt 0, `stem_N.png` for attempt N
pub fn candidate_file_name(stem: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}.{}", stem, IMAGE_EXTENSION)
    } else {
        format!("{}_{}.{}", stem, attempt, IMAGE_EXTENSION)
    }
}

/// First candidate name for which `taken` returns false
pub fn first_free_name(stem: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    let mut attempt = 0;
    loop {
        let name = candidate_file_name(stem, attempt);
        if !taken(&name) {
            return name;
        }
        attempt += 1;
    }
}

/// Create a new file in `dir` named after `stem`, suffixing `_1`, `_2`, …
/// while the name is already used. Creation is exclusive, so an existing
/// file is never truncated.
pub fn create_unique_file(dir: &Path, stem: &str) -> io::Result<(String, PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let name = candidate_file_name(stem, attempt);
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((name, path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Name planner for dry runs: honours files already on disk and names
/// handed out earlier in the same run
#[derive(Debug, Default)]
pub struct NamePlanner {
    claimed: HashSet<String>,
}

impl NamePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the first free name for `stem` in `dir`
    pub fn claim(&mut self, dir: &Path, stem: &str) -> String {
        let name = first_free_name(stem, |name| {
            self.claimed.contains(name) || dir.join(name).exists()
        });
        self.claimed.insert(name.clone());
        name
    }
}
