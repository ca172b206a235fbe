use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists image file paths in a directory (with optional recursion and extension filtering).
///
/// The folder is scanned once; files added afterwards are not picked up. Paths
/// are returned sorted so that sharding them across workers is reproducible.
///
/// # Example
/// ```ignore
/// let source = ImageDirSource::new(
///     "./data/images",
///     &["jpg", "png"], // Allowed extensions (case-insensitive)
///     true,            // Enable recursion
/// );
/// let files = source.list()?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    dir_path: PathBuf,
    extensions: Vec<String>,
    recurse: bool,
}

impl ImageDirSource {
    /// Creates a new image directory source.
    ///
    /// # Arguments
    /// - `dir_path`: Directory to scan.
    /// - `extensions`: File extensions to include (e.g., `["jpg", "png"]`). Case-insensitive.
    /// - `recurse`: If `true`, scans subdirectories recursively.
    pub fn new<S: AsRef<str>>(dir_path: impl Into<PathBuf>, extensions: &[S], recurse: bool) -> Self {
        Self {
            dir_path: dir_path.into(),
            extensions: extensions.iter().map(|s| s.as_ref().to_lowercase()).collect(),
            recurse,
        }
    }

    pub fn dir_path(&self) -> &Path {
        &self.dir_path
    }

    /// Returns the sorted list of matching regular files.
    ///
    /// Fails if the directory is missing, is not a directory, or cannot be read.
    /// Symlinks are skipped.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        // Early validation: ensure the directory exists and is indeed a directory.
        let dir_metadata = fs::metadata(&self.dir_path)
            .with_context(|| format!("Failed to access directory: {}", self.dir_path.display()))?;
        if !dir_metadata.is_dir() {
            bail!("Path is not a directory: {}", self.dir_path.display());
        }

        // - recurse = true: traverse all subdirectories.
        // - recurse = false: only scan the top-level directory.
        let candidates: Vec<PathBuf> = if self.recurse {
            WalkDir::new(&self.dir_path)
                .into_iter()
                .map(|entry| {
                    entry
                        .map(|e| e.into_path())
                        .context("Failed to read directory entry")
                })
                .collect::<Result<_>>()?
        } else {
            fs::read_dir(&self.dir_path)
                .with_context(|| format!("Failed to read directory: {}", self.dir_path.display()))?
                .map(|entry| {
                    entry
                        .map(|e| e.path())
                        .context("Failed to read directory entry")
                })
                .collect::<Result<_>>()?
        };

        let mut files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| !path.is_symlink() && path.is_file() && self.matches_extension(path))
            .collect();
        files.sort();
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }
}
