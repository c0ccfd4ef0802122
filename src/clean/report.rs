//! Cleanup report types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Everything the cleanup phase did to a dataset tree.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CleanReport {
    /// Subdirectories processed.
    pub folders: usize,
    /// Non-image files deleted.
    pub pruned: Vec<PathBuf>,
    /// Non-image files that could not be deleted.
    pub prune_failures: Vec<PathBuf>,
    /// Images that failed the integrity check (deleted or not).
    pub corrupt: Vec<PathBuf>,
    /// Corrupt images whose deletion was refused with a permission error.
    pub locked: Vec<PathBuf>,
    /// Renames performed.
    pub renamed: Vec<Rename>,
    /// Images that already carried a canonical name.
    pub already_canonical: usize,
    /// Subfolders skipped after a permission error.
    pub abandoned: Vec<PathBuf>,
}

/// A single file rename.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl CleanReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing needed doing.
    pub fn is_clean(&self) -> bool {
        self.pruned.is_empty()
            && self.prune_failures.is_empty()
            && self.corrupt.is_empty()
            && self.renamed.is_empty()
            && self.abandoned.is_empty()
    }
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cleaned {} folder(s):", self.folders)?;
        writeln!(f, "  non-image files removed: {}", self.pruned.len())?;
        if !self.prune_failures.is_empty() {
            writeln!(
                f,
                "  non-image files left in place: {}",
                self.prune_failures.len()
            )?;
        }
        writeln!(f, "  corrupt images: {}", self.corrupt.len())?;
        writeln!(f, "  images renamed: {}", self.renamed.len())?;
        writeln!(f, "  already named: {}", self.already_canonical)?;

        if !self.locked.is_empty() {
            writeln!(f)?;
            writeln!(f, "Corrupt images still in use (not deleted):")?;
            for path in &self.locked {
                writeln!(f, "  {}", path.display())?;
            }
        }

        if !self.abandoned.is_empty() {
            writeln!(f)?;
            writeln!(f, "Folders skipped after a permission error:")?;
            for path in &self.abandoned {
                writeln!(f, "  {}", path.display())?;
            }
        }

        Ok(())
    }
}
