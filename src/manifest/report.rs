//! Manifest summary types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Locations of the three manifest files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManifestPaths {
    pub train: PathBuf,
    pub val: PathBuf,
    pub label: PathBuf,
}

/// Per-class record counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub id: usize,
    pub name: String,
    pub train: usize,
    pub val: usize,
}

/// Summary of a manifest run.
#[derive(Clone, Debug, Serialize)]
pub struct ManifestSummary {
    pub classes: Vec<ClassSummary>,
    pub train_total: usize,
    pub val_total: usize,
    /// Set once the manifest has been written to disk.
    pub files: Option<ManifestPaths>,
}

impl fmt::Display for ManifestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Manifest: {} class(es), {} training and {} validation image(s)",
            self.classes.len(),
            self.train_total,
            self.val_total
        )?;

        if !self.classes.is_empty() {
            writeln!(f)?;
            let width = self
                .classes
                .iter()
                .map(|c| c.name.len())
                .max()
                .unwrap_or(0);
            for class in &self.classes {
                writeln!(
                    f,
                    "  {:>3}  {:<width$}  train {:>6}  val {:>6}",
                    class.id,
                    class.name,
                    class.train,
                    class.val,
                    width = width
                )?;
            }
        }

        if let Some(files) = &self.files {
            writeln!(f)?;
            writeln!(f, "Wrote {}", files.train.display())?;
            writeln!(f, "Wrote {}", files.val.display())?;
            writeln!(f, "Wrote {}", files.label.display())?;
        }

        Ok(())
    }
}
