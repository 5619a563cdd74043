//! Corpus discovery
//!
//! Every file under the corpus root whose extension matches is a test case.
//! Cases are returned sorted by path so that timing logs from different
//! machines line up.

use crate::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// One verification input file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestCase {
    path: PathBuf,
}

impl TestCase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity written to the timing log, relative to `root` when possible
    pub fn label(&self, root: Option<&Path>) -> String {
        root.and_then(|root| self.path.strip_prefix(root).ok())
            .unwrap_or(self.path.as_path())
            .display()
            .to_string()
    }
}

/// Collect all files under `corpus` with extension `extension`
pub fn discover(corpus: &Path, extension: &str) -> Result<Vec<TestCase>> {
    let extension = OsStr::new(extension.trim_start_matches('.'));
    let mut cases = Vec::new();
    let mut pending = vec![corpus.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| Error::io(format!("reading corpus {}", dir.display()), e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::io(format!("reading corpus {}", dir.display()), e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| Error::io(format!("inspecting {}", path.display()), e))?;

            if file_type.is_dir() {
                pending.push(path);
            } else if path.extension() == Some(extension) {
                cases.push(TestCase::new(path));
            }
        }
    }

    cases.sort();
    Ok(cases)
}
