//! Native JVM library discovery
//!
//! The search is an explicit walk of the whole tree under the JVM root that
//! collects every file named [`JVM_LIBRARY_NAME`], followed by a zero/one/many
//! decision. Exactly one match is accepted.
//!
//! Walking a full JDK touches thousands of entries, so callers resolve once
//! per invocation and reuse the result for every test case.

use crate::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Platform file name of the native JVM shared library
#[cfg(target_os = "macos")]
pub const JVM_LIBRARY_NAME: &str = "libjvm.dylib";
#[cfg(windows)]
pub const JVM_LIBRARY_NAME: &str = "jvm.dll";
#[cfg(not(any(target_os = "macos", windows)))]
pub const JVM_LIBRARY_NAME: &str = "libjvm.so";

/// Directory containing the unique native JVM library under `installation_root`
pub fn locate(installation_root: &Path) -> Result<PathBuf> {
    locate_named(installation_root, OsStr::new(JVM_LIBRARY_NAME))
}

/// Same as [`locate`] for an arbitrary library file name
pub fn locate_named(installation_root: &Path, library: &OsStr) -> Result<PathBuf> {
    let what = library.to_string_lossy().into_owned();

    // JAVA_HOME is commonly a symlink (/usr/lib/jvm/default-java).
    let root = match std::fs::canonicalize(installation_root) {
        Ok(root) => root,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DependencyNotFound {
                what,
                searched: installation_root.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(Error::io(
                format!("resolving {}", installation_root.display()),
                e,
            ))
        }
    };

    let mut matches = find_files(&root, library)?;
    debug!(
        "Found {} candidate(s) for {} under {}",
        matches.len(),
        what,
        root.display()
    );

    match matches.len() {
        0 => Err(Error::DependencyNotFound {
            what,
            searched: root,
        }),
        1 => {
            let file = matches.remove(0);
            Ok(file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone()))
        }
        _ => Err(Error::AmbiguousDependency { what, matches }),
    }
}

/// Every non-directory entry named `name` under `root`, sorted by path
///
/// Symlinked directories are not descended into, which keeps the walk finite
/// on trees that link back to their ancestors.
pub fn find_files(root: &Path, name: &OsStr) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if root.file_name() == Some(name) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => {
                return Err(Error::io(format!("reading {}", dir.display()), e));
            }
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| Error::io(format!("inspecting {}", entry.path().display()), e))?;

            if file_type.is_dir() {
                pending.push(entry.path());
            } else if entry.file_name() == name {
                found.push(entry.path());
            }
        }
    }

    found.sort();
    Ok(found)
}
