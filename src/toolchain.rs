//! Pinned toolchain resolution
//!
//! Turns the identifier in `rust-toolchain` plus an installation root into
//! the toolchain's runtime library directory. Path building is pure: nothing
//! here checks that the directory exists, a missing toolchain surfaces later
//! when the driver fails to load.

use crate::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Target-platform triple every toolchain directory is suffixed with
pub const HOST_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// Version identifier read from the pin file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinnedToolchainVersion(String);

impl PinnedToolchainVersion {
    /// Validate a raw identifier
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::missing(
                "pinned toolchain version",
                "identifier is empty",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Read the pin file, accepting either a bare identifier or `channel = "..."`
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::missing(
                "pinned toolchain version",
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        Self::parse(&text).ok_or_else(|| {
            Error::missing(
                "pinned toolchain version",
                format!("{} is empty", path.display()),
            )
        })
    }

    /// Extract the identifier from pin file contents
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(cap) = channel_re().captures(text) {
            return Self::new(&cap[1]).ok();
        }
        // Past this point only the legacy single-line form is accepted.
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))?;
        if line.starts_with('[') || line.contains('=') {
            return None;
        }
        Self::new(line).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PinnedToolchainVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn channel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*channel\s*=\s*"([^"]*)""#).expect("channel pattern is valid")
    })
}

/// Directory name rustup installs `version` under
pub fn toolchain_dir_name(version: &PinnedToolchainVersion) -> String {
    format!("{}-{}", version.as_str(), HOST_TRIPLE)
}

/// Runtime library directory of the pinned toolchain
pub fn resolve(version: &PinnedToolchainVersion, installation_root: &Path) -> PathBuf {
    installation_root
        .join("toolchains")
        .join(toolchain_dir_name(version))
        .join("lib")
}
