//! # Environment Composition
//!
//! Builds the library search path and environment variables a driver
//! invocation needs. The search path is always, in this order:
//!
//! ```text
//! toolchain lib dir → JVM lib dir → <target>/<profile> → <target>/<profile>/deps
//! ```
//!
//! Earlier entries shadow later ones when the dynamic loader resolves a
//! library name. Composition is recomputed on every call and reads nothing
//! but its configuration and the filesystem.

use crate::config::HarnessConfig;
use crate::toolchain::{self, PinnedToolchainVersion};
use crate::{jvm, Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable the dynamic loader consults for extra library directories
#[cfg(target_os = "macos")]
pub const SEARCH_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
pub const SEARCH_PATH_VAR: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
pub const SEARCH_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Variable carrying the JVM installation root
pub const JAVA_HOME_VAR: &str = "JAVA_HOME";

/// Ordered list of shared-library directories; first match wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySearchPath {
    entries: Vec<PathBuf>,
}

impl LibrarySearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory with lower precedence than all existing entries
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.entries.push(dir.into());
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join with the platform separator
    pub fn to_os_string(&self) -> Result<OsString> {
        std::env::join_paths(&self.entries).map_err(|e| {
            Error::InvalidConfig(format!("library search path entry not joinable: {}", e))
        })
    }
}

/// Named variables overlaid on the driver's inherited environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    vars: BTreeMap<String, OsString>,
}

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OsString>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(name).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Lossy string form, for printing
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Everything composition resolved for one invocation
#[derive(Debug, Clone)]
pub struct ComposedEnvironment {
    /// Version read from the pin file
    pub version: PinnedToolchainVersion,
    /// Toolchain runtime library directory (also the driver's `-L` argument)
    pub toolchain_lib_dir: PathBuf,
    /// Directory holding the native JVM library
    pub jvm_lib_dir: PathBuf,
    /// Composed loader search path
    pub search_path: LibrarySearchPath,
    /// Variables to overlay on the child environment
    pub env: EnvironmentMap,
}

/// Resolve toolchain and JVM locations and compose the driver environment
pub fn compose(config: &HarnessConfig) -> Result<ComposedEnvironment> {
    let version = PinnedToolchainVersion::read(&config.toolchain_file)?;
    let toolchain_root = config.toolchain_root.as_deref().ok_or_else(|| {
        Error::missing(
            "toolchain installation root",
            "neither RUSTUP_HOME nor HOME is set",
        )
    })?;
    let jvm_lib_dir = jvm::locate(&config.jvm_root)?;
    compose_from(config, version, toolchain_root, jvm_lib_dir)
}

/// Composition once the pinned version and JVM directory are known
pub fn compose_from(
    config: &HarnessConfig,
    version: PinnedToolchainVersion,
    toolchain_root: &Path,
    jvm_lib_dir: PathBuf,
) -> Result<ComposedEnvironment> {
    let toolchain_lib_dir = toolchain::resolve(&version, toolchain_root);

    let mut search_path = LibrarySearchPath::new();
    search_path.push(&toolchain_lib_dir);
    search_path.push(&jvm_lib_dir);
    for dir in config.build_output_dirs() {
        search_path.push(dir);
    }

    let mut env = EnvironmentMap::new();
    for name in &config.passthrough_vars {
        if let Some(value) = config.ambient.get(name) {
            env.insert(name.clone(), value);
        }
    }
    env.insert(SEARCH_PATH_VAR, search_path.to_os_string()?);
    env.insert(JAVA_HOME_VAR, config.jvm_root.as_os_str());

    debug!(
        "Composed {} environment for toolchain {}: {} search path entries",
        config.profile,
        version,
        search_path.len()
    );

    Ok(ComposedEnvironment {
        version,
        toolchain_lib_dir,
        jvm_lib_dir,
        search_path,
        env,
    })
}
