//! # Harness Configuration
//!
//! All ambient inputs (installation roots, pinned version file, profile,
//! pass-through variables) are gathered into one immutable [`HarnessConfig`]
//! that every component receives by reference. The process environment is
//! read exactly once, into an [`EnvSnapshot`]; tests build snapshots in
//! memory instead.
//!
//! Precedence, highest first: CLI flag, config file, environment, default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// JVM installation used when `JAVA_HOME` is unset
pub const DEFAULT_JAVA_HOME: &str = "/usr/lib/jvm/default-java";

/// Name of the version-pin file at the project root
pub const TOOLCHAIN_FILE: &str = "rust-toolchain";

/// Default driver executable name inside the profile output directory
pub const DEFAULT_DRIVER_NAME: &str = "verify-driver";

/// Default crate passed to the driver with `--extern`
pub const DEFAULT_EXTERN_CRATE: &str = "verify_contracts";

/// Variables copied from the caller's environment when present
pub const DEFAULT_PASSTHROUGH_VARS: &[&str] = &["RUST_LOG", "RUST_BACKTRACE", "RUST_TEST_THREADS"];

/// Build profile a command operates against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunProfile {
    /// `target/debug`
    #[default]
    Debug,
    /// `target/release`
    Release,
}

impl RunProfile {
    /// Build-output subdirectory name
    pub fn dir_name(self) -> &'static str {
        match self {
            RunProfile::Debug => "debug",
            RunProfile::Release => "release",
        }
    }
}

impl std::fmt::Display for RunProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What happens to the driver's standard output and error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Child writes straight to the caller's streams
    #[default]
    Inherit,
    /// Child output is collected into the [`RunResult`](crate::driver::RunResult)
    Capture,
}

/// Immutable view of environment variables
///
/// Values are kept as raw OS strings so non-UTF-8 paths pass through intact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, OsString>,
}

impl EnvSnapshot {
    /// Capture the current process environment
    ///
    /// Variables whose names are not UTF-8 cannot be looked up and are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(name, value)| Some((name.into_string().ok()?, value)))
                .collect(),
        }
    }

    /// Build a snapshot from explicit pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<OsString>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable; empty values count as unset
    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars
            .get(name)
            .map(OsString::as_os_str)
            .filter(|v| !v.is_empty())
    }
}

/// Complete configuration for one harness invocation
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding `rust-toolchain` and `target/`
    pub project_root: PathBuf,
    /// Version-pin file
    pub toolchain_file: PathBuf,
    /// Toolchain installation root (`RUSTUP_HOME` or `~/.rustup`)
    pub toolchain_root: Option<PathBuf>,
    /// JVM installation root (`JAVA_HOME`)
    pub jvm_root: PathBuf,
    /// Cargo target directory
    pub target_dir: PathBuf,
    /// Active build profile
    pub profile: RunProfile,
    /// Driver executable name
    pub driver_name: String,
    /// Crate name of the extra linkable artifact
    pub extern_crate: String,
    /// Extension (without dot) selecting corpus files
    pub corpus_extension: String,
    /// Append-only timing log
    pub timing_log: PathBuf,
    /// Variable names forwarded from the caller's environment
    pub passthrough_vars: Vec<String>,
    /// Environment the harness was started with
    pub ambient: EnvSnapshot,
    /// Per-case limit; `None` waits forever
    pub timeout: Option<Duration>,
    /// Driver stream handling
    pub stream_mode: StreamMode,
    /// Flags appended after the input file
    pub extra_args: Vec<String>,
}

impl HarnessConfig {
    /// Derive a configuration from an environment snapshot
    pub fn from_env(project_root: impl Into<PathBuf>, env: &EnvSnapshot) -> Self {
        let project_root = project_root.into();

        let toolchain_root = env
            .get("RUSTUP_HOME")
            .map(PathBuf::from)
            .or_else(|| env.get("HOME").map(|home| Path::new(home).join(".rustup")));

        let jvm_root = PathBuf::from(
            env.get("JAVA_HOME")
                .unwrap_or_else(|| OsStr::new(DEFAULT_JAVA_HOME)),
        );

        let target_dir = env
            .get("CARGO_TARGET_DIR")
            .map(|dir| project_root.join(dir))
            .unwrap_or_else(|| project_root.join("target"));

        Self {
            toolchain_file: project_root.join(TOOLCHAIN_FILE),
            timing_log: target_dir.join("verify-timing.log"),
            toolchain_root,
            jvm_root,
            target_dir,
            profile: RunProfile::default(),
            driver_name: DEFAULT_DRIVER_NAME.to_string(),
            extern_crate: DEFAULT_EXTERN_CRATE.to_string(),
            corpus_extension: "rs".to_string(),
            passthrough_vars: DEFAULT_PASSTHROUGH_VARS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            ambient: env.clone(),
            timeout: None,
            stream_mode: StreamMode::default(),
            extra_args: Vec::new(),
            project_root,
        }
    }

    /// Overlay values from a config file; relative paths resolve against the project root
    pub fn with_file(mut self, file: ConfigFile) -> Self {
        let root = self.project_root.clone();
        let rooted = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };

        if let Some(p) = file.toolchain_file {
            self.toolchain_file = rooted(p);
        }
        if let Some(p) = file.toolchain_root {
            self.toolchain_root = Some(rooted(p));
        }
        if let Some(p) = file.jvm_root {
            self.jvm_root = rooted(p);
        }
        if let Some(p) = file.target_dir {
            self.target_dir = rooted(p);
            self.timing_log = self.target_dir.join("verify-timing.log");
        }
        if let Some(p) = file.timing_log {
            self.timing_log = rooted(p);
        }
        if let Some(profile) = file.profile {
            self.profile = profile;
        }
        if let Some(name) = file.driver_name {
            self.driver_name = name;
        }
        if let Some(name) = file.extern_crate {
            self.extern_crate = name;
        }
        if let Some(ext) = file.corpus_extension {
            self.corpus_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(vars) = file.passthrough_vars {
            self.passthrough_vars = vars;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = timeout_from_secs(secs);
        }
        if let Some(capture) = file.capture_output {
            self.stream_mode = if capture {
                StreamMode::Capture
            } else {
                StreamMode::Inherit
            };
        }
        if let Some(args) = file.extra_args {
            self.extra_args = args;
        }
        self
    }

    /// `<target>/<profile>`
    pub fn profile_dir(&self) -> PathBuf {
        self.target_dir.join(self.profile.dir_name())
    }

    /// `<target>/<profile>/deps`
    pub fn deps_dir(&self) -> PathBuf {
        self.profile_dir().join("deps")
    }

    /// Build-output directories for the active profile, in search order
    pub fn build_output_dirs(&self) -> [PathBuf; 2] {
        [self.profile_dir(), self.deps_dir()]
    }

    /// Driver executable for the active profile
    pub fn driver_path(&self) -> PathBuf {
        self.profile_dir().join(&self.driver_name)
    }
}

/// Zero disables the timeout
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// On-disk JSON overlay for [`HarnessConfig`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub toolchain_file: Option<PathBuf>,
    pub toolchain_root: Option<PathBuf>,
    pub jvm_root: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub profile: Option<RunProfile>,
    pub driver_name: Option<String>,
    pub extern_crate: Option<String>,
    pub corpus_extension: Option<String>,
    pub timing_log: Option<PathBuf>,
    pub passthrough_vars: Option<Vec<String>>,
    /// Zero means no timeout
    pub timeout_secs: Option<u64>,
    pub capture_output: Option<bool>,
    pub extra_args: Option<Vec<String>>,
}

impl ConfigFile {
    /// Parse a config file from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        Self::parse(&text)
    }
}
