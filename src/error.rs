//! Error types for the Verirun harness

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Harness errors
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors
    /// A required configuration input is absent or empty
    ///
    /// **Triggered by:** Missing or blank `rust-toolchain` file, no `RUSTUP_HOME`/`HOME`
    /// **Example:** Running from a directory that has no pinned toolchain
    #[error("Configuration missing: {what} ({detail})")]
    ConfigurationMissing {
        /// Which input was missing
        what: String,
        /// Where it was expected to come from
        detail: String,
    },

    /// A filesystem lookup produced no candidate
    ///
    /// **Triggered by:** No `libjvm.so` under `JAVA_HOME`, no contracts rlib in `deps`
    /// **Prevention:** Point `JAVA_HOME` at a full JDK, build the contracts crate first
    #[error("Dependency not found: {what} (searched {})", searched.display())]
    DependencyNotFound {
        /// What was being looked for
        what: String,
        /// Directory the search was rooted at
        searched: PathBuf,
    },

    /// A filesystem lookup produced more than one candidate
    ///
    /// **Triggered by:** Two JDK variants under one root, stale rlibs with different hashes
    /// **Prevention:** Narrow `JAVA_HOME`, run `cargo clean -p <crate>`
    #[error("Ambiguous dependency: {what} matched {} candidates: {}", matches.len(), display_paths(matches))]
    AmbiguousDependency {
        /// What was being looked for
        what: String,
        /// Every candidate that matched
        matches: Vec<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Execution errors
    /// The external driver exited unsuccessfully
    ///
    /// Verification failures and compiler errors are not distinguished here.
    #[error("{} failed on {}: {status}", program.display(), input.display())]
    ExternalProcessFailure {
        /// Program that was launched
        program: PathBuf,
        /// Input file it was given
        input: PathBuf,
        /// Rendered exit status
        status: String,
    },

    /// The external driver was killed after exceeding the configured timeout
    #[error("Timeout after {after:?} on {}", input.display())]
    Timeout {
        /// Input file that was running
        input: PathBuf,
        /// Configured limit
        after: Duration,
    },

    // I/O errors
    /// Filesystem or process-spawn I/O failed
    #[error("I/O failure while {context}: {source}")]
    IoFailure {
        /// What the harness was doing
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Phase in which an error arose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Before any process was launched
    Resolution,
    /// While the driver ran or after it exited
    Execution,
    /// Reading or writing harness files
    Io,
}

impl ErrorPhase {
    /// Process exit code the CLI uses for this phase
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorPhase::Execution => 1,
            ErrorPhase::Resolution => 2,
            ErrorPhase::Io => 3,
        }
    }
}

impl Error {
    /// Create a configuration-missing error
    pub fn missing(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::ConfigurationMissing {
            what: what.into(),
            detail: detail.into(),
        }
    }

    /// Wrap an I/O error with the operation it interrupted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoFailure {
            context: context.into(),
            source,
        }
    }

    /// Classify error phase
    pub fn phase(&self) -> ErrorPhase {
        match self {
            Error::ConfigurationMissing { .. }
            | Error::DependencyNotFound { .. }
            | Error::AmbiguousDependency { .. }
            | Error::InvalidConfig(_) => ErrorPhase::Resolution,

            Error::ExternalProcessFailure { .. } | Error::Timeout { .. } => ErrorPhase::Execution,

            Error::IoFailure { .. } => ErrorPhase::Io,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for Verirun operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_map_to_exit_code_two() {
        let err = Error::missing("pinned toolchain version", "rust-toolchain is empty");
        assert_eq!(err.phase(), ErrorPhase::Resolution);
        assert_eq!(err.phase().exit_code(), 2);

        let err = Error::AmbiguousDependency {
            what: "libjvm.so".to_string(),
            matches: vec![PathBuf::from("/a/libjvm.so"), PathBuf::from("/b/libjvm.so")],
        };
        assert_eq!(err.phase(), ErrorPhase::Resolution);
        assert!(err.to_string().contains("2 candidates"));
        assert!(err.to_string().contains("/a/libjvm.so, /b/libjvm.so"));
    }

    #[test]
    fn test_driver_failure_is_execution_phase() {
        let err = Error::ExternalProcessFailure {
            program: PathBuf::from("verify-driver"),
            input: PathBuf::from("a.rs"),
            status: "exit status: 101".to_string(),
        };
        assert_eq!(err.phase().exit_code(), 1);
        assert_eq!(err.to_string(), "verify-driver failed on a.rs: exit status: 101");
    }

    #[test]
    fn test_io_failure_keeps_source() {
        let err = Error::io(
            "appending timing record",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.phase(), ErrorPhase::Io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
