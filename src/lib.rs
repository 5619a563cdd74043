//! # Verirun - Verifier Toolchain Orchestration and Regression Harness
//!
//! Verirun sits in front of a compiler-integrated static verifier. It works
//! out where the pinned compiler toolchain, the JVM-hosted backend and the
//! freshly built artifacts live, composes the environment a driver run
//! needs, and then drives the verifier over one file or a whole corpus.
//!
//! ## Architecture
//!
//! ```text
//! rust-toolchain ─┐
//! RUSTUP_HOME ────┼─→ toolchain ─┐
//! JAVA_HOME ──────┼─→ jvm ───────┼─→ environment ─→ driver ─→ <verify-driver>
//! --release ──────┘              │                    ↑
//!                   target/<profile>                suite (fail-fast, timing log)
//! ```
//!
//! ### Main Components
//!
//! - [`toolchain`] - Pinned version file and toolchain library directory
//! - [`jvm`] - Unique native JVM library lookup
//! - [`environment`] - Ordered library search path and environment map
//! - [`driver`] - Command construction and child process execution
//! - [`suite`] - Corpus discovery, fail-fast runner, timing log
//! - [`session`] - Resolve once, then run
//!
//! ## Usage
//!
//! ```no_run
//! use verirun::{EnvSnapshot, HarnessConfig, Session};
//! use std::path::Path;
//!
//! # fn main() -> verirun::Result<()> {
//! let config = HarnessConfig::from_env(".", &EnvSnapshot::capture());
//! let session = Session::prepare(config)?;
//! let (outcome, _report) = session.run_suite(Path::new("tests/verify"))?;
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

/// Version of the harness
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod driver;
pub mod environment;
pub mod error;
pub mod jvm;
pub mod session;
pub mod suite;
pub mod toolchain;

// Re-export main types
pub use config::{ConfigFile, EnvSnapshot, HarnessConfig, RunProfile, StreamMode};
pub use driver::{Driver, DriverInvoker, ExternArtifact, RunResult};
pub use environment::{compose, ComposedEnvironment, EnvironmentMap, LibrarySearchPath};
pub use error::{Error, ErrorPhase, Result};
pub use session::Session;
pub use suite::{SuiteOutcome, SuiteReport, SuiteRunner, TestCase, TimingLog, TimingRecord};
pub use toolchain::PinnedToolchainVersion;
