//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Corpus used by `suite` when none is given, relative to the project root
pub(crate) const DEFAULT_CORPUS: &str = "tests/verify";

pub(crate) const CLI_LONG_ABOUT: &str =
    "Resolve the pinned toolchain, JVM backend and build artifacts, then run the\n\
    verifier driver on one file or on a regression corpus.\n\n\
    Typical use:\n  \
    1. verirun env                       # check what will be handed to the driver\n  \
    2. verirun run tests/verify/pass/a.rs\n  \
    3. verirun --release suite tests/verify --report target/suite.json\n\n\
    Suites stop at the first failing file. Every attempted file appends\n\
    `<path> <seconds>` to the timing log.";

#[derive(Parser)]
#[command(name = "verirun")]
#[command(about = "Toolchain orchestration and regression harness for a compiler-integrated verifier")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Project root holding `rust-toolchain` and `target/`
    #[arg(long, global = true, default_value = ".")]
    pub(crate) project_root: PathBuf,

    /// JSON config file overlaid on environment-derived settings
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Use the release build output instead of debug
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) release: bool,

    /// Kill a driver run after this many seconds (0 disables)
    #[arg(long, global = true)]
    pub(crate) timeout_secs: Option<u64>,

    /// Capture driver output instead of streaming it live
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) capture: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Verify a single file
    #[command(display_order = 10)]
    Run {
        /// Input file (falls back to VERIRUN_FILE)
        #[arg(env = "VERIRUN_FILE")]
        file: PathBuf,

        /// Extra flags passed to the driver after the input file
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Verify every file of a corpus, stopping at the first failure
    #[command(display_order = 20)]
    Suite {
        /// Corpus directory [default: <project-root>/tests/verify]
        corpus: Option<PathBuf>,

        /// Timing log to append to
        #[arg(long)]
        log: Option<PathBuf>,

        /// Write a JSON suite report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Extension selecting corpus files
        #[arg(long)]
        ext: Option<String>,

        /// Extra flags passed to the driver after each input file
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Print the environment composed for the driver
    #[command(display_order = 30)]
    Env {
        /// Emit JSON instead of KEY=VALUE lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the directory holding the native JVM library
    #[command(display_order = 40)]
    LocateJvm,

    /// Summarise the timing log, slowest first
    #[command(display_order = 50)]
    Timings {
        /// Timing log to read
        #[arg(long)]
        log: Option<PathBuf>,

        /// Only show the N slowest entries
        #[arg(long)]
        top: Option<usize>,
    },
}
