//! Resolution-then-execution entry points
//!
//! [`Session::prepare`] performs every lookup that can fail for configuration
//! reasons (pin file, toolchain root, JVM library, extern rlib) before any
//! process is launched. A prepared session then runs one file or a whole
//! suite against the same resolved environment.

use crate::config::HarnessConfig;
use crate::driver::{resolve_extra_linkable, DriverInvoker, RunResult};
use crate::environment::{self, ComposedEnvironment};
use crate::suite::{discover, SuiteOutcome, SuiteReport, SuiteRunner, TimingLog};
use crate::Result;
use chrono::Utc;
use std::path::Path;
use tracing::info;

/// Fully resolved harness state for one invocation
#[derive(Debug, Clone)]
pub struct Session {
    config: HarnessConfig,
    composed: ComposedEnvironment,
    invoker: DriverInvoker,
}

impl Session {
    /// Resolve everything a driver run needs
    pub fn prepare(config: HarnessConfig) -> Result<Self> {
        let composed = environment::compose(&config)?;
        let artifact = resolve_extra_linkable(&config.deps_dir(), &config.extern_crate)?;
        info!(
            "Using toolchain {} ({}), JVM at {}, {}",
            composed.version,
            config.profile,
            composed.jvm_lib_dir.display(),
            artifact.path.display()
        );
        let invoker = DriverInvoker::new(&config, &composed, Some(artifact));
        Ok(Self {
            config,
            composed,
            invoker,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn environment(&self) -> &ComposedEnvironment {
        &self.composed
    }

    pub fn invoker(&self) -> &DriverInvoker {
        &self.invoker
    }

    /// Replace the driver executable, keeping the resolved environment
    pub fn with_driver_program(mut self, program: impl Into<std::path::PathBuf>) -> Self {
        self.invoker = self.invoker.with_program(program);
        self
    }

    /// Verify a single file; a non-zero exit is an error
    pub fn run_file(&self, input: &Path) -> Result<RunResult> {
        self.invoker.invoke_checked(input)
    }

    /// Run every corpus file, appending to the configured timing log
    pub fn run_suite(&self, corpus: &Path) -> Result<(SuiteOutcome, SuiteReport)> {
        let started_at = Utc::now();
        let cases = discover(corpus, &self.config.corpus_extension)?;
        info!(
            "Discovered {} case(s) under {}",
            cases.len(),
            corpus.display()
        );

        let runner = SuiteRunner::new(&self.invoker, TimingLog::new(&self.config.timing_log))
            .with_label_root(&self.config.project_root);
        let outcome = runner.run(&cases)?;
        let report = SuiteReport::new(
            started_at,
            self.config.profile,
            corpus,
            cases.len(),
            &outcome,
        );
        Ok((outcome, report))
    }
}
