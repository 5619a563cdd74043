//! # Suite Runner
//!
//! Runs the driver over a corpus, one case at a time, in sorted path order:
//!
//! ```text
//! Idle → Running(case) → CaseSucceeded → Running(next) → ... → Completed
//!                      ↘ CaseFailed → Aborted
//! ```
//!
//! Every attempted case gets a timing record appended to the shared log
//! before the continue/stop decision is made, so after an abort the log holds
//! exactly the cases up to and including the failing one. Cases after the
//! failure are never launched.

pub mod discovery;
pub mod report;
pub mod timing;

pub use discovery::{discover, TestCase};
pub use report::SuiteReport;
pub use timing::{Clock, MonotonicClock, TimingLog, TimingRecord};

use crate::driver::{Driver, RunResult};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Terminal state of a suite run
#[derive(Debug, Clone)]
pub enum SuiteOutcome {
    /// Every case succeeded
    Completed {
        /// One record per case, in run order
        records: Vec<TimingRecord>,
    },
    /// Stopped at the first failing case
    Aborted {
        /// The case that failed
        failed_case: TestCase,
        /// Its run result, including any captured output
        result: RunResult,
        /// Records for all attempted cases, the failing one last
        records: Vec<TimingRecord>,
    },
}

impl SuiteOutcome {
    pub fn records(&self) -> &[TimingRecord] {
        match self {
            SuiteOutcome::Completed { records } | SuiteOutcome::Aborted { records, .. } => records,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SuiteOutcome::Completed { .. })
    }
}

/// Result of one attempted case
#[derive(Debug)]
struct CaseReport {
    case: TestCase,
    record: TimingRecord,
    result: RunResult,
}

/// Sequential fail-fast runner over a corpus
pub struct SuiteRunner<'a, D: Driver, C: Clock = MonotonicClock> {
    driver: &'a D,
    log: TimingLog,
    clock: C,
    label_root: Option<PathBuf>,
}

impl<'a, D: Driver> SuiteRunner<'a, D> {
    pub fn new(driver: &'a D, log: TimingLog) -> Self {
        Self::with_clock(driver, log, MonotonicClock::new())
    }
}

impl<'a, D: Driver, C: Clock> SuiteRunner<'a, D, C> {
    /// Runner with an explicit time source
    pub fn with_clock(driver: &'a D, log: TimingLog, clock: C) -> Self {
        Self {
            driver,
            log,
            clock,
            label_root: None,
        }
    }

    /// Write case paths to the log relative to `root`
    pub fn with_label_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.label_root = Some(root.into());
        self
    }

    pub fn log(&self) -> &TimingLog {
        &self.log
    }

    /// Discover cases under `corpus` and run them
    pub fn run_corpus(&self, corpus: &Path, extension: &str) -> Result<SuiteOutcome> {
        let cases = discover(corpus, extension)?;
        info!(
            "Discovered {} case(s) under {}",
            cases.len(),
            corpus.display()
        );
        self.run(&cases)
    }

    /// Run `cases` in order, stopping at the first failure
    pub fn run(&self, cases: &[TestCase]) -> Result<SuiteOutcome> {
        let mut records = Vec::with_capacity(cases.len());

        for (index, case) in cases.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, cases.len(), case.path().display());

            // The record is durable before deciding whether to go on.
            let report = self.run_case(case)?;
            records.push(report.record);

            if !report.result.success() {
                warn!(
                    "{} failed ({}); skipping {} remaining case(s)",
                    case.path().display(),
                    report.result.describe(),
                    cases.len() - index - 1
                );
                return Ok(SuiteOutcome::Aborted {
                    failed_case: report.case,
                    result: report.result,
                    records,
                });
            }
        }

        Ok(SuiteOutcome::Completed { records })
    }

    /// Run one case and append its timing record
    fn run_case(&self, case: &TestCase) -> Result<CaseReport> {
        let start = self.clock.now();
        let result = self.driver.run(case.path())?;
        let elapsed = self.clock.now().saturating_sub(start);

        let record = TimingRecord::new(case.label(self.label_root.as_deref()), elapsed);
        self.log.append(&record)?;
        info!("{} finished in {}s", record.case, record.elapsed_secs);

        Ok(CaseReport {
            case: case.clone(),
            record,
            result,
        })
    }
}
