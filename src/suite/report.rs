//! Machine-readable summary of one suite run

use super::{SuiteOutcome, TimingRecord};
use crate::config::RunProfile;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Aborted,
}

/// JSON report written next to the timing log on request
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub profile: RunProfile,
    pub corpus: PathBuf,
    pub status: ReportStatus,
    /// Cases discovered, including ones never attempted
    pub cases_total: usize,
    pub records: Vec<TimingRecord>,
    pub failed_case: Option<PathBuf>,
    pub failed_status: Option<String>,
    /// Captured stderr of the failing case, lossily decoded
    pub failed_stderr: Option<String>,
}

impl SuiteReport {
    pub fn new(
        started_at: DateTime<Utc>,
        profile: RunProfile,
        corpus: &Path,
        cases_total: usize,
        outcome: &SuiteOutcome,
    ) -> Self {
        let (status, failed_case, failed_status, failed_stderr) = match outcome {
            SuiteOutcome::Completed { .. } => (ReportStatus::Completed, None, None, None),
            SuiteOutcome::Aborted {
                failed_case,
                result,
                ..
            } => (
                ReportStatus::Aborted,
                Some(failed_case.path().to_path_buf()),
                Some(result.describe()),
                (!result.stderr.is_empty())
                    .then(|| String::from_utf8_lossy(&result.stderr).into_owned()),
            ),
        };

        Self {
            started_at,
            profile,
            corpus: corpus.to_path_buf(),
            status,
            cases_total,
            records: outcome.records().to_vec(),
            failed_case,
            failed_status,
            failed_stderr,
        }
    }

    /// Sum of recorded seconds
    pub fn total_secs(&self) -> u64 {
        self.records.iter().map(|r| r.elapsed_secs).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("serializing suite report: {}", e)))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| Error::io(format!("writing report {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_completed_report_json() {
        let outcome = SuiteOutcome::Completed {
            records: vec![
                TimingRecord::new("a.rs", Duration::from_secs(3)),
                TimingRecord::new("b.rs", Duration::from_secs(4)),
            ],
        };
        let report = SuiteReport::new(
            Utc::now(),
            RunProfile::Release,
            Path::new("tests/verify"),
            2,
            &outcome,
        );
        assert_eq!(report.total_secs(), 7);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["profile"], "release");
        assert_eq!(json["records"][1]["case"], "b.rs");
        assert!(json["failed_case"].is_null());
    }
}
