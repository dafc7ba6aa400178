//! Run results and the JSON report

use serde::Serialize;
use std::path::Path;

use crate::common::Result;

/// Outcome of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    /// Not run: an earlier test in the same flow failed, or the run aborted
    Skipped,
}

/// Result of a test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub file: String,
    pub id: String,
    pub name: String,
    pub status: TestStatus,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when a configuration or login failure stopped the run
    pub aborted: Option<String>,
    pub duration_ms: u64,
    pub tests: Vec<TestResult>,
}

impl RunReport {
    pub fn push(&mut self, result: TestResult) {
        self.total += 1;
        match result.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
        self.tests.push(result);
    }

    /// True when nothing failed and the run was not aborted
    pub fn success(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, status: TestStatus) -> TestResult {
        TestResult {
            file: "flow.yaml".to_string(),
            id: id.to_string(),
            name: id.to_string(),
            status,
            steps_run: 1,
            steps_total: 1,
            error: None,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_counts_and_success() {
        let mut report = RunReport::default();
        report.push(result("a", TestStatus::Passed));
        assert!(report.success());

        report.push(result("b", TestStatus::Failed));
        report.push(result("c", TestStatus::Skipped));
        assert_eq!((report.total, report.passed, report.failed, report.skipped), (3, 1, 1, 1));
        assert!(!report.success());
    }

    #[test]
    fn test_aborted_is_failure() {
        let report = RunReport {
            aborted: Some("Login failed".to_string()),
            ..Default::default()
        };
        assert!(!report.success());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let mut report = RunReport::default();
        report.push(result("a", TestStatus::Passed));
        report.write_json(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["passed"], 1);
        assert_eq!(parsed["tests"][0]["status"], "passed");
    }
}
