//! Structured parsing and phase-aware classification of test-run output.
//!
//! The sandbox hands back a [`TestReport`] rather than raw text so that
//! classification operates on counts and marker flags, not ad hoc substring
//! checks scattered across call sites. The raw output is retained for
//! diagnostics and for the final summary prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::state::TestStatus;

/// Which baseline the execution is being judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Only the stub implementation exists: every test is expected to fail.
    PreImpl,
    /// A real implementation exists: every test is expected to pass.
    PostImpl,
}

/// Structured result of one test execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Number of passed cases from the runner summary line, if present.
    pub passed: u32,
    /// Number of failed cases from the runner summary line, if present.
    pub failed: u32,
    /// Number of errored cases from the runner summary line, if present.
    pub errors: u32,
    /// Raw output contained a failure marker ("failed"/"error").
    pub has_failure_marker: bool,
    /// Raw output contained a success marker ("passed").
    pub has_success_marker: bool,
    /// Raw combined stdout/stderr, kept for diagnostics.
    pub raw: String,
}

static PASSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) passed").unwrap());
static FAILED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) failed").unwrap());
static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) errors?").unwrap());

impl TestReport {
    /// Report for a run that produced no trustworthy output (e.g. the test
    /// process was killed on timeout). Carries no markers, so it always
    /// classifies to the unexpected branch of the current phase.
    pub fn inconclusive(raw: String) -> Self {
        Self {
            passed: 0,
            failed: 0,
            errors: 0,
            has_failure_marker: false,
            has_success_marker: false,
            raw,
        }
    }
}

/// Parse raw test-runner output into a structured report.
///
/// Counts come from pytest-style summary fragments (`3 passed`, `1 failed`,
/// `2 errors`); marker flags are case-insensitive substring checks so that
/// per-test `FAILED`/`ERROR` lines count even when no summary was printed
/// (e.g. a collection error aborted the run).
pub fn parse_report(raw: &str) -> TestReport {
    let lower = raw.to_lowercase();
    TestReport {
        passed: capture_count(&PASSED_RE, &lower),
        failed: capture_count(&FAILED_RE, &lower),
        errors: capture_count(&ERROR_RE, &lower),
        has_failure_marker: lower.contains("failed") || lower.contains("error"),
        has_success_marker: lower.contains("passed"),
        raw: raw.to_string(),
    }
}

fn capture_count(re: &Regex, lower: &str) -> u32 {
    re.captures(lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Classify a report against the expected outcome for the given phase.
///
/// - `PreImpl` expects every test to fail: `AllFail` iff a failure marker is
///   present and no success marker, otherwise `UnexpectedPass`.
/// - `PostImpl` expects every test to pass: `AllPass` iff a success marker is
///   present and no failure marker, otherwise `UnexpectedFail`.
///
/// Output with no recognizable marker (the sandbox errored before any test
/// ran) lands on the unexpected branch of the current phase, never on a
/// silent pass.
pub fn classify(report: &TestReport, phase: Phase) -> TestStatus {
    match phase {
        Phase::PreImpl => {
            if report.has_failure_marker && !report.has_success_marker {
                TestStatus::AllFail
            } else {
                TestStatus::UnexpectedPass
            }
        }
        Phase::PostImpl => {
            if report.has_success_marker && !report.has_failure_marker {
                TestStatus::AllPass
            } else {
                TestStatus::UnexpectedFail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_only_output_is_all_fail_pre_impl() {
        let report = parse_report("test_main.py::test_sum FAILED\n2 failed in 0.03s");
        assert_eq!(classify(&report, Phase::PreImpl), TestStatus::AllFail);
    }

    #[test]
    fn failure_only_output_is_unexpected_fail_post_impl() {
        let report = parse_report("test_main.py::test_sum FAILED\n2 failed in 0.03s");
        assert_eq!(classify(&report, Phase::PostImpl), TestStatus::UnexpectedFail);
    }

    #[test]
    fn success_only_output_is_all_pass_post_impl() {
        let report = parse_report("3 passed in 0.05s");
        assert_eq!(classify(&report, Phase::PostImpl), TestStatus::AllPass);
    }

    #[test]
    fn success_only_output_is_unexpected_pass_pre_impl() {
        let report = parse_report("3 passed in 0.05s");
        assert_eq!(classify(&report, Phase::PreImpl), TestStatus::UnexpectedPass);
    }

    #[test]
    fn mixed_output_is_unexpected_in_both_phases() {
        let report = parse_report("1 failed, 2 passed in 0.04s");
        assert_eq!(classify(&report, Phase::PreImpl), TestStatus::UnexpectedPass);
        assert_eq!(classify(&report, Phase::PostImpl), TestStatus::UnexpectedFail);
    }

    #[test]
    fn markerless_output_is_never_a_silent_pass() {
        let report = parse_report("python3: No module named pytest");
        assert_eq!(classify(&report, Phase::PreImpl), TestStatus::UnexpectedPass);
        assert_eq!(classify(&report, Phase::PostImpl), TestStatus::UnexpectedFail);
    }

    #[test]
    fn inconclusive_report_carries_no_markers() {
        let report = TestReport::inconclusive("partial FAILED output then killed".to_string());
        assert!(!report.has_failure_marker);
        assert_eq!(classify(&report, Phase::PreImpl), TestStatus::UnexpectedPass);
        assert_eq!(classify(&report, Phase::PostImpl), TestStatus::UnexpectedFail);
    }

    #[test]
    fn summary_counts_are_extracted() {
        let report = parse_report("== 1 failed, 2 passed, 1 error in 0.11s ==");
        assert_eq!(report.failed, 1);
        assert_eq!(report.passed, 2);
        assert_eq!(report.errors, 1);
    }

    #[test]
    fn missing_summary_counts_default_to_zero() {
        let report = parse_report("collection error");
        assert_eq!(report.passed, 0);
        assert_eq!(report.failed, 0);
        assert!(report.has_failure_marker);
    }
}
