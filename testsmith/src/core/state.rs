//! Shared workflow state threaded through every engine node.
//!
//! These types define stable contracts between the engine and its
//! collaborators. They should not depend on external state or I/O and must
//! remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// User decision after reviewing generated test ideas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    Proceed,
    Revise,
}

/// Classification of the most recent test execution.
///
/// `Unset` means no execution has happened since the last artifact change.
/// Any artifact rewrite must reset the status to `Unset`; a status is only
/// trusted when it was derived after the artifacts it describes were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Unset,
    /// Every test failed (the expected pre-implementation baseline).
    AllFail,
    /// Every test passed (the expected post-implementation result).
    AllPass,
    /// Tests passed against the stub, or produced no recognizable outcome,
    /// when failure was expected.
    UnexpectedPass,
    /// Tests failed, or produced no recognizable outcome, when success was
    /// expected.
    UnexpectedFail,
}

impl TestStatus {
    /// All variants, for transition-table domain checks.
    pub const ALL: [TestStatus; 5] = [
        TestStatus::Unset,
        TestStatus::AllFail,
        TestStatus::AllPass,
        TestStatus::UnexpectedPass,
        TestStatus::UnexpectedFail,
    ];
}

/// The single mutable record threaded node-to-node through a run.
///
/// Created once per top-level run, mutated in place by each node, and
/// returned to the caller inside the final outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Accumulated natural-language requirement. Append-only across revise
    /// cycles: supplemental text extends it, never replaces it.
    pub requirement: String,
    /// Generated unit-test ideas shown to the user for confirmation.
    pub test_ideas: String,
    /// Generated pytest code, once written to the artifact store.
    pub test_code: Option<String>,
    /// Generated real implementation, once written to the artifact store.
    /// The stub implementation is never recorded here.
    pub impl_code: Option<String>,
    /// Raw combined output of the most recent test execution.
    pub last_result: String,
    /// Most recent user confirmation decision.
    pub confirmation: Confirmation,
    /// Classification of the most recent test execution.
    pub test_status: TestStatus,
}

impl WorkflowState {
    /// Create a fresh state, optionally pre-seeded with a requirement.
    pub fn new(seed: Option<String>) -> Self {
        Self {
            requirement: seed.unwrap_or_default(),
            test_ideas: String::new(),
            test_code: None,
            impl_code: None,
            last_result: String::new(),
            confirmation: Confirmation::Proceed,
            test_status: TestStatus::Unset,
        }
    }

    /// Extend the requirement with supplemental text (newline-joined).
    pub fn append_requirement(&mut self, extra: &str) {
        if !self.requirement.is_empty() {
            self.requirement.push('\n');
        }
        self.requirement.push_str(extra);
    }

    /// Forget the last classification. Must be called whenever an artifact
    /// is rewritten so a stale status never survives an artifact change.
    pub fn invalidate_test_status(&mut self) {
        self.test_status = TestStatus::Unset;
    }
}
