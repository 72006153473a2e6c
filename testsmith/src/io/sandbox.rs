//! Execution sandbox: an isolated virtualenv for running generated tests.
//!
//! The [`Sandbox`] trait decouples the engine from the actual execution
//! backend. Tests use scripted sandboxes that return predetermined reports
//! without spawning processes.

use std::cell::Cell;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::classifier::{TestReport, parse_report};
use crate::error::SandboxError;
use crate::io::artifacts::TEST_MODULE;
use crate::io::process::run_command_with_timeout;

/// Subdirectory of the workspace holding the virtualenv. Provisioning-only
/// state, never treated as an artifact.
pub const ENV_DIR: &str = "env";

/// Abstraction over test-execution backends.
pub trait Sandbox {
    /// Idempotently provision the isolated environment with the test runner
    /// available. Provisioning failure is fatal: no subsequent
    /// classification can be trusted.
    fn prepare(&self) -> Result<()>;

    /// Run the test command against the current artifacts and return a
    /// structured report. A failing test run is a normal result, not an
    /// error; only spawn failures error.
    fn run_tests(&self) -> Result<TestReport>;
}

/// Sandbox backed by a python virtualenv under `workspace/env`.
pub struct VenvSandbox {
    workspace: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
    provisioned: Cell<bool>,
}

impl VenvSandbox {
    /// A relative `workspace` is resolved against the current directory at
    /// construction, so the idempotence check and every spawned command agree
    /// on one absolute location.
    pub fn new(workspace: impl Into<PathBuf>, timeout: Duration, output_limit_bytes: usize) -> Self {
        let workspace = workspace.into();
        let workspace = if workspace.is_absolute() {
            workspace
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&workspace))
                .unwrap_or(workspace)
        };
        Self {
            workspace,
            timeout,
            output_limit_bytes,
            provisioned: Cell::new(false),
        }
    }

    pub fn env_dir(&self) -> PathBuf {
        self.workspace.join(ENV_DIR)
    }

    fn python_path(&self) -> PathBuf {
        self.env_dir().join("bin").join("python")
    }

    fn pip_path(&self) -> PathBuf {
        self.env_dir().join("bin").join("pip")
    }

    fn run_provisioning(&self, label: &str, cmd: Command) -> Result<()> {
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        if output.timed_out || !output.status.success() {
            return Err(SandboxError::new(format!(
                "{label} failed: {}",
                output.combined_text().trim()
            ))
            .into());
        }
        Ok(())
    }
}

impl Sandbox for VenvSandbox {
    #[instrument(skip_all, fields(workspace = %self.workspace.display()))]
    fn prepare(&self) -> Result<()> {
        if self.provisioned.get() {
            return Ok(());
        }
        fs::create_dir_all(&self.workspace)
            .with_context(|| format!("create workspace {}", self.workspace.display()))?;

        if !self.python_path().exists() {
            info!("creating virtualenv");
            let mut cmd = Command::new("python3");
            cmd.arg("-m")
                .arg("venv")
                .arg(self.env_dir())
                .current_dir(&self.workspace);
            self.run_provisioning("create virtualenv", cmd)?;
        }

        // pip no-ops quickly when the requirement is already satisfied.
        let mut cmd = Command::new(self.pip_path());
        cmd.arg("install").arg("pytest").current_dir(&self.workspace);
        self.run_provisioning("install pytest", cmd)?;

        self.provisioned.set(true);
        debug!("sandbox provisioned");
        Ok(())
    }

    #[instrument(skip_all)]
    fn run_tests(&self) -> Result<TestReport> {
        let mut cmd = Command::new(self.python_path());
        cmd.arg("-m")
            .arg("pytest")
            .arg(TEST_MODULE)
            .current_dir(&self.workspace);

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        let combined = output.combined_text();
        if output.timed_out {
            // Partial output from a killed run is untrustworthy; report it
            // without markers so it classifies to the unexpected branch.
            info!(timeout_secs = self.timeout.as_secs(), "test run timed out");
            return Ok(TestReport::inconclusive(format!(
                "{combined}\n[test run killed after {}s]",
                self.timeout.as_secs()
            )));
        }

        let report = parse_report(&combined);
        debug!(
            passed = report.passed,
            failed = report.failed,
            errors = report.errors,
            "test run finished"
        );
        Ok(report)
    }
}
