//! Orchestration of one full test-first generation run.
//!
//! The engine walks the workflow graph one node at a time: generation nodes
//! call the gateway and write artifacts, execution nodes run the sandbox and
//! classify the result, and the transition table picks the next node from
//! the signal each node emits. Unexpected classifications are never fatal;
//! they route back to a regeneration node until the per-node attempt budget
//! runs out.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info};

use crate::core::classifier::{Phase, classify};
use crate::core::sanitize::strip_code_fences;
use crate::core::state::{Confirmation, TestStatus, WorkflowState};
use crate::core::transitions::{Node, Signal, TransitionTable};
use crate::io::artifacts::{ArtifactStore, IMPL_MODULE, TEST_MODULE};
use crate::io::config::EngineConfig;
use crate::io::console::Console;
use crate::io::gateway::{Gateway, TextCompletion};
use crate::io::sandbox::Sandbox;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// The loop reached the terminal node and produced a report.
    Completed { report: String },
    /// A node exhausted its attempt budget; the partial state is retained.
    GaveUp { node: Node, attempts: u32 },
}

/// Final result of a run, carrying the state for inspection either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: WorkflowState,
    pub stop: RunStop,
}

/// The workflow engine. Owns the gateway and artifact store, borrows the
/// sandbox and console so callers keep access to them across the run.
pub struct Engine<'a, C: TextCompletion, S: Sandbox, K: Console> {
    gateway: Gateway<C>,
    store: ArtifactStore,
    sandbox: &'a S,
    console: &'a mut K,
    max_node_attempts: u32,
}

impl<'a, C: TextCompletion, S: Sandbox, K: Console> Engine<'a, C, S, K> {
    pub fn new(
        gateway: Gateway<C>,
        store: ArtifactStore,
        sandbox: &'a S,
        console: &'a mut K,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            sandbox,
            console,
            max_node_attempts: config.max_node_attempts,
        }
    }

    /// Execute the workflow graph from `user_input` to `summarize`.
    ///
    /// `seed` pre-fills the requirement; when absent the console is asked.
    /// Returns `Ok` for both terminal outcomes (completed and gave-up);
    /// errors are reserved for the fatal classes: configuration, sandbox
    /// provisioning, and generation failures that survived retry.
    pub fn run(&mut self, seed: Option<String>) -> Result<RunOutcome> {
        self.reset_existing_workspace()?;

        let table = TransitionTable::standard();
        let mut state = WorkflowState::new(seed);
        let mut attempts: HashMap<Node, u32> = HashMap::new();
        let mut node = Node::UserInput;

        loop {
            let visits = {
                let counter = attempts.entry(node).or_insert(0);
                *counter += 1;
                *counter
            };
            if visits > self.max_node_attempts {
                info!(
                    node = node.name(),
                    max_attempts = self.max_node_attempts,
                    "attempt budget exhausted, giving up"
                );
                self.console.progress(&format!(
                    "Giving up: {} was attempted {} times without reaching a stable outcome.",
                    node.name(),
                    self.max_node_attempts
                ));
                return Ok(RunOutcome {
                    state,
                    stop: RunStop::GaveUp {
                        node,
                        attempts: self.max_node_attempts,
                    },
                });
            }
            debug!(node = node.name(), visit = visits, "entering node");

            if node == Node::Summarize {
                let report = self.summarize(&state)?;
                self.console.print_report(&report);
                return Ok(RunOutcome {
                    state,
                    stop: RunStop::Completed { report },
                });
            }

            let signal = self.dispatch(node, &mut state)?;
            node = table.next(node, signal).ok_or_else(|| {
                anyhow!("no transition from {} on {:?}", node.name(), signal)
            })?;
        }
    }

    fn dispatch(&mut self, node: Node, state: &mut WorkflowState) -> Result<Signal> {
        match node {
            Node::UserInput => self.user_input(state),
            Node::GenerateTestIdeas => self.generate_test_ideas(state),
            Node::UserConfirm => self.user_confirm(state),
            Node::GenerateTestCode => self.generate_test_code(state),
            Node::RunTest => self.run_test(state),
            Node::GenerateImplCode => self.generate_impl_code(state),
            Node::RunTestWithImpl => self.run_test_with_impl(state),
            Node::CheckTestResult => Ok(Signal::Status(state.test_status)),
            Node::Summarize => bail!("summarize is terminal and handled by the run loop"),
        }
    }

    fn user_input(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        if state.requirement.trim().is_empty() {
            state.requirement = self.console.read_requirement()?;
        }
        if state.requirement.trim().is_empty() {
            bail!("requirement must not be empty");
        }
        Ok(Signal::Always)
    }

    fn generate_test_ideas(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        state.test_ideas = self.gateway.ideas(&state.requirement)?;
        Ok(Signal::Always)
    }

    fn user_confirm(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        state.confirmation = self.console.confirm_ideas(&state.test_ideas)?;
        if state.confirmation == Confirmation::Revise {
            let extra = self.console.read_revision()?;
            apply_revision(state, &self.store, &extra)?;
        }
        Ok(Signal::Confirmed(state.confirmation))
    }

    fn generate_test_code(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        let code = strip_code_fences(
            &self
                .gateway
                .test_code(&state.requirement, &state.test_ideas)?,
        );
        self.store.write(TEST_MODULE, &code)?;
        state.test_code = Some(code);

        // First creation only: the initial run must be judged against a
        // deterministic "nothing implemented" baseline, not a missing module
        // that would fail with an unrelated import error.
        if !self.store.exists(IMPL_MODULE) {
            let stub = strip_code_fences(
                &self
                    .gateway
                    .stub_impl(&state.requirement, &state.test_ideas)?,
            );
            self.store.write(IMPL_MODULE, &stub)?;
        }

        state.invalidate_test_status();
        Ok(Signal::Always)
    }

    fn run_test(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        self.sandbox.prepare()?;
        let report = self.sandbox.run_tests()?;
        state.last_result = report.raw.clone();
        state.test_status = classify(&report, Phase::PreImpl);
        if state.test_status != TestStatus::AllFail {
            self.console.progress(&format!(
                "Expected every test to fail against the stub, saw {} passed / {} failed. \
                 Regenerating test code...",
                report.passed, report.failed
            ));
        }
        Ok(Signal::Status(state.test_status))
    }

    fn generate_impl_code(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        let code = strip_code_fences(
            &self
                .gateway
                .impl_code(&state.requirement, &state.test_ideas)?,
        );
        self.store.write(IMPL_MODULE, &code)?;
        state.impl_code = Some(code);
        state.invalidate_test_status();
        Ok(Signal::Always)
    }

    fn run_test_with_impl(&mut self, state: &mut WorkflowState) -> Result<Signal> {
        self.sandbox.prepare()?;
        let report = self.sandbox.run_tests()?;
        state.last_result = report.raw.clone();
        state.test_status = classify(&report, Phase::PostImpl);
        if state.test_status != TestStatus::AllPass {
            self.console.progress(&format!(
                "{} failed / {} passed. Regenerating implementation...",
                report.failed, report.passed
            ));
        }
        Ok(Signal::Status(state.test_status))
    }

    fn summarize(&mut self, state: &WorkflowState) -> Result<String> {
        let implementation = state.impl_code.as_deref().unwrap_or_default();
        self.gateway.summary(
            &state.requirement,
            &state.test_ideas,
            implementation,
            &state.last_result,
        )
    }

    /// Artifacts left over from a previous run would let tests pass against
    /// an implementation from another requirement. Ask before wiping; refuse
    /// to run if the user keeps them.
    fn reset_existing_workspace(&mut self) -> Result<()> {
        if !self.store.exists(TEST_MODULE) && !self.store.exists(IMPL_MODULE) {
            return Ok(());
        }
        if !self.console.confirm_wipe(self.store.root())? {
            bail!(
                "workspace {} already contains generated artifacts",
                self.store.root().display()
            );
        }
        self.store.delete(TEST_MODULE)?;
        self.store.delete(IMPL_MODULE)?;
        Ok(())
    }
}

/// Apply a requirement revision: extend the requirement text and purge both
/// artifacts so no stale artifact pair crosses requirement iterations.
pub fn apply_revision(
    state: &mut WorkflowState,
    store: &ArtifactStore,
    extra: &str,
) -> Result<()> {
    state.append_requirement(extra);
    store.delete(TEST_MODULE)?;
    store.delete(IMPL_MODULE)?;
    state.test_code = None;
    state.impl_code = None;
    state.invalidate_test_status();
    Ok(())
}
