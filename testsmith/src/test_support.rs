//! Scripted collaborators for engine tests.
//!
//! Only compiled for tests or with the `test-support` feature enabled, so
//! integration tests can drive the engine without a network, a python
//! interpreter, or a terminal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;

use crate::core::classifier::{TestReport, parse_report};
use crate::core::state::Confirmation;
use crate::error::GenerationError;
use crate::io::artifacts::ArtifactStore;
use crate::io::console::Console;
use crate::io::gateway::TextCompletion;
use crate::io::sandbox::Sandbox;

/// Backend returning scripted responses in order, then an optional fallback
/// once the script runs dry. Records every prompt it was given.
pub struct ScriptedCompletion {
    responses: RefCell<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().map(String::from).collect()),
            fallback: None,
            prompts: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_fallback(responses: Vec<&str>, fallback: &str) -> Self {
        Self {
            fallback: Some(fallback.to_string()),
            ..Self::new(responses)
        }
    }

    /// Shared handle to the recorded prompts, usable after the completion
    /// has been moved into a gateway.
    pub fn prompts(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.prompts)
    }
}

impl TextCompletion for ScriptedCompletion {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        if let Some(next) = self.responses.borrow_mut().pop_front() {
            return Ok(next);
        }
        match &self.fallback {
            Some(text) => Ok(text.clone()),
            None => panic!("scripted completion exhausted"),
        }
    }
}

/// Sandbox returning scripted raw test outputs, parsed exactly like the real
/// sandbox parses pytest output.
pub struct ScriptedSandbox {
    outputs: RefCell<VecDeque<String>>,
    fallback: Option<String>,
    pub prepare_calls: Cell<u32>,
}

impl ScriptedSandbox {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into_iter().map(String::from).collect()),
            fallback: None,
            prepare_calls: Cell::new(0),
        }
    }

    pub fn with_fallback(outputs: Vec<&str>, fallback: &str) -> Self {
        Self {
            fallback: Some(fallback.to_string()),
            ..Self::new(outputs)
        }
    }
}

impl Sandbox for ScriptedSandbox {
    fn prepare(&self) -> Result<()> {
        self.prepare_calls.set(self.prepare_calls.get() + 1);
        Ok(())
    }

    fn run_tests(&self) -> Result<TestReport> {
        let raw = self
            .outputs
            .borrow_mut()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| panic!("scripted sandbox exhausted"));
        Ok(parse_report(&raw))
    }
}

/// Console with scripted answers; records progress lines and reports.
pub struct ScriptedConsole {
    pub requirement: String,
    pub confirmations: VecDeque<Confirmation>,
    pub revisions: VecDeque<String>,
    pub wipe_answer: bool,
    pub progress_lines: Vec<String>,
    pub reports: Vec<String>,
}

impl ScriptedConsole {
    /// A console that supplies `requirement` and confirms everything.
    pub fn proceeding(requirement: &str) -> Self {
        Self {
            requirement: requirement.to_string(),
            confirmations: VecDeque::new(),
            revisions: VecDeque::new(),
            wipe_answer: true,
            progress_lines: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Queue a revise decision with its supplemental requirement text.
    pub fn push_revision(&mut self, extra: &str) {
        self.confirmations.push_back(Confirmation::Revise);
        self.revisions.push_back(extra.to_string());
    }
}

impl Console for ScriptedConsole {
    fn read_requirement(&mut self) -> Result<String> {
        Ok(self.requirement.clone())
    }

    fn confirm_ideas(&mut self, _ideas: &str) -> Result<Confirmation> {
        Ok(self
            .confirmations
            .pop_front()
            .unwrap_or(Confirmation::Proceed))
    }

    fn read_revision(&mut self) -> Result<String> {
        Ok(self
            .revisions
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted revision left")))
    }

    fn confirm_wipe(&mut self, _workspace: &Path) -> Result<bool> {
        Ok(self.wipe_answer)
    }

    fn progress(&mut self, message: &str) {
        self.progress_lines.push(message.to_string());
    }

    fn print_report(&mut self, report: &str) {
        self.reports.push(report.to_string());
    }
}

/// Temporary workspace for artifact-store tests; deleted on drop.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(self.temp.path())
    }
}
