//! Console surface for the interactive confirm/revise loop.
//!
//! The [`Console`] trait is the hook point the engine uses for everything
//! user-facing: the requirement prompt, idea confirmation, workspace-wipe
//! confirmation, loop-back progress lines, and the final report. Tests use
//! scripted consoles that never touch stdin.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::state::Confirmation;

pub trait Console {
    /// Prompt for the initial requirement text.
    fn read_requirement(&mut self) -> Result<String>;

    /// Show generated test ideas and ask the user to confirm or revise.
    fn confirm_ideas(&mut self, ideas: &str) -> Result<Confirmation>;

    /// Prompt for supplemental requirement text after a revise decision.
    fn read_revision(&mut self) -> Result<String>;

    /// Ask whether leftover artifacts in an existing workspace may be
    /// deleted before the run starts.
    fn confirm_wipe(&mut self, workspace: &Path) -> Result<bool>;

    /// Print a loop-back progress line. Never treated as an error.
    fn progress(&mut self, message: &str);

    /// Print the final summary report.
    fn print_report(&mut self, report: &str);
}

/// Console over stdin/stdout.
pub struct StdConsole;

impl StdConsole {
    fn prompt_line(&self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        std::io::stdout().flush().context("flush stdout")?;
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read stdin")?;
        Ok(line.trim().to_string())
    }
}

impl Console for StdConsole {
    fn read_requirement(&mut self) -> Result<String> {
        self.prompt_line("Describe the requirement: ")
    }

    fn confirm_ideas(&mut self, ideas: &str) -> Result<Confirmation> {
        println!("\nProposed unit test ideas:\n{ideas}\n");
        let answer = self.prompt_line("Accept these test ideas? (y/n): ")?;
        if answer.eq_ignore_ascii_case("y") {
            Ok(Confirmation::Proceed)
        } else {
            Ok(Confirmation::Revise)
        }
    }

    fn read_revision(&mut self) -> Result<String> {
        self.prompt_line("Add to or adjust the requirement: ")
    }

    fn confirm_wipe(&mut self, workspace: &Path) -> Result<bool> {
        let answer = self.prompt_line(&format!(
            "Workspace {} already contains generated code. Delete it and start over? (y/n): ",
            workspace.display()
        ))?;
        Ok(answer.eq_ignore_ascii_case("y"))
    }

    fn progress(&mut self, message: &str) {
        println!("{message}");
    }

    fn print_report(&mut self, report: &str) {
        println!("\n===== Summary =====\n");
        println!("{report}");
    }
}
