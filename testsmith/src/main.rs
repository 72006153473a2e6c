//! Test-first code-generation loop.
//!
//! Turns a one-line requirement into generated pytest code plus an
//! implementation that satisfies it, by looping an LLM backend against real
//! test runs in an isolated virtualenv.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use testsmith::engine::{Engine, RunStop};
use testsmith::exit_codes;
use testsmith::io::artifacts::ArtifactStore;
use testsmith::io::config::load_config;
use testsmith::io::console::StdConsole;
use testsmith::io::gateway::{DashScopeClient, Gateway};
use testsmith::io::sandbox::VenvSandbox;
use testsmith::logging;

#[derive(Parser)]
#[command(
    name = "testsmith",
    version,
    about = "Test-first code generation loop over an LLM backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full loop for one requirement.
    Run {
        /// Requirement text. Prompted for interactively when omitted.
        #[arg(short, long)]
        requirement: Option<String>,
        /// Directory for generated artifacts and the sandbox.
        #[arg(long, default_value = "app")]
        workspace: PathBuf,
        /// Config file. Built-in defaults are used when the file is missing.
        #[arg(long, default_value = "testsmith.toml")]
        config: PathBuf,
    },
}

fn main() {
    logging::init();
    // The credential may live in a local .env file.
    dotenvy::dotenv().ok();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            requirement,
            workspace,
            config,
        } => cmd_run(requirement, &workspace, &config),
    }
}

fn cmd_run(requirement: Option<String>, workspace: &Path, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let client = DashScopeClient::from_env(&config)?;
    let gateway = Gateway::new(client, &config);
    let sandbox = VenvSandbox::new(
        workspace,
        Duration::from_secs(config.test_timeout_secs),
        config.output_limit_bytes,
    );
    let store = ArtifactStore::new(workspace);
    let mut console = StdConsole;

    let mut engine = Engine::new(gateway, store, &sandbox, &mut console, &config);
    let outcome = engine.run(requirement)?;

    match outcome.stop {
        RunStop::Completed { .. } => Ok(exit_codes::OK),
        RunStop::GaveUp { node, attempts } => {
            let state_path = workspace.join("state.json");
            write_json(&state_path, &outcome.state)?;
            eprintln!(
                "gave up after {attempts} attempts at {}; partial state written to {}",
                node.name(),
                state_path.display()
            );
            Ok(exit_codes::GAVE_UP)
        }
    }
}

/// Serialize `value` to pretty-printed JSON with trailing newline.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
