//! I/O adapters: artifact files, sandbox, LLM transport, console, config.

pub mod artifacts;
pub mod config;
pub mod console;
pub mod gateway;
pub mod process;
pub mod sandbox;
