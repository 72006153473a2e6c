//! Generation gateway: the five text-generation operations of the loop.
//!
//! The [`TextCompletion`] trait decouples prompt construction and retry
//! policy from the actual backend transport. Tests use scripted completions
//! that return predetermined text without network calls.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::GenerationError;
use crate::io::config::EngineConfig;

const IDEAS_TEMPLATE: &str = include_str!("prompts/ideas.md");
const TEST_CODE_TEMPLATE: &str = include_str!("prompts/test_code.md");
const STUB_IMPL_TEMPLATE: &str = include_str!("prompts/stub_impl.md");
const IMPL_CODE_TEMPLATE: &str = include_str!("prompts/impl_code.md");
const SUMMARY_TEMPLATE: &str = include_str!("prompts/summary.md");

/// Abstraction over "generate text from prompt" backends.
pub trait TextCompletion {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Gateway wrapping a backend with prompt templates and bounded retry.
pub struct Gateway<C: TextCompletion> {
    backend: C,
    env: Environment<'static>,
    retries: u32,
    backoff: Duration,
}

impl<C: TextCompletion> Gateway<C> {
    pub fn new(backend: C, config: &EngineConfig) -> Self {
        let mut env = Environment::new();
        env.add_template("ideas", IDEAS_TEMPLATE)
            .expect("ideas template should be valid");
        env.add_template("test_code", TEST_CODE_TEMPLATE)
            .expect("test_code template should be valid");
        env.add_template("stub_impl", STUB_IMPL_TEMPLATE)
            .expect("stub_impl template should be valid");
        env.add_template("impl_code", IMPL_CODE_TEMPLATE)
            .expect("impl_code template should be valid");
        env.add_template("summary", SUMMARY_TEMPLATE)
            .expect("summary template should be valid");
        Self {
            backend,
            env,
            retries: config.gateway_retries,
            backoff: Duration::from_millis(config.gateway_backoff_ms),
        }
    }

    /// Generate unit-test ideas for a requirement.
    pub fn ideas(&self, requirement: &str) -> Result<String> {
        let prompt = self.render("ideas", context! { requirement })?;
        self.complete_with_retry("test ideas", &prompt)
    }

    /// Generate pytest code for the confirmed test ideas.
    pub fn test_code(&self, requirement: &str, ideas: &str) -> Result<String> {
        let prompt = self.render("test_code", context! { requirement, ideas })?;
        self.complete_with_retry("test code", &prompt)
    }

    /// Generate a stub implementation whose functions raise not-implemented.
    pub fn stub_impl(&self, requirement: &str, ideas: &str) -> Result<String> {
        let prompt = self.render("stub_impl", context! { requirement, ideas })?;
        self.complete_with_retry("stub implementation", &prompt)
    }

    /// Generate a real implementation attempt.
    pub fn impl_code(&self, requirement: &str, ideas: &str) -> Result<String> {
        let prompt = self.render("impl_code", context! { requirement, ideas })?;
        self.complete_with_retry("implementation", &prompt)
    }

    /// Generate the final human-readable report.
    pub fn summary(
        &self,
        requirement: &str,
        ideas: &str,
        implementation: &str,
        result: &str,
    ) -> Result<String> {
        let prompt = self.render(
            "summary",
            context! { requirement, ideas, implementation, result },
        )?;
        self.complete_with_retry("summary", &prompt)
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template.render(ctx)?;
        Ok(rendered)
    }

    /// Call the backend, retrying transient failures with linear backoff a
    /// bounded number of times before propagating.
    #[instrument(skip_all, fields(label = label))]
    fn complete_with_retry(&self, label: &str, prompt: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.backend.complete(prompt) {
                Ok(text) => {
                    debug!(label, attempt, bytes = text.len(), "generation completed");
                    return Ok(text);
                }
                Err(err) if err.is_retryable() && attempt <= self.retries => {
                    warn!(label, attempt, err = %err, "generation failed, retrying");
                    thread::sleep(self.backoff * attempt);
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("generate {label}"));
                }
            }
        }
    }
}

const DASHSCOPE_API_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
const DEFAULT_MODEL: &str = "qwen-turbo";

/// Backend over the dashscope text-generation HTTP API.
///
/// The credential is read from `DASHSCOPE_API_KEY` at construction but its
/// absence only errors on first use, so a run can be configured and
/// inspected without one.
pub struct DashScopeClient {
    http: reqwest::blocking::Client,
    api_key: Option<String>,
    model: String,
    top_p: f64,
    temperature: f64,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct GenerationParameters {
    top_p: f64,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Deserialize)]
struct GenerationOutput {
    text: String,
}

impl DashScopeClient {
    /// Build a client from the environment and engine config.
    ///
    /// Model resolution order: config override, `DASHSCOPE_MODEL`, backend
    /// default.
    pub fn from_env(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()
            .context("build http client")?;
        let model = config
            .model
            .clone()
            .or_else(|| env::var("DASHSCOPE_MODEL").ok())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = env::var("DASHSCOPE_API_KEY")
            .ok()
            .filter(|value| !value.is_empty());
        Ok(Self {
            http,
            api_key,
            model,
            top_p: config.top_p,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextCompletion for DashScopeClient {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential)?;

        let request = GenerationRequest {
            model: &self.model,
            input: GenerationInput { prompt },
            parameters: GenerationParameters {
                top_p: self.top_p,
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(DASHSCOPE_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerationResponse = response
            .json()
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        Ok(parsed.output.text)
    }
}
