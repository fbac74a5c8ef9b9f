// ABOUTME: Agent invocation wrapper with timeout, retry with backoff and the tool-calling loop
// ABOUTME: Returns raw text, an extracted JSON object, or trimmed free text per agent
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use super::extraction::extract_json_value;
use super::tools::{AgentTool, NutritionTool};
use super::AgentKind;
use crate::config::{LlmConfig, NutritionConfig, ServerConfig};
use crate::constants::limits::{MAX_TOOL_ITERATIONS, RAW_OUTPUT_PREVIEW_CHARS};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::{ChatMessage, ChatProvider, ChatRequest, FunctionCall, LlmProvider, Tool};
use crate::logging::PipelineLogger;

/// Runs agents against the configured providers
pub struct AgentRunner {
    provider: Arc<dyn LlmProvider>,
    message_provider: Arc<dyn LlmProvider>,
    tools: Vec<Arc<dyn AgentTool>>,
    call_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    structured_output: bool,
    plan_days: u8,
}

impl AgentRunner {
    /// Runner over explicit providers, with the nutrition tool registered
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        message_provider: Arc<dyn LlmProvider>,
        config: &LlmConfig,
        plan_days: u8,
    ) -> Self {
        Self {
            provider,
            message_provider,
            tools: vec![Arc::new(NutritionTool::new(NutritionConfig::global().clone()))],
            call_timeout: Duration::from_secs(config.agent_timeout_secs),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            structured_output: config.structured_output,
            plan_days,
        }
    }

    /// Runner with providers built from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when a selected provider has no API key.
    pub fn from_config(config: &ServerConfig) -> AppResult<Self> {
        let llm = &config.llm;
        let provider = ChatProvider::from_type(llm.provider, llm.model.as_deref())?;
        let message_provider =
            match ChatProvider::from_type(llm.message_provider, llm.message_model.as_deref()) {
                Ok(provider) => provider,
                Err(e) if e.code == ErrorCode::ConfigMissing => {
                    warn!(
                        error = %e,
                        "Message provider unavailable, using the pipeline provider for reminders"
                    );
                    ChatProvider::from_type(llm.provider, llm.model.as_deref())?
                }
                Err(e) => return Err(e),
            };

        info!(
            pipeline_provider = %llm.provider,
            message_provider = %llm.message_provider,
            structured_output = llm.structured_output,
            "Agent runner initialized"
        );

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(message_provider),
            llm,
            config.pipeline.plan_days,
        ))
    }

    /// Register an additional tool
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    /// Days requested from the meal planner
    #[must_use]
    pub const fn plan_days(&self) -> u8 {
        self.plan_days
    }

    /// Provider an agent runs on
    #[must_use]
    pub fn provider_for(&self, kind: AgentKind) -> &dyn LlmProvider {
        if kind.uses_message_provider() {
            self.message_provider.as_ref()
        } else {
            self.provider.as_ref()
        }
    }

    /// Invoke an agent and return its raw text
    ///
    /// Each attempt is bounded by the configured timeout; retryable failures
    /// are retried with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns the last external error, or `ExternalTimeout`.
    #[instrument(skip(self, payload), fields(agent = %kind))]
    pub async fn invoke(&self, kind: AgentKind, payload: &Value) -> AppResult<String> {
        let provider = self.provider_for(kind);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        let result = loop {
            let outcome = match timeout(self.call_timeout, self.invoke_once(kind, payload)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::external_timeout(
                    kind.display_name(),
                    self.call_timeout.as_secs(),
                )),
            };

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.retry_backoff.saturating_mul(2_u32.saturating_pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retryable agent failure, backing off"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                other => break other,
            }
        };

        PipelineLogger::log_agent_call(
            kind.display_name(),
            provider.name(),
            provider.default_model(),
            started.elapsed().as_millis() as u64,
            result.is_ok(),
        );
        result
    }

    /// Invoke an agent and extract the JSON object from its answer
    ///
    /// # Errors
    ///
    /// Returns `AgentOutputUnparseable` when no object can be recovered, or
    /// any error from [`Self::invoke`].
    pub async fn invoke_json(&self, kind: AgentKind, payload: &Value) -> AppResult<Value> {
        let text = self.invoke(kind, payload).await?;
        extract_json_value(&text).map_err(|e| {
            let preview: String = text.chars().take(RAW_OUTPUT_PREVIEW_CHARS).collect();
            warn!(agent = %kind, error = %e, preview = %preview, "Agent output not parseable");
            AppError::parse_failure(kind.display_name(), e.to_string())
                .with_details(json!({ "preview": preview }))
        })
    }

    /// Invoke a free-text agent and return its trimmed answer
    ///
    /// # Errors
    ///
    /// Returns `AgentOutputUnparseable` for a blank answer, or any error from
    /// [`Self::invoke`].
    pub async fn invoke_text(&self, kind: AgentKind, payload: &Value) -> AppResult<String> {
        let text = self.invoke(kind, payload).await?;
        let trimmed = text.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return Err(AppError::parse_failure(
                kind.display_name(),
                "agent returned an empty response",
            ));
        }
        Ok(trimmed.to_owned())
    }

    /// One attempt: optional tool rounds, then the answering call
    async fn invoke_once(&self, kind: AgentKind, payload: &Value) -> AppResult<String> {
        let spec = kind.spec();
        let provider = self.provider_for(kind);
        let capabilities = provider.capabilities();

        let mut messages = vec![
            ChatMessage::system(kind.render_instructions(self.plan_days)),
            ChatMessage::user(serde_json::to_string_pretty(payload)?),
        ];
        let json_mode =
            spec.structured_output && self.structured_output && capabilities.supports_json_mode();

        let tool = spec
            .tool
            .filter(|_| capabilities.supports_function_calling())
            .and_then(|name| self.tools.iter().find(|t| t.name() == name));

        if let Some(tool) = tool {
            let tools = vec![Tool {
                function_declarations: vec![tool.declaration()],
            }];

            for round in 0..MAX_TOOL_ITERATIONS {
                let request =
                    ChatRequest::new(messages.clone()).with_temperature(spec.temperature);
                let response = provider
                    .complete_with_tools(&request, Some(tools.clone()))
                    .await?;

                let calls = match response.function_calls {
                    Some(calls) if !calls.is_empty() => calls,
                    _ => return Ok(response.content.unwrap_or_default()),
                };

                debug!(round, count = calls.len(), "Executing tool calls");
                if let Some(text) = response.content.filter(|t| !t.is_empty()) {
                    messages.push(ChatMessage::assistant(text));
                }

                let all_succeeded = self.execute_calls(&calls, &mut messages);
                if all_succeeded {
                    break;
                }
            }
        }

        let mut request = ChatRequest::new(messages).with_temperature(spec.temperature);
        if json_mode {
            request = request.with_json_mode();
        }
        Ok(provider.complete(&request).await?.content)
    }

    /// Run each call locally and append its result; false if any call failed
    fn execute_calls(&self, calls: &[FunctionCall], messages: &mut Vec<ChatMessage>) -> bool {
        let mut all_succeeded = true;
        for call in calls {
            let result = self
                .tools
                .iter()
                .find(|t| t.name() == call.name)
                .map_or_else(
                    || Err(AppError::invalid_input(format!("Unknown tool: {}", call.name))),
                    |tool| tool.execute(&call.args),
                );

            let response = match result {
                Ok(value) => value,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    all_succeeded = false;
                    json!({ "error": e.message })
                }
            };
            messages.push(ChatMessage::user(format!(
                "[Tool Result for {}]: {}",
                call.name, response
            )));
        }
        all_succeeded
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("provider", &self.provider.name())
            .field("message_provider", &self.message_provider.name())
            .field("call_timeout", &self.call_timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}
