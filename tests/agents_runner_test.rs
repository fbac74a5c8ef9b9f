// ABOUTME: Tests for agent invocation: retries, output extraction and the tool loop
// ABOUTME: Uses scripted providers so no network access is required
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{test_config, ScriptedLlmProvider, ScriptedReply, MESSAGE_REPLY};
use nourish_server::agents::{AgentKind, AgentRunner};
use nourish_server::config::LlmConfig;
use nourish_server::errors::{AppError, ErrorCode};
use nourish_server::llm::{
    ChatRequest, ChatResponse, ChatResponseWithTools, FunctionCall, LlmCapabilities, LlmProvider,
    Tool,
};
use serde_json::{json, Value};

fn runner_with(llm: &Arc<ScriptedLlmProvider>, max_retries: u32) -> AgentRunner {
    let config = LlmConfig {
        max_retries,
        ..test_config().llm
    };
    AgentRunner::new(llm.clone(), llm.clone(), &config, 2)
}

#[tokio::test]
async fn test_json_is_recovered_from_prose() {
    let llm = Arc::new(ScriptedLlmProvider::happy_path(2));
    let runner = runner_with(&llm, 0);

    let report = runner
        .invoke_json(AgentKind::NutritionAnalyst, &json!({"user": {"name": "Asha"}}))
        .await
        .unwrap();
    assert_eq!(report["nutrition_summary"]["calories"], 2100);

    let payload = &llm.payloads(AgentKind::NutritionAnalyst)[0];
    assert_eq!(payload["user"]["name"], "Asha");
}

#[tokio::test]
async fn test_text_answer_is_unquoted() {
    let llm = Arc::new(ScriptedLlmProvider::happy_path(2));
    let runner = runner_with(&llm, 0);

    let text = runner
        .invoke_text(AgentKind::MessageWriter, &json!({"dish_name": "Poha"}))
        .await
        .unwrap();
    assert_eq!(text, MESSAGE_REPLY);

    llm.set_default(AgentKind::MessageWriter, "  \"\"  ");
    let err = runner
        .invoke_text(AgentKind::MessageWriter, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AgentOutputUnparseable);
}

#[tokio::test]
async fn test_unparseable_output_carries_preview() {
    let llm = Arc::new(ScriptedLlmProvider::empty(2));
    llm.set_default(AgentKind::MealPlanner, "I could not come up with a plan today.");
    let runner = runner_with(&llm, 3);

    let err = runner
        .invoke_json(AgentKind::MealPlanner, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AgentOutputUnparseable);
    assert!(err.message.starts_with("Meal Planner"));
    assert_eq!(llm.call_count(AgentKind::MealPlanner), 1);
}

#[tokio::test]
async fn test_retryable_errors_are_retried() {
    let llm = Arc::new(ScriptedLlmProvider::happy_path(2));
    llm.push(
        AgentKind::PricePredictor,
        ScriptedReply::Error(ErrorCode::ExternalRateLimited),
    );
    llm.push(
        AgentKind::PricePredictor,
        ScriptedReply::Error(ErrorCode::ExternalServiceUnavailable),
    );
    let runner = runner_with(&llm, 2);

    let pricing = runner
        .invoke_json(AgentKind::PricePredictor, &json!({}))
        .await
        .unwrap();
    assert_eq!(pricing["Grand_Total"], 285);
    assert_eq!(llm.call_count(AgentKind::PricePredictor), 3);
}

#[tokio::test]
async fn test_retries_stop_at_limit_and_skip_permanent_errors() {
    let llm = Arc::new(ScriptedLlmProvider::happy_path(2));
    for _ in 0..3 {
        llm.push(
            AgentKind::RecipeGenerator,
            ScriptedReply::Error(ErrorCode::ExternalTimeout),
        );
    }
    let runner = runner_with(&llm, 1);

    let err = runner
        .invoke_json(AgentKind::RecipeGenerator, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalTimeout);
    assert_eq!(llm.call_count(AgentKind::RecipeGenerator), 2);

    llm.push(
        AgentKind::MealPlanner,
        ScriptedReply::Error(ErrorCode::ExternalAuthFailed),
    );
    let err = runner
        .invoke_json(AgentKind::MealPlanner, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert_eq!(llm.call_count(AgentKind::MealPlanner), 1);
}

#[tokio::test]
async fn test_message_writer_uses_message_provider() {
    let pipeline = Arc::new(ScriptedLlmProvider::empty(2));
    let messages = Arc::new(ScriptedLlmProvider::happy_path(2));
    let runner = AgentRunner::new(pipeline.clone(), messages.clone(), &test_config().llm, 2);

    runner
        .invoke_text(AgentKind::MessageWriter, &json!({}))
        .await
        .unwrap();
    assert_eq!(messages.call_count(AgentKind::MessageWriter), 1);
    assert_eq!(pipeline.call_count(AgentKind::MessageWriter), 0);
    assert_eq!(runner.provider_for(AgentKind::MealPlanner).name(), "scripted");
}

/// Provider that asks for the nutrition tool once, then answers with what it saw
#[derive(Default)]
struct ToolCallingProvider {
    bad_arguments: bool,
    tool_rounds: Mutex<usize>,
    final_requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl LlmProvider for ToolCallingProvider {
    fn name(&self) -> &'static str {
        "tool-calling"
    }

    fn display_name(&self) -> &'static str {
        "Tool Calling Test Provider"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        "tools-1"
    }

    fn available_models(&self) -> &'static [&'static str] {
        &["tools-1"]
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.final_requests.lock().unwrap().push(request.clone());
        let tool_result = request
            .messages
            .iter()
            .rev()
            .find(|m| m.content.starts_with("[Tool Result for calculate_nutrition]"))
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse {
            content: json!({"saw_tool_result": tool_result}).to_string(),
            model: "tools-1".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn complete_with_tools(
        &self,
        _request: &ChatRequest,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponseWithTools, AppError> {
        let declared = tools
            .unwrap_or_default()
            .iter()
            .flat_map(|t| t.function_declarations.iter())
            .any(|d| d.name == "calculate_nutrition");
        assert!(declared);

        *self.tool_rounds.lock().unwrap() += 1;
        let args = if self.bad_arguments {
            json!({"age": "thirty"})
        } else {
            json!({
                "age": 30, "gender": "Male", "weight": 70, "height": 175,
                "activity": "Moderately active", "goal": "Weight loss"
            })
        };
        Ok(ChatResponseWithTools {
            content: None,
            function_calls: Some(vec![FunctionCall {
                name: "calculate_nutrition".to_owned(),
                args,
            }]),
            model: "tools-1".to_owned(),
            usage: None,
            finish_reason: None,
        })
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

#[tokio::test]
async fn test_tool_result_reaches_final_answer() {
    let provider = Arc::new(ToolCallingProvider::default());
    let runner = AgentRunner::new(provider.clone(), provider.clone(), &test_config().llm, 2);

    let answer: Value = runner
        .invoke_json(AgentKind::NutritionAnalyst, &json!({}))
        .await
        .unwrap();
    let seen = answer["saw_tool_result"].as_str().unwrap();
    assert!(seen.contains("\"calories\":2172"));

    assert_eq!(*provider.tool_rounds.lock().unwrap(), 1);
    let finals = provider.final_requests.lock().unwrap();
    assert_eq!(finals.len(), 1);
    assert!(finals[0].json_mode);
}

#[tokio::test]
async fn test_failing_tool_calls_are_bounded() {
    let provider = Arc::new(ToolCallingProvider {
        bad_arguments: true,
        ..ToolCallingProvider::default()
    });
    let runner = AgentRunner::new(provider.clone(), provider.clone(), &test_config().llm, 2);

    let answer = runner
        .invoke_json(AgentKind::NutritionAnalyst, &json!({}))
        .await
        .unwrap();
    assert!(answer["saw_tool_result"]
        .as_str()
        .unwrap()
        .contains("error"));
    assert!(*provider.tool_rounds.lock().unwrap() > 1);
    assert_eq!(provider.final_requests.lock().unwrap().len(), 1);
}
