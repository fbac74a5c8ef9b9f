// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, scripted agents, fake image and message collaborators
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `nourish_server`
//!
//! Agents run against [`ScriptedLlmProvider`], which recognises the calling
//! agent from its system prompt and answers with a canned reply. Images and
//! messages go to in-memory fakes so tests can assert on what was produced.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use nourish_server::{
    agents::{AgentKind, AgentRunner},
    config::{LlmConfig, ServerConfig},
    database::Database,
    errors::{AppError, AppResult, ErrorCode},
    external::{
        DeliveryReceipt, GeneratedImage, ImageGenerator, MessageSender, OutboundMessage,
        SelfHostedImages,
    },
    llm::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider},
    models::{ProfileSubmission, UserProfile},
    resources::ServerResources,
};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Public base URL used for image links in tests
pub const TEST_BASE_URL: &str = "http://nourish.test";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::new("sqlite::memory:").await?)
}

// ============================================================================
// Fixtures
// ============================================================================

/// A valid profile submission
pub fn sample_submission(name: &str, phone: &str) -> ProfileSubmission {
    ProfileSubmission {
        name: name.to_owned(),
        phone: phone.to_owned(),
        age: 30,
        weight_kg: 70.0,
        height_cm: 175.0,
        gender: "Male".to_owned(),
        activity_level: "Moderately active".to_owned(),
        goal: "Weight loss".to_owned(),
        diet_type: "Vegetarian".to_owned(),
        allergies: vec!["peanuts".to_owned()],
        dislikes: vec!["okra".to_owned()],
        likes: vec!["paneer".to_owned()],
        cuisine: "Indian".to_owned(),
        budget_inr: Some(1500.0),
        meals_per_day: 3,
    }
}

/// Store a user and return the profile
pub async fn create_test_user(database: &Database, name: &str, phone: &str) -> UserProfile {
    database
        .upsert_user_by_phone(&sample_submission(name, phone))
        .await
        .expect("Failed to store test user")
}

/// Nutrition Analyst answer
pub fn nutrition_reply() -> Value {
    json!({
        "nutrition_summary": {"calories": 2100, "protein_g": 140, "carbs_g": 230, "fat_g": 58},
        "micronutrients": ["Vitamin B12", "Iron", "Omega-3", "Vitamin D"],
        "meal_targets": {"Breakfast": {"calories": 525}, "Lunch": {"calories": 840}, "Dinner": {"calories": 735}},
        "diet_constraints": {"diet": "vegetarian", "avoid": ["peanuts"]},
        "warnings": [],
        "human_summary": "A high-protein vegetarian plan for steady weight loss."
    })
}

fn dish(meal: &str, name: &str, calories: Value, protein: Value, highlights: &str) -> Value {
    json!({
        "meal_name": meal,
        "dish_name": name,
        "calories_percentage": calories,
        "protein_percentage": protein,
        "vitamin_mineral_highlights": highlights
    })
}

/// Meal Planner answer with two days of three meals
pub fn meal_plan_reply() -> Value {
    json!({
        "Day 1": {
            "Breakfast": dish("Breakfast", "Poha", json!(25), json!("20%"), "Iron, B vitamins"),
            "Lunch": dish("Lunch", "Rajma Chawal", json!(40), json!(40), "Fiber, Folate"),
            "Dinner": dish("Dinner", "Paneer Tikka", json!(35), json!(40), "Calcium"),
            "summary": "High protein day"
        },
        "Day 2": {
            "Breakfast": dish("Breakfast", "Idli Sambar", json!(25), json!(20), "Probiotics"),
            "Lunch": dish("Lunch", "Chole", json!(40), json!(40), "Iron"),
            "Dinner": dish("Dinner", "Dal Khichdi", json!(35), json!(40), "Magnesium"),
            "summary": "Light and balanced"
        }
    })
}

/// Recipe Generator answer
pub fn recipe_reply() -> Value {
    json!({
        "prep_time": "10 minutes",
        "cook_time": "20 minutes",
        "steps": {"step-1": "Rinse and soak.", "step-2": "Cook with spices.", "step-10": "Serve hot."}
    })
}

/// Shopping List Generator answer
pub fn shopping_reply() -> Value {
    json!({
        "Grains": ["Poha", "Rice"],
        "Vegetables": ["Onion", "Tomato"],
        "Dairy": ["Paneer"]
    })
}

/// Price Predictor answer
pub fn pricing_reply() -> Value {
    json!({
        "Grains": {"items": [{"name": "Poha", "price": 45}, {"name": "Rice", "price": 80}], "total_price": 125},
        "Vegetables": {"items": [{"name": "Onion", "price": 30}, {"name": "Tomato", "price": "₹40"}], "total_price": 70},
        "Dairy": {"items": [{"name": "Paneer", "price": 90}], "total_price": 90},
        "Grand_Total": 285
    })
}

/// Message Writer answer
pub const MESSAGE_REPLY: &str = "Start your day strong with a plate of fluffy Poha!";

// ============================================================================
// Scripted LLM provider
// ============================================================================

/// One scripted answer
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Model text
    Text(String),
    /// Provider failure
    Error(ErrorCode),
}

/// LLM provider answering each agent from a script
///
/// Queued replies are consumed first; afterwards the agent's default reply
/// is returned on every call.
pub struct ScriptedLlmProvider {
    plan_days: u8,
    defaults: Mutex<HashMap<AgentKind, String>>,
    queued: Mutex<HashMap<AgentKind, VecDeque<ScriptedReply>>>,
    calls: Mutex<Vec<(AgentKind, String)>>,
}

impl ScriptedLlmProvider {
    /// Provider with no replies
    pub fn empty(plan_days: u8) -> Self {
        Self {
            plan_days,
            defaults: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider answering every agent with well-formed output
    pub fn happy_path(plan_days: u8) -> Self {
        let provider = Self::empty(plan_days);
        provider.set_default(
            AgentKind::NutritionAnalyst,
            format!("Here is the report:\n```json\n{}\n```", nutrition_reply()),
        );
        provider.set_default(AgentKind::MealPlanner, meal_plan_reply().to_string());
        provider.set_default(AgentKind::RecipeGenerator, recipe_reply().to_string());
        provider.set_default(
            AgentKind::ShoppingListGenerator,
            format!("Sure! {}", shopping_reply()),
        );
        provider.set_default(AgentKind::PricePredictor, pricing_reply().to_string());
        provider.set_default(AgentKind::MessageWriter, format!("\"{MESSAGE_REPLY}\""));
        provider
    }

    /// Replace an agent's default reply
    pub fn set_default(&self, kind: AgentKind, text: impl Into<String>) {
        self.defaults.lock().unwrap().insert(kind, text.into());
    }

    /// Queue a one-off reply for an agent
    pub fn push(&self, kind: AgentKind, reply: ScriptedReply) {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
    }

    /// Number of calls an agent received
    pub fn call_count(&self, kind: AgentKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// User payloads sent to an agent, in call order
    pub fn payloads(&self, kind: AgentKind) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .filter_map(|(_, payload)| serde_json::from_str(payload).ok())
            .collect()
    }

    fn identify(&self, request: &ChatRequest) -> Option<AgentKind> {
        let system = request.messages.first()?;
        AgentKind::all()
            .into_iter()
            .find(|kind| kind.render_instructions(self.plan_days) == system.content)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn display_name(&self) -> &'static str {
        "Scripted Test Provider"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::text_only()
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    fn available_models(&self) -> &'static [&'static str] {
        &["scripted-1"]
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let kind = self
            .identify(request)
            .ok_or_else(|| AppError::internal("Unrecognised agent prompt"))?;
        let payload = request
            .messages
            .get(1)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().unwrap().push((kind, payload));

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        let text = match queued {
            Some(ScriptedReply::Text(text)) => text,
            Some(ScriptedReply::Error(code)) => {
                return Err(AppError::new(code, "scripted provider failure"))
            }
            None => self
                .defaults
                .lock()
                .unwrap()
                .get(&kind)
                .cloned()
                .ok_or_else(|| {
                    AppError::external_service("Scripted", format!("no reply for {kind}"))
                })?,
        };

        Ok(ChatResponse {
            content: text,
            model: "scripted-1".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

// ============================================================================
// Image and message fakes
// ============================================================================

/// Image generator returning a tiny PNG, failing for dish names containing "burnt"
#[derive(Default)]
pub struct FakeImageGenerator {
    generated: Mutex<Vec<String>>,
}

impl FakeImageGenerator {
    /// Dishes an image was requested for
    pub fn requested(&self) -> Vec<String> {
        self.generated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, dish_name: &str) -> AppResult<GeneratedImage> {
        self.generated.lock().unwrap().push(dish_name.to_owned());
        if dish_name.to_lowercase().contains("burnt") {
            return Err(AppError::external_service("Fake Images", "kitchen on fire"));
        }
        Ok(GeneratedImage {
            bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A],
            content_type: "image/png".to_owned(),
        })
    }
}

/// Message sender that records every outbound message
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<OutboundMessage>>,
    fail_for: Mutex<Option<String>>,
}

impl RecordingSender {
    /// Messages sent so far
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Reject messages to this number
    pub fn fail_for(&self, to: &str) {
        *self.fail_for.lock().unwrap() = Some(to.to_owned());
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &OutboundMessage) -> AppResult<DeliveryReceipt> {
        if self.fail_for.lock().unwrap().as_deref() == Some(message.to.as_str()) {
            return Err(AppError::external_service("Recording", "number unreachable"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(DeliveryReceipt {
            sid: format!("SM{:04}", sent.len()),
            status: "queued".to_owned(),
        })
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Everything a test needs to drive the server
pub struct TestHarness {
    /// Shared resources, as the server builds them
    pub resources: Arc<ServerResources>,
    /// Scripted agents
    pub llm: Arc<ScriptedLlmProvider>,
    /// Fake image generator
    pub images: Arc<FakeImageGenerator>,
    /// Recording message sender
    pub sender: Arc<RecordingSender>,
}

/// Test configuration with deterministic links and schedule
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.images.public_base_url = TEST_BASE_URL.to_owned();
    config.llm = LlmConfig {
        agent_timeout_secs: 5,
        retry_backoff_ms: 1,
        ..LlmConfig::default()
    };
    config
}

/// Build a harness from a configuration and provider
pub async fn harness_with(config: ServerConfig, llm: ScriptedLlmProvider) -> TestHarness {
    let database = create_test_database().await.expect("database");
    let llm = Arc::new(llm);
    let images = Arc::new(FakeImageGenerator::default());
    let sender = Arc::new(RecordingSender::default());

    let agents = AgentRunner::new(
        llm.clone(),
        llm.clone(),
        &config.llm,
        config.pipeline.plan_days,
    );
    let resources = Arc::new(ServerResources::new(
        database,
        Arc::new(config.clone()),
        agents,
        images.clone(),
        Arc::new(SelfHostedImages::new(config.images.public_base_url)),
        sender.clone(),
    ));

    TestHarness {
        resources,
        llm,
        images,
        sender,
    }
}

/// Harness where every agent answers correctly
pub async fn happy_harness() -> TestHarness {
    let config = test_config();
    let llm = ScriptedLlmProvider::happy_path(config.pipeline.plan_days);
    harness_with(config, llm).await
}
