// ABOUTME: Unified LLM provider selector for runtime provider switching
// ABOUTME: Abstracts over Gemini and Groq providers based on environment configuration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # LLM Provider Selector
//!
//! Builds the configured provider at runtime. The pipeline agents and the
//! message writer are configured separately (`NOURISH_LLM_PROVIDER` and
//! `NOURISH_MESSAGE_LLM_PROVIDER`), so two selectors usually exist side by
//! side.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nourish_server::config::LlmProviderType;
//! use nourish_server::llm::{ChatMessage, ChatRequest, ChatProvider, LlmProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nourish_server::errors::AppError> {
//!     let provider = ChatProvider::from_type(LlmProviderType::Gemini, None)?;
//!     let request = ChatRequest::new(vec![ChatMessage::user("Hello!")]);
//!     let response = provider.complete(&request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use tracing::debug;

use super::{
    ChatRequest, ChatResponse, ChatResponseWithTools, GeminiProvider, GroqProvider,
    LlmCapabilities, LlmProvider, Tool,
};
use crate::config::LlmProviderType;
use crate::errors::AppError;

/// Unified chat provider that wraps Gemini or Groq
pub enum ChatProvider {
    /// Google Gemini provider with full tool calling support
    Gemini(GeminiProvider),
    /// Groq provider for fast, cost-effective inference
    Groq(GroqProvider),
}

impl ChatProvider {
    /// Create a provider for a specific type, reading its API key from the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if the provider's API key variable is not set.
    pub fn from_type(
        provider_type: LlmProviderType,
        model: Option<&str>,
    ) -> Result<Self, AppError> {
        let provider = match provider_type {
            LlmProviderType::Gemini => {
                let mut provider = GeminiProvider::from_env()?;
                if let Some(model) = model {
                    provider = provider.with_default_model(model);
                }
                Self::Gemini(provider)
            }
            LlmProviderType::Groq => {
                let mut provider = GroqProvider::from_env()?;
                if let Some(model) = model {
                    provider = provider.with_default_model(model);
                }
                Self::Groq(provider)
            }
        };

        debug!(
            "Provider {} initialized with model: {}",
            provider.display_name(),
            provider.default_model()
        );
        Ok(provider)
    }

    /// Get the provider type
    #[must_use]
    pub const fn provider_type(&self) -> LlmProviderType {
        match self {
            Self::Gemini(_) => LlmProviderType::Gemini,
            Self::Groq(_) => LlmProviderType::Groq,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Self::Gemini(p) => p,
            Self::Groq(p) => p,
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn display_name(&self) -> &'static str {
        self.inner().display_name()
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.inner().capabilities()
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    fn available_models(&self) -> &'static [&'static str] {
        self.inner().available_models()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.inner().complete(request).await
    }

    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponseWithTools, AppError> {
        self.inner().complete_with_tools(request, tools).await
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.inner().health_check().await
    }
}

impl std::fmt::Debug for ChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini(p) => f.debug_tuple("Gemini").field(p).finish(),
            Self::Groq(p) => f.debug_tuple("Groq").field(p).finish(),
        }
    }
}
