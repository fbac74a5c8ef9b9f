// ABOUTME: Centralized resource container shared by the HTTP routes, scheduler and CLI
// ABOUTME: Builds the database-backed pipeline context and the notification dispatcher once
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Server Resources Module
//!
//! Centralized resource container for dependency injection. Every expensive
//! collaborator is created once and shared through `Arc`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::AgentRunner;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::external::{
    GeminiImageGenerator, ImageGenerator, ImageHost, LogOnlySender, MessageSender,
    SelfHostedImages, TwilioWhatsAppSender, UnavailableImageGenerator,
};
use crate::notifications::{NotificationDispatcher, NotificationSchedule};
use crate::pipeline::{PipelineContext, PipelineRunner};

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Document store
    pub database: Arc<Database>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Agent invocation wrapper
    pub agents: Arc<AgentRunner>,
    /// Stage runner over the shared context
    pub pipeline: Arc<PipelineRunner>,
    /// Reminder dispatcher
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl ServerResources {
    /// Wire explicit collaborators together
    #[must_use]
    pub fn new(
        database: Database,
        config: Arc<ServerConfig>,
        agents: AgentRunner,
        image_generator: Arc<dyn ImageGenerator>,
        image_host: Arc<dyn ImageHost>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        let database = Arc::new(database);
        let agents = Arc::new(agents);

        let context = PipelineContext {
            database: database.clone(),
            agents: agents.clone(),
            image_generator,
            image_host,
            config: config.clone(),
        };
        let pipeline = Arc::new(PipelineRunner::new(context));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            database.clone(),
            agents.clone(),
            sender,
            config.messaging.default_country_code.clone(),
            config.schedule.times.len(),
            config.schedule.fixed_offset(),
        ));

        Self {
            database,
            config,
            agents,
            pipeline,
            dispatcher,
        }
    }

    /// Build every collaborator from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when the pipeline provider has no API key.
    pub fn from_config(database: Database, config: Arc<ServerConfig>) -> AppResult<Self> {
        let agents = AgentRunner::from_config(&config)?;

        let image_generator: Arc<dyn ImageGenerator> = if config.images.enabled {
            match GeminiImageGenerator::from_env(config.images.model.clone()) {
                Ok(generator) => Arc::new(generator),
                Err(e) => {
                    warn!(error = %e, "Image generation unavailable");
                    Arc::new(UnavailableImageGenerator::new(e.message))
                }
            }
        } else {
            Arc::new(UnavailableImageGenerator::new("image generation disabled"))
        };
        let image_host: Arc<dyn ImageHost> =
            Arc::new(SelfHostedImages::new(config.images.public_base_url.clone()));

        let sender: Arc<dyn MessageSender> = match &config.messaging.twilio {
            Some(twilio) => Arc::new(TwilioWhatsAppSender::new(twilio.clone())),
            None => Arc::new(LogOnlySender),
        };
        info!(sender = sender.name(), "Message sender selected");

        Ok(Self::new(
            database,
            config,
            agents,
            image_generator,
            image_host,
            sender,
        ))
    }

    /// The pipeline context stages run against
    #[must_use]
    pub fn pipeline_context(&self) -> &PipelineContext {
        self.pipeline.context()
    }

    /// Reminder schedule from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for an out-of-range UTC offset.
    pub fn notification_schedule(&self) -> AppResult<NotificationSchedule> {
        NotificationSchedule::from_config(&self.config.schedule)
    }
}

impl std::fmt::Debug for ServerResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerResources")
            .field("database", &self.database)
            .field("pipeline", &self.pipeline)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
