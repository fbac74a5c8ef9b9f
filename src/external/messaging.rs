// ABOUTME: Outbound message delivery over Twilio WhatsApp, with a log-only dry-run sender
// ABOUTME: Senders take already-normalized E.164 numbers

// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::TwilioConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::map_http_status;

const TWILIO_API_BASE_URL: &str = "https://api.twilio.com/2010-04-01";
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// A message to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Recipient in E.164 form
    pub to: String,
    /// Message text
    pub body: String,
    /// Optional media attachment URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

/// Provider acknowledgement of a delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Provider message id
    pub sid: String,
    /// Provider status at acceptance time
    pub status: String,
}

/// Delivers messages to users
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sender name for logs
    fn name(&self) -> &'static str;

    /// Deliver one message
    async fn send(&self, message: &OutboundMessage) -> AppResult<DeliveryReceipt>;
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    message: String,
}

/// Twilio Messages API over the `WhatsApp` channel
pub struct TwilioWhatsAppSender {
    config: TwilioConfig,
    client: Client,
    base_url: String,
}

impl TwilioWhatsAppSender {
    /// Sender for the given account
    #[must_use]
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            base_url: TWILIO_API_BASE_URL.to_owned(),
        }
    }

    /// Point the sender at another API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }

    fn form_body(&self, message: &OutboundMessage) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("From", &whatsapp_address(&self.config.from_number))
            .append_pair("To", &whatsapp_address(&message.to))
            .append_pair("Body", &message.body);
        if let Some(media) = &message.media_url {
            form.append_pair("MediaUrl", media);
        }
        form.finish()
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_owned()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

#[async_trait]
impl MessageSender for TwilioWhatsAppSender {
    fn name(&self) -> &'static str {
        "twilio_whatsapp"
    }

    async fn send(&self, message: &OutboundMessage) -> AppResult<DeliveryReceipt> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.form_body(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = %status, "Twilio API error");
            let detail = serde_json::from_str::<TwilioErrorResponse>(&body)
                .map_or(body, |e| e.message);
            return Err(map_http_status("Twilio", status, &detail));
        }

        let parsed: TwilioMessageResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::external_service("Twilio", format!("Failed to parse response: {e}"))
        })?;
        Ok(DeliveryReceipt {
            sid: parsed.sid,
            status: parsed.status.unwrap_or_else(|| "queued".to_owned()),
        })
    }
}

impl Debug for TwilioWhatsAppSender {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TwilioWhatsAppSender")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Dry-run sender that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlySender;

#[async_trait]
impl MessageSender for LogOnlySender {
    fn name(&self) -> &'static str {
        "log_only"
    }

    async fn send(&self, message: &OutboundMessage) -> AppResult<DeliveryReceipt> {
        info!(
            to = %message.to,
            media = message.media_url.as_deref().unwrap_or("-"),
            body = %message.body,
            "Dry-run message"
        );
        Ok(DeliveryReceipt {
            sid: format!("dry-run-{}", Uuid::new_v4()),
            status: "logged".to_owned(),
        })
    }
}
