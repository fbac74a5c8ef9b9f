// ABOUTME: External collaborator clients for dish images and outbound messages
// ABOUTME: Trait seams let the pipeline and dispatcher run against mocks in tests

// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! External API Clients
//!
//! - **Images**: Gemini image generation and self-hosted image links
//! - **Messaging**: Twilio `WhatsApp` delivery and a log-only dry run

pub mod images;
pub mod messaging;

pub use images::{
    GeminiImageGenerator, GeneratedImage, ImageGenerator, ImageHost, SelfHostedImages,
    UnavailableImageGenerator,
};
pub use messaging::{
    DeliveryReceipt, LogOnlySender, MessageSender, OutboundMessage, TwilioWhatsAppSender,
};
