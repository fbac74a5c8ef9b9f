// ABOUTME: Errors raised while recovering a JSON object from free-form model output
// ABOUTME: Converts into AppError with the AGENT_OUTPUT_UNPARSEABLE code
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Why a model response could not be turned into a JSON object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Response was empty or whitespace only
    #[error("agent returned an empty response")]
    Empty,
    /// No `{ ... }` span present in the response
    #[error("no JSON object found in agent response")]
    NoJsonObject,
    /// A candidate span was found but did not parse
    #[error("invalid JSON in agent response: {0}")]
    InvalidJson(String),
    /// Response parsed as JSON, but the top-level value is not an object
    #[error("agent response is JSON but not an object (found {0})")]
    NotAnObject(&'static str),
}

impl From<ExtractionError> for AppError {
    fn from(error: ExtractionError) -> Self {
        Self::new(ErrorCode::AgentOutputUnparseable, error.to_string())
    }
}
