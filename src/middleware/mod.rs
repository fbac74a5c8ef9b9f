// ABOUTME: HTTP middleware for request tracing and cross-origin access
// ABOUTME: Provides the per-request span layer and CORS configuration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod cors;
pub mod tracing;

// CORS configuration
pub use cors::setup_cors;

// Request tracing
pub use self::tracing::http_trace_layer;
