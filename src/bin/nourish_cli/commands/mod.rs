// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Re-exports command modules for nourish-cli
// ABOUTME: Provides pipeline, pricing, reminder, calculator and user commands

pub mod calc;
pub mod notify;
pub mod pipeline;
pub mod users;
