// ABOUTME: Domain models for profiles, nutrition reports, meal plans and shopping lists
// ABOUTME: Re-exported from nourish-core so server code and tests share one definition
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use nourish_core::models::*;
