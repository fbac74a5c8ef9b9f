// ABOUTME: Application constants organized by domain
// ABOUTME: Re-exported from nourish-core for use across the server crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use nourish_core::constants::*;
