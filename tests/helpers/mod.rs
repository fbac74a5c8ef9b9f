// ABOUTME: Test helper modules shared by integration tests
// ABOUTME: Re-exports the in-process Axum request driver
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(dead_code)]

pub mod axum_test;
