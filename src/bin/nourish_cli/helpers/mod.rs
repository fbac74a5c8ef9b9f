// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Helper modules for nourish-cli
// ABOUTME: Output formatting shared by the commands

pub mod display;
