// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Reminder command sending meal notifications immediately
// ABOUTME: Uses the same dispatcher the scheduler fires

use nourish_server::{
    errors::AppResult, notifications::DispatchTrigger, resources::ServerResources,
};

use crate::helpers::display::print_json;

/// Dispatch reminders for every meal plan
pub async fn send(
    resources: &ServerResources,
    slot_index: Option<usize>,
    day: Option<String>,
) -> AppResult<()> {
    let trigger = DispatchTrigger {
        slot_index,
        day_label: day,
    };
    let report = resources.dispatcher.dispatch(&trigger).await?;
    print_json(&report)
}
