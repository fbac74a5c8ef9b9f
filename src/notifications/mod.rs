// ABOUTME: Meal reminder notifications: phone normalization, dispatch and daily scheduling
// ABOUTME: Messages go out through a MessageSender; the scheduler fires dispatches at configured times
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Reminder selection, composition and delivery
pub mod dispatcher;
/// E.164 phone normalization
pub mod phone;
/// Daily schedule and background task
pub mod scheduler;

pub use dispatcher::{
    display_slot_name, format_meal_message, rotation_day, select_slot_range, DeliveryFailure,
    DispatchReport, DispatchTrigger, NotificationDispatcher,
};
pub use phone::normalize_phone;
pub use scheduler::{NotificationSchedule, NotificationScheduler, SchedulerHandle};
