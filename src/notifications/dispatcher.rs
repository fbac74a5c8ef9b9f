// ABOUTME: Meal reminder dispatch: selects today's dishes per user and sends a composed message
// ABOUTME: Every (user, slot) delivery is recorded; one failure never stops the batch
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::phone::normalize_phone;
use crate::agents::{AgentKind, AgentRunner};
use crate::constants::notifications::FALLBACK_NAME;
use crate::constants::plan_keys::{DISH_NAME, HIGHLIGHTS, IMAGE_REF, MEAL_NAME};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::external::{MessageSender, OutboundMessage};
use crate::logging::PipelineLogger;
use crate::models::{ImageRef, MealPlan, UserProfile};

/// Compose the reminder text
#[must_use]
pub fn format_meal_message(name: &str, meal: &str, dish: &str, promo: &str) -> String {
    format!("Hey {name}! 👋\n\nYour *{meal}* is ready: *{dish}*.\n\n_{promo}_")
}

/// Friendly name for a meal slot key
#[must_use]
pub fn display_slot_name(slot: &str) -> &str {
    match slot.trim() {
        "Meal 1" => "Breakfast",
        "Meal 2" => "Lunch",
        "Meal 3" => "Dinner",
        other => other,
    }
}

/// Which day and which slots a dispatch covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTrigger {
    /// Schedule position; `None` sends every slot of the day
    #[serde(default)]
    pub slot_index: Option<usize>,
    /// Explicit day label; `None` uses the rotation day
    #[serde(default, alias = "day")]
    pub day_label: Option<String>,
}

impl DispatchTrigger {
    /// Every slot of the rotation day
    #[must_use]
    pub const fn all_slots() -> Self {
        Self {
            slot_index: None,
            day_label: None,
        }
    }

    /// One scheduled slot of the rotation day
    #[must_use]
    pub const fn scheduled(slot_index: usize) -> Self {
        Self {
            slot_index: Some(slot_index),
            day_label: None,
        }
    }
}

/// A delivery that did not happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Recipient user
    pub user_id: Uuid,
    /// Meal slot, empty when the user failed before slot selection
    pub slot: String,
    /// Error message
    pub error: String,
}

/// Outcome of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Messages accepted by the sender
    pub sent: usize,
    /// Deliveries that failed
    pub failed: Vec<DeliveryFailure>,
}

impl DispatchReport {
    fn fail(&mut self, user_id: Uuid, slot: &str, error: &AppError) {
        PipelineLogger::log_delivery(&user_id.to_string(), slot, false, &error.message);
        self.failed.push(DeliveryFailure {
            user_id,
            slot: slot.to_owned(),
            error: error.message.clone(),
        });
    }

    fn merge(&mut self, other: Self) {
        self.sent += other.sent;
        self.failed.extend(other.failed);
    }
}

/// Day of the plan to send on `now`: local days since generation, wrapped
///
/// Both dates are taken on the schedule's calendar so every reminder fired
/// on one local day reads the same plan day.
#[must_use]
pub fn rotation_day(plan: &MealPlan, now: DateTime<Utc>, offset: FixedOffset) -> Option<String> {
    let labels = plan.day_labels();
    if labels.is_empty() {
        return None;
    }
    let today = now.with_timezone(&offset).date_naive();
    let generated_on = plan.generated_at.with_timezone(&offset).date_naive();
    let elapsed = (today - generated_on)
        .num_days()
        .max(0);
    let index = usize::try_from(elapsed).unwrap_or(0) % labels.len();
    labels.into_iter().nth(index)
}

/// Slot positions covered by a trigger
///
/// With a slot index, the last trigger of the day also covers any slots
/// beyond the number of triggers.
#[must_use]
pub fn select_slot_range(
    meal_count: usize,
    slot_index: Option<usize>,
    trigger_count: usize,
) -> Range<usize> {
    let Some(index) = slot_index else {
        return 0..meal_count;
    };
    if index >= meal_count {
        return 0..0;
    }
    if trigger_count > 0 && index + 1 == trigger_count {
        index..meal_count
    } else {
        index..index + 1
    }
}

fn fallback_promo(highlights: &str) -> String {
    let highlights = highlights.trim();
    if highlights.is_empty() {
        "Freshly planned just for you. Enjoy every bite!".to_owned()
    } else {
        format!("Packed with {highlights}. Enjoy every bite!")
    }
}

fn entry_text<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Sends meal reminders for stored plans
pub struct NotificationDispatcher {
    database: Arc<Database>,
    agents: Arc<AgentRunner>,
    sender: Arc<dyn MessageSender>,
    default_country_code: String,
    trigger_count: usize,
    utc_offset: FixedOffset,
}

impl NotificationDispatcher {
    /// Dispatcher over the given collaborators
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        agents: Arc<AgentRunner>,
        sender: Arc<dyn MessageSender>,
        default_country_code: impl Into<String>,
        trigger_count: usize,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            database,
            agents,
            sender,
            default_country_code: default_country_code.into(),
            trigger_count,
            utc_offset,
        }
    }

    /// Number of daily triggers the slots are spread over
    #[must_use]
    pub const fn trigger_count(&self) -> usize {
        self.trigger_count
    }

    /// Send reminders to every user with a meal plan
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` only when the plans cannot be listed.
    #[instrument(skip(self), fields(sender = self.sender.name()))]
    pub async fn dispatch(&self, trigger: &DispatchTrigger) -> AppResult<DispatchReport> {
        let plans = self.database.list_meal_plans().await?;
        let now = Utc::now();
        let mut report = DispatchReport::default();

        for plan in &plans {
            match self.database.get_user(plan.user_id).await {
                Ok(Some(user)) => report.merge(self.dispatch_plan(&user, plan, trigger, now).await),
                Ok(None) => {
                    report.fail(plan.user_id, "", &AppError::not_found(format!("User {}", plan.user_id)));
                }
                Err(e) => report.fail(plan.user_id, "", &e),
            }
        }

        info!(
            plans = plans.len(),
            sent = report.sent,
            failed = report.failed.len(),
            "Notification dispatch finished"
        );
        Ok(report)
    }

    /// Send reminders to one user
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user or their plan is missing.
    pub async fn dispatch_for_user(
        &self,
        user_id: Uuid,
        trigger: &DispatchTrigger,
    ) -> AppResult<DispatchReport> {
        let user = self
            .database
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
        let plan = self
            .database
            .get_meal_plan_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Meal plan for user {user_id}")))?;
        Ok(self.dispatch_plan(&user, &plan, trigger, Utc::now()).await)
    }

    async fn dispatch_plan(
        &self,
        user: &UserProfile,
        plan: &MealPlan,
        trigger: &DispatchTrigger,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let to = match normalize_phone(&user.phone, &self.default_country_code) {
            Ok(phone) => phone,
            Err(e) => {
                report.fail(user.id, "", &e);
                return report;
            }
        };

        let day = match &trigger.day_label {
            Some(label) if plan.days.contains_key(label) => label.clone(),
            Some(label) => {
                report.fail(user.id, "", &AppError::not_found(format!("Day '{label}' in meal plan")));
                return report;
            }
            None => match rotation_day(plan, now, self.utc_offset) {
                Some(day) => day,
                None => {
                    report.fail(user.id, "", &AppError::not_found("Any day in meal plan"));
                    return report;
                }
            },
        };

        let meals = plan.meals_for_day(&day);
        let range = select_slot_range(meals.len(), trigger.slot_index, self.trigger_count);
        let name = Some(user.name.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME);

        for (slot, entry) in meals.get(range).unwrap_or_default() {
            match self.deliver(name, &to, slot, entry).await {
                Ok(sid) => {
                    PipelineLogger::log_delivery(&user.id.to_string(), slot, true, &sid);
                    report.sent += 1;
                }
                Err(e) => report.fail(user.id, slot, &e),
            }
        }
        report
    }

    async fn deliver(
        &self,
        name: &str,
        to: &str,
        slot: &str,
        entry: &Map<String, Value>,
    ) -> AppResult<String> {
        let dish = entry_text(entry, DISH_NAME)
            .ok_or_else(|| AppError::missing_field(DISH_NAME))?;
        let meal = entry_text(entry, MEAL_NAME).unwrap_or_else(|| display_slot_name(slot));
        let highlights = entry_text(entry, HIGHLIGHTS).unwrap_or_default();

        let payload = json!({
            "user_name": name,
            "meal_name": meal,
            "dish_name": dish,
            "highlights": highlights,
        });
        let promo = match self.agents.invoke_text(AgentKind::MessageWriter, &payload).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, dish = %dish, "Message writer failed, using template");
                fallback_promo(highlights)
            }
        };

        let media_url = entry
            .get(IMAGE_REF)
            .and_then(|v| serde_json::from_value::<ImageRef>(v.clone()).ok())
            .and_then(|image| image.url);

        let receipt = self
            .sender
            .send(&OutboundMessage {
                to: to.to_owned(),
                body: format_meal_message(name, meal, dish, &promo),
                media_url,
            })
            .await?;
        Ok(receipt.sid)
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("sender", &self.sender.name())
            .field("default_country_code", &self.default_country_code)
            .field("trigger_count", &self.trigger_count)
            .field("utc_offset", &self.utc_offset)
            .finish_non_exhaustive()
    }
}
