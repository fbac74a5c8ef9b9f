// ABOUTME: Daily reminder schedule and the background task that fires the dispatcher
// ABOUTME: Times are local to a fixed UTC offset; time i dispatches meal slot i
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::dispatcher::{DispatchTrigger, NotificationDispatcher};
use crate::config::ScheduleConfig;
use crate::errors::{AppError, AppResult, ErrorCode};

/// Daily reminder times at a fixed offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSchedule {
    times: Vec<NaiveTime>,
    offset: FixedOffset,
}

impl NotificationSchedule {
    /// Schedule from sorted local times
    #[must_use]
    pub fn new(mut times: Vec<NaiveTime>, offset: FixedOffset) -> Self {
        times.sort_unstable();
        times.dedup();
        Self { times, offset }
    }

    /// Schedule from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for an out-of-range UTC offset.
    pub fn from_config(config: &ScheduleConfig) -> AppResult<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigInvalid,
                format!("Invalid UTC offset: {} minutes", config.utc_offset_minutes),
            )
        })?;
        Ok(Self::new(config.times.clone(), offset))
    }

    /// Number of daily triggers
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the schedule has no times
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Next firing strictly after `now`, with its slot index
    #[must_use]
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, usize)> {
        let today = now.with_timezone(&self.offset).date_naive();
        [today, today.checked_add_days(Days::new(1))?]
            .into_iter()
            .flat_map(|date| {
                self.times.iter().enumerate().filter_map(move |(index, time)| {
                    date.and_time(*time)
                        .and_local_timezone(self.offset)
                        .single()
                        .map(|local| (local.with_timezone(&Utc), index))
                })
            })
            .find(|(due, _)| *due > now)
    }
}

/// Handle used to stop a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for its task to end
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Scheduler task already stopped");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

/// Background task firing the dispatcher at each scheduled time
pub struct NotificationScheduler;

impl NotificationScheduler {
    /// Start the scheduler on the current runtime
    #[must_use]
    pub fn spawn(dispatcher: Arc<NotificationDispatcher>, schedule: NotificationSchedule) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            info!(triggers = schedule.len(), "Notification scheduler started");
            loop {
                let Some((due, slot_index)) = schedule.next_due(Utc::now()) else {
                    warn!("Notification schedule has no times, scheduler stopping");
                    break;
                };
                let wait = (due - Utc::now()).to_std().unwrap_or_default();
                debug!(due = %due, slot_index, "Waiting for next reminder");

                tokio::select! {
                    () = sleep(wait) => {
                        match dispatcher.dispatch(&DispatchTrigger::scheduled(slot_index)).await {
                            Ok(report) => info!(
                                slot_index,
                                sent = report.sent,
                                failed = report.failed.len(),
                                "Scheduled reminders dispatched"
                            ),
                            Err(e) => error!(slot_index, error = %e, "Scheduled dispatch failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Notification scheduler received shutdown signal");
                        break;
                    }
                }
            }
        });

        SchedulerHandle { shutdown_tx, task }
    }
}
