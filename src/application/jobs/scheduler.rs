//! Cron scheduling for the recurring jobs

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

use super::{reminders, reports};
use crate::infrastructure::{Mailer, Storage};

/// Six-field cron expressions for the recurring jobs
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Daily reminder, default 18:00 UTC
    pub reminder_cron: String,
    /// Monthly report, default 08:00 UTC on the 1st
    pub report_cron: String,
    /// Recipient of the monthly report
    pub report_recipient: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reminder_cron: "0 0 18 * * *".to_string(),
            report_cron: "0 0 8 1 * *".to_string(),
            report_recipient: "admin@parking.local".to_string(),
        }
    }
}

/// Start the scheduler with the reminder and report jobs registered.
pub async fn start_scheduler(
    config: ScheduleConfig,
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job_storage = storage.clone();
    let job_mailer = mailer.clone();
    let reminder = Job::new_async(config.reminder_cron.as_str(), move |_uuid, _lock| {
        let storage = job_storage.clone();
        let mailer = job_mailer.clone();
        Box::pin(async move {
            if let Err(e) =
                reminders::send_booking_reminders(storage.as_ref(), mailer.as_ref()).await
            {
                error!("Reminder job failed: {}", e);
            }
        })
    })?;
    scheduler.add(reminder).await?;

    let recipient = config.report_recipient.clone();
    let report = Job::new_async(config.report_cron.as_str(), move |_uuid, _lock| {
        let storage = storage.clone();
        let mailer = mailer.clone();
        let recipient = recipient.clone();
        Box::pin(async move {
            if let Err(e) = reports::send_monthly_report(
                storage.as_ref(),
                mailer.as_ref(),
                &recipient,
                chrono::Utc::now(),
            )
            .await
            {
                error!("Monthly report job failed: {}", e);
            }
        })
    })?;
    scheduler.add(report).await?;

    scheduler.start().await?;
    info!(
        "Job scheduler started (reminders '{}', reports '{}')",
        config.reminder_cron, config.report_cron
    );
    Ok(scheduler)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{InMemoryStorage, LogMailer};

    #[tokio::test]
    async fn scheduler_starts_with_default_schedules() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

        let mut scheduler = start_scheduler(ScheduleConfig::default(), storage, mailer)
            .await
            .unwrap();
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

        let config = ScheduleConfig {
            reminder_cron: "definitely not cron".to_string(),
            ..Default::default()
        };
        assert!(start_scheduler(config, storage, mailer).await.is_err());
    }
}
