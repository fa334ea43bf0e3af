//! Periodic sweep of idle sessions
//!
//! Expiry is already enforced on access; the sweep only reclaims rows for
//! sessions nobody comes back to.

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::session::SessionManager;

/// Schedule the sweep and start the scheduler. The returned handle must be
/// kept alive for the job to keep running.
pub async fn start_session_janitor(sessions: SessionManager, schedule: &str) -> Result<JobScheduler> {
    let job = Job::new_async(schedule, move |_, _| {
        let sessions = sessions.clone();
        Box::pin(async move {
            match sessions.sweep(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => info!("Session janitor removed {} idle session(s)", removed),
                Err(e) => error!("Session janitor failed: {}", e),
            }
        })
    })?;

    let scheduler = JobScheduler::new().await?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Started session janitor with schedule: {}", schedule);
    Ok(scheduler)
}
