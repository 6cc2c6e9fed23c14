//! Reminder sweep job.
//!
//! Ticks on a fixed interval and runs each sweep on its own task. The
//! `in_flight` flag keeps a slow sweep (stalled SMTP handshake, saturated
//! SMS gateway) from stacking up behind the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use shepherd_core::error::Result;
use shepherd_followup::FollowUpEngine;

pub struct ReminderJob {
    engine: Arc<FollowUpEngine>,
    sweep_interval: Duration,
    in_flight: AtomicBool,
}

impl ReminderJob {
    pub fn new(engine: Arc<FollowUpEngine>, sweep_interval_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            engine,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Start the tick loop as a background tokio task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let job = self.clone();
        tokio::spawn(async move {
            tracing::info!(
                "⏰ Reminder sweep started (every {}s)",
                job.sweep_interval.as_secs()
            );
            let mut interval = tokio::time::interval(job.sweep_interval);
            loop {
                interval.tick().await;
                job.sweep_if_idle();
            }
        })
    }

    /// Spawn one sweep unless the previous one is still running. Returns
    /// whether a sweep was started.
    fn sweep_if_idle(self: &Arc<Self>) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("previous reminder sweep still running, skipping tick");
            return false;
        }
        let job = self.clone();
        tokio::spawn(async move {
            if let Err(e) = job.run_once().await {
                tracing::error!("reminder sweep failed: {e}");
            }
            job.in_flight.store(false, Ordering::SeqCst);
        });
        true
    }

    /// One sweep over due follow-ups. Returns the number examined.
    pub async fn run_once(&self) -> Result<usize> {
        let count = self.engine.run_due_reminders().await?;
        if count > 0 {
            tracing::info!("🔔 Triggered reminders for {count} due follow-ups");
        }
        Ok(count)
    }
}
