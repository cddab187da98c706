//! Periodic job scheduling.
//!
//! One spawned loop per job: compute the next occurrence from wall-clock
//! time, sleep until then, run, repeat. A shared cancellation token stops all
//! loops on shutdown. Job failures are logged and the loop keeps going; there
//! is no retry — every job here is periodic and self-healing on its next run.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;

/// When a job runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Every hour at the given minute.
    Hourly { minute: u32 },
    /// Once a month at the given day of month and hour, UTC.
    Monthly { day: u32, hour: u32 },
}

impl Schedule {
    /// The first occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Schedule::Hourly { minute } => {
                let base = now.with_second(0)?.with_nanosecond(0)?;
                let candidate = base.with_minute(minute)?;
                if candidate > now {
                    Some(candidate)
                } else {
                    candidate.checked_add_signed(chrono::Duration::hours(1))
                }
            }
            Schedule::Monthly { day, hour } => {
                let mut year = now.year();
                let mut month = now.month();
                // Scan forward month by month; days that do not exist in a
                // month (e.g. 31) are skipped.
                for _ in 0..48 {
                    if let Some(candidate) =
                        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single()
                    {
                        if candidate > now {
                            return Some(candidate);
                        }
                    }
                    month += 1;
                    if month > 12 {
                        month = 1;
                        year += 1;
                    }
                }
                None
            }
        }
    }
}

/// A periodically executed unit of work.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    fn schedule(&self) -> Schedule;
    async fn run(&self) -> Result<()>;
}

/// Runs registered jobs until stopped.
pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn Job>) {
        self.jobs.push(job);
    }

    pub fn start(&mut self) {
        for job in &self.jobs {
            let job = job.clone();
            let cancel = self.cancel.clone();
            self.handles
                .push(tokio::spawn(async move { job_loop(job, cancel).await }));
        }
        info!("started {} scheduled jobs", self.jobs.len());
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Upcoming run per job, in registration order.
    pub fn next_runs(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        let now = Utc::now();
        self.jobs
            .iter()
            .map(|job| (job.name().to_string(), job.schedule().next_after(now)))
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn job_loop(job: Arc<dyn Job>, cancel: CancellationToken) {
    loop {
        let Some(next) = job.schedule().next_after(Utc::now()) else {
            error!("job {} has no next run, stopping its loop", job.name());
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait) => {
                info!("running scheduled job {}", job.name());
                if let Err(e) = job.run().await {
                    error!("scheduled job {} failed: {e}", job.name());
                }
            }
        }
    }
}
