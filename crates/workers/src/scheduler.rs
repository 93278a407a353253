//! Bounded task pool scheduler for background workers. Each job carries its
//! own cadence; the scheduler recomputes the next fire time from the
//! injected [`Clock`] on every tick rather than depending on real
//! wall-clock sleep, so a [`hotel_core::clock::FixedClock`]-driven test can
//! assert a firing decision without waiting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_core::clock::Clock;
use hotel_core::error::HotelResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, now: DateTime<Utc>) -> HotelResult<()>;
}

/// A job's recurrence. `Interval` is a fixed offset from the last fire;
/// `Cron` resolves the next fire through the `cron` crate, letting the
/// expired-cache sweep run on an actual cron pattern.
pub enum Cadence {
    Interval(std::time::Duration),
    Cron(cron::Schedule),
}

fn next_fire(cadence: &Cadence, from: DateTime<Utc>) -> DateTime<Utc> {
    match cadence {
        Cadence::Interval(d) => from + chrono::Duration::from_std(*d).unwrap_or(chrono::Duration::seconds(60)),
        Cadence::Cron(schedule) => schedule.after(&from).next().unwrap_or(from + chrono::Duration::hours(1)),
    }
}

struct ScheduledJob {
    job: Arc<dyn Job>,
    cadence: Cadence,
    next_run: Mutex<DateTime<Utc>>,
}

/// Recomputes readiness from `Clock::now()` on every `tick`, fires due jobs
/// concurrently, and gates ticking behind a `pause()`/`resume()` flag so
/// tests can freeze cadence.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    jobs: Vec<ScheduledJob>,
    paused: AtomicBool,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            jobs: Vec::new(),
            paused: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, job: Arc<dyn Job>, cadence: Cadence) {
        let first_run = next_fire(&cadence, self.clock.now());
        info!(job = job.name(), first_run = %first_run, "worker registered");
        self.jobs.push(ScheduledJob {
            job,
            cadence,
            next_run: Mutex::new(first_run),
        });
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Fires every job whose `next_run` has passed, awaiting each job
    /// in turn, and returns the names that fired. Failures are logged, not
    /// propagated — one worker's error never blocks another's schedule.
    pub async fn tick(&self) -> Vec<&'static str> {
        if self.is_paused() {
            return vec![];
        }
        let now = self.clock.now();
        let mut fired = Vec::new();
        for scheduled in &self.jobs {
            let due = *scheduled.next_run.lock() <= now;
            if !due {
                continue;
            }
            if let Err(err) = scheduled.job.run(now).await {
                warn!(job = scheduled.job.name(), error = %err, "background job failed");
            }
            *scheduled.next_run.lock() = next_fire(&scheduled.cadence, now);
            fired.push(scheduled.job.name());
        }
        fired
    }

    /// Polls `tick` at `poll_interval` until the process shuts down. The
    /// poll interval only bounds latency between a job becoming due and it
    /// firing; it is not itself a job cadence.
    pub async fn run_forever(self: Arc<Self>, poll_interval: std::time::Duration) {
        loop {
            self.tick().await;
            tokio::time::sleep(poll_interval).await;
        }
    }
}
