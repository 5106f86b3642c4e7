//! Scheduler
//!
//! An explicit component owning its timer registrations: jobs are injected
//! as closures, `start` spawns one task per job, `shutdown` aborts them.
//! Each job loop awaits its own invocation before sleeping again, so a job
//! can never overlap itself; an error is logged and the cadence keeps
//! ticking, so one bad run never kills a job or its neighbours.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc, Weekday};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// When a job fires.
#[derive(Debug, Clone, Copy)]
pub enum Cadence {
    /// Fixed interval, first run one period after start.
    Every(Duration),
    /// Once a day at the given UTC time.
    DailyAt { hour: u32, minute: u32 },
    /// Once a week at the given UTC weekday and time.
    WeeklyAt {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

struct Job {
    name: &'static str,
    cadence: Cadence,
    run: JobFn,
}

pub struct Scheduler {
    jobs: Vec<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            handles: Vec::new(),
        }
    }

    pub fn add_job<F, Fut>(&mut self, name: &'static str, cadence: Cadence, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.jobs.push(Job {
            name,
            cadence,
            run: Arc::new(move || Box::pin(job())),
        });
    }

    /// Spawn one task per registered job.
    pub fn start(&mut self) {
        let count = self.jobs.len();
        for job in self.jobs.drain(..) {
            self.handles.push(tokio::spawn(run_job(job)));
        }
        info!("⏱️  Scheduler started with {count} jobs");
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Abort all job tasks. In-flight invocations are cancelled at their
    /// next await point; the store transaction they hold simply rolls back.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("⏱️  Scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

async fn run_job(job: Job) {
    match job.cadence {
        Cadence::Every(period) => {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately;
            // consume it so the job first fires one period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                invoke(&job).await;
            }
        }
        Cadence::DailyAt { .. } | Cadence::WeeklyAt { .. } => loop {
            let wait = until_next(job.cadence, Utc::now());
            debug!(job = job.name, "next run in {}s", wait.as_secs());
            tokio::time::sleep(wait).await;
            invoke(&job).await;
        },
    }
}

async fn invoke(job: &Job) {
    if let Err(e) = (job.run)().await {
        warn!(job = job.name, "⚠️  scheduled job failed: {e:#}");
    }
}

/// Time until the next occurrence of a cron-like cadence, strictly in the
/// future of `now`.
fn until_next(cadence: Cadence, now: DateTime<Utc>) -> Duration {
    let (hour, minute, weekday) = match cadence {
        Cadence::DailyAt { hour, minute } => (hour, minute, None),
        Cadence::WeeklyAt {
            weekday,
            hour,
            minute,
        } => (hour, minute, Some(weekday)),
        Cadence::Every(period) => return period,
    };

    let today_at = now
        .date_naive()
        .and_hms_opt(hour.min(23), minute.min(59), 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).expect("midnight"))
        .and_utc();

    let mut next = match weekday {
        None => today_at,
        Some(target) => {
            let ahead = (target.num_days_from_monday() + 7
                - now.weekday().num_days_from_monday())
                % 7;
            today_at + ChronoDuration::days(ahead as i64)
        }
    };

    if next <= now {
        next += match weekday {
            None => ChronoDuration::days(1),
            Some(_) => ChronoDuration::days(7),
        };
    }

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn daily_cadence_picks_today_or_tomorrow() {
        let cadence = Cadence::DailyAt { hour: 12, minute: 0 };

        // 09:00 -> noon today, 3 hours away.
        let wait = until_next(cadence, at(2024, 3, 1, 9, 0));
        assert_eq!(wait, Duration::from_secs(3 * 3600));

        // Exactly noon -> tomorrow, never "now".
        let wait = until_next(cadence, at(2024, 3, 1, 12, 0));
        assert_eq!(wait, Duration::from_secs(24 * 3600));

        // 18:00 -> noon tomorrow.
        let wait = until_next(cadence, at(2024, 3, 1, 18, 0));
        assert_eq!(wait, Duration::from_secs(18 * 3600));
    }

    #[test]
    fn weekly_cadence_wraps_the_week() {
        let cadence = Cadence::WeeklyAt {
            weekday: Weekday::Sun,
            hour: 20,
            minute: 0,
        };

        // Friday 2024-03-01 10:00 -> Sunday 20:00 is 2 days 10 hours away.
        let wait = until_next(cadence, at(2024, 3, 1, 10, 0));
        assert_eq!(wait, Duration::from_secs((2 * 24 + 10) * 3600));

        // Sunday 21:00, past this week's slot -> next Sunday.
        let wait = until_next(cadence, at(2024, 3, 3, 21, 0));
        assert_eq!(wait, Duration::from_secs((7 * 24 - 1) * 3600));
    }

    #[tokio::test]
    async fn jobs_fire_and_shutdown_stops_them() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        {
            let count = count.clone();
            scheduler.add_job("counter", Cadence::Every(Duration::from_millis(10)), move || {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        scheduler.start();
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 2, "expected several runs, got {fired}");

        scheduler.shutdown();
        assert!(!scheduler.is_running());
        let stopped_at = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test]
    async fn a_failing_job_keeps_its_cadence_and_its_neighbours() {
        let failures = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        {
            let failures = failures.clone();
            scheduler.add_job("flaky", Cadence::Every(Duration::from_millis(10)), move || {
                let failures = failures.clone();
                async move {
                    failures.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("boom")
                }
            });
        }
        {
            let successes = successes.clone();
            scheduler.add_job("steady", Cadence::Every(Duration::from_millis(10)), move || {
                let successes = successes.clone();
                async move {
                    successes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.shutdown();

        // The failing job kept being retried on its natural tick, and the
        // healthy one never noticed.
        assert!(failures.load(Ordering::SeqCst) >= 2);
        assert!(successes.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn a_job_never_overlaps_itself() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            // The job takes 3x its period to run.
            scheduler.add_job("slow", Cadence::Every(Duration::from_millis(10)), move || {
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.shutdown();

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
