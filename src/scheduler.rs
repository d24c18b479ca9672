// scheduler.rs
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

pub const INITIAL_DELAY: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Schedule {
    pub fn every_hours(hours: u64) -> Self {
        Self {
            initial_delay: INITIAL_DELAY,
            interval: Duration::from_secs(hours.max(1) * 3600),
        }
    }
}

/// Background thread calling a job on a fixed schedule. Stops when dropped.
pub struct Scheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start<F>(schedule: Schedule, mut job: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown, rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || {
                info!(
                    initial_delay = ?schedule.initial_delay,
                    interval = ?schedule.interval,
                    "scheduler started"
                );
                let mut wait = schedule.initial_delay;
                loop {
                    // Any message or a dropped sender ends the loop.
                    match rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                    job();
                    wait = schedule.interval;
                }
                info!("scheduler stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_job_repeatedly_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let schedule = Schedule {
            initial_delay: Duration::from_millis(5),
            interval: Duration::from_millis(5),
        };

        let scheduler = Scheduler::start(schedule, {
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(200));
        scheduler.stop();

        let runs = count.load(Ordering::SeqCst);
        assert!(runs >= 2, "expected repeated runs, got {runs}");

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), runs);
    }

    #[test]
    fn stop_before_first_tick_never_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::start(Schedule::every_hours(6), {
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        scheduler.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
