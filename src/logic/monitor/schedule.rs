//! Cancellable periodic task with a generation token
//!
//! `cancel` both aborts the task and advances the generation. Any mutation a
//! tick makes goes through `Generation::run_if_current`, which checks the token
//! under the same lock `advance` takes, so nothing from a cancelled generation
//! lands after `cancel` returns, even if the tick was mid-flight on another
//! worker thread.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Monotonic generation counter
#[derive(Debug, Default)]
pub struct Generation {
    current: Mutex<u64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every outstanding token; returns the new generation
    pub fn advance(&self) -> u64 {
        let mut current = self.current.lock();
        *current += 1;
        *current
    }

    pub fn is_current(&self, token: u64) -> bool {
        *self.current.lock() == token
    }

    /// Run `apply` only if `token` is still current, holding the lock throughout
    pub fn run_if_current<R>(&self, token: u64, apply: impl FnOnce() -> R) -> Option<R> {
        let current = self.current.lock();
        if *current != token {
            return None;
        }
        Some(apply())
    }
}

/// A running periodic task
pub struct PeriodicTask {
    token: u64,
    generation: Arc<Generation>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `tick` every `period`, first call one period from now.
    ///
    /// Ticks never overlap: the next wait starts after the previous tick's
    /// future completes. Must be called inside a Tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, generation: Arc<Generation>, mut tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = generation.advance();
        let task_generation = generation.clone();

        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                if !task_generation.is_current(token) {
                    break;
                }
                tick(token).await;
            }

            log::debug!("Periodic task generation {} finished", token);
        });

        Self { token, generation, handle }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Stop the task; no tick of this generation applies anything afterwards
    pub fn cancel(self) {
        self.generation.advance();
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_if_current() {
        let g = Generation::new();
        let token = g.advance();
        assert_eq!(g.run_if_current(token, || 5), Some(5));
        g.advance();
        assert_eq!(g.run_if_current(token, || 5), None);
        assert!(!g.is_current(token));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period_until_cancelled() {
        let generation = Arc::new(Generation::new());
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let task = PeriodicTask::spawn(Duration::from_secs(5), generation.clone(), move |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10_200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_do_not_overlap() {
        let generation = Arc::new(Generation::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let (f, m) = (in_flight.clone(), max_seen.clone());
        let task = PeriodicTask::spawn(Duration::from_secs(1), generation, move |_| {
            let (f, m) = (f.clone(), m.clone());
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                // Slower than the period
                tokio::time::sleep(Duration::from_millis(2_500)).await;
                f.fetch_sub(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(20)).await;
        task.cancel();
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
