//! Scripted scorer for unit tests

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{FailureKind, FeatureVector, ScoreResult, Scorer};

/// Returns scripted results in order, then `fallback` forever
pub struct MockScorer {
    script: Mutex<VecDeque<ScoreResult>>,
    fallback: ScoreResult,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<FeatureVector>>,
}

impl MockScorer {
    pub fn always(result: ScoreResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn probability(p: f64) -> Self {
        Self::always(ScoreResult::Success { failure_probability: p })
    }

    pub fn timeout() -> Self {
        Self::always(ScoreResult::failed(FailureKind::Timeout, "request timed out"))
    }

    pub fn scripted(results: Vec<ScoreResult>, fallback: ScoreResult) -> Self {
        let mock = Self::always(fallback);
        *mock.script.lock() = results.into();
        mock
    }

    /// Each call sleeps this long (Tokio time) before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<FeatureVector> {
        self.seen.lock().clone()
    }
}

impl Scorer for MockScorer {
    async fn score(&self, vector: &FeatureVector) -> ScoreResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(vector.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
