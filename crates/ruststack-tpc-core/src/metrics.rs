//! Transfer timers.
//!
//! [`TransferMetrics`] owns a `prometheus` registry with one duration
//! histogram and one failure counter, both labelled by transfer direction.
//! Each call to the transfer client is wrapped with
//! `metrics.timer(direction).time(future)`. `GET /metrics` serves the registry
//! in the Prometheus text format.

use std::fmt;
use std::future::Future;

use prometheus::{
    Encoder as _, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::transfer::TransferDirection;

const DIRECTION_LABEL: &str = "direction";

/// Bucket bounds, in seconds, for transfer durations.
const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0,
];

/// Point-in-time view of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSnapshot {
    /// Completed calls.
    pub count: u64,
    /// Calls that returned an error.
    pub failures: u64,
    /// Sum of call durations, in seconds.
    pub total_seconds: f64,
}

/// Per-direction transfer timers.
#[derive(Clone)]
pub struct TransferMetrics {
    registry: Registry,
    durations: HistogramVec,
    failures: IntCounterVec,
}

impl fmt::Debug for TransferMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferMetrics")
            .field("pull", &self.snapshot(TransferDirection::Pull))
            .field("push", &self.snapshot(TransferDirection::Push))
            .finish()
    }
}

impl TransferMetrics {
    /// Create and register zeroed timers for both directions.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let durations = HistogramVec::new(
            HistogramOpts::new(
                "tpc_transfer_duration_seconds",
                "Duration of third-party transfers.",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &[DIRECTION_LABEL],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("tpc_transfer_failures_total", "Failed third-party transfers."),
            &[DIRECTION_LABEL],
        )?;
        registry.register(Box::new(durations.clone()))?;
        registry.register(Box::new(failures.clone()))?;

        // Export both directions from the first scrape on.
        for direction in [TransferDirection::Pull, TransferDirection::Push] {
            durations.with_label_values(&[direction.as_str()]);
            failures.with_label_values(&[direction.as_str()]);
        }

        Ok(Self {
            registry,
            durations,
            failures,
        })
    }

    /// Timer for one direction.
    #[must_use]
    pub fn timer(&self, direction: TransferDirection) -> TransferTimer {
        TransferTimer {
            duration: self.durations.with_label_values(&[direction.as_str()]),
            failures: self.failures.with_label_values(&[direction.as_str()]),
        }
    }

    /// Current values of one direction.
    #[must_use]
    pub fn snapshot(&self, direction: TransferDirection) -> TimerSnapshot {
        let duration = self.durations.with_label_values(&[direction.as_str()]);
        TimerSnapshot {
            count: duration.get_sample_count(),
            failures: self.failures.with_label_values(&[direction.as_str()]).get(),
            total_seconds: duration.get_sample_sum(),
        }
    }

    /// The registry, for callers that export it elsewhere.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// A timer bound to one direction.
pub struct TransferTimer {
    duration: Histogram,
    failures: IntCounter,
}

impl fmt::Debug for TransferTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferTimer")
            .field("count", &self.duration.get_sample_count())
            .field("failures", &self.failures.get())
            .finish()
    }
}

impl TransferTimer {
    /// Await `fut`, observing its duration and counting it if it failed.
    pub async fn time<F, T, E>(self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let timer = self.duration.start_timer();
        let result = fut.await;
        timer.observe_duration();
        if result.is_err() {
            self.failures.inc();
        }
        result
    }
}
