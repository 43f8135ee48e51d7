//! Serving counters and latency statistics for the prediction service.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const LATENCY_SAMPLES: usize = 10_000;

/// Which endpoint served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Predict,
    Explain,
}

/// Metrics collector shared by all request workers
pub struct ServiceMetrics {
    predictions: AtomicU64,
    explanations: AtomicU64,
    churn_flagged: AtomicU64,
    validation_failures: AtomicU64,
    inference_failures: AtomicU64,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

/// Point-in-time copy of the counters, served by `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub explanations: u64,
    pub churn_flagged: u64,
    pub validation_failures: u64,
    pub inference_failures: u64,
    pub uptime_secs: f64,
    pub latency: LatencyStats,
    pub probability_buckets: [u64; 10],
}

/// Latency statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            explanations: AtomicU64::new(0),
            churn_flagged: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully scored request
    pub fn record_success(&self, kind: RequestKind, elapsed: Duration, probability: Option<f64>) {
        match kind {
            RequestKind::Predict => self.predictions.fetch_add(1, Ordering::Relaxed),
            RequestKind::Explain => self.explanations.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.latencies.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > LATENCY_SAMPLES {
                times.drain(0..LATENCY_SAMPLES / 2);
            }
        }

        if let Some(p) = probability {
            let bucket = (p * 10.0).clamp(0.0, 9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    pub fn record_churn_flagged(&self) {
        self.churn_flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            explanations: self.explanations.load(Ordering::Relaxed),
            churn_flagged: self.churn_flagged.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
            latency: self.latency_stats(),
            probability_buckets: self
                .probability_buckets
                .read()
                .map(|b| *b)
                .unwrap_or([0; 10]),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let s = self.snapshot();
        let churn_rate = if s.predictions > 0 {
            (s.churn_flagged as f64 / s.predictions as f64) * 100.0
        } else {
            0.0
        };

        info!(
            predictions = s.predictions,
            explanations = s.explanations,
            churn_rate = format!("{:.1}%", churn_rate),
            validation_failures = s.validation_failures,
            inference_failures = s.inference_failures,
            mean_us = s.latency.mean_us,
            p50_us = s.latency.p50_us,
            p99_us = s.latency.p99_us,
            "Serving summary"
        );
        info!(buckets = ?s.probability_buckets, "Probability distribution");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_success(RequestKind::Predict, Duration::from_micros(100), Some(0.73));
        metrics.record_success(RequestKind::Predict, Duration::from_micros(300), Some(0.1));
        metrics.record_success(RequestKind::Explain, Duration::from_micros(200), None);
        metrics.record_churn_flagged();
        metrics.record_validation_failure();

        let s = metrics.snapshot();
        assert_eq!(s.predictions, 2);
        assert_eq!(s.explanations, 1);
        assert_eq!(s.churn_flagged, 1);
        assert_eq!(s.validation_failures, 1);
        assert_eq!(s.probability_buckets[7], 1);
        assert_eq!(s.probability_buckets[1], 1);
        assert_eq!(s.latency.count, 3);
        assert_eq!(s.latency.mean_us, 200);
        assert_eq!(s.latency.max_us, 300);
    }

    #[test]
    fn test_probability_one_lands_in_last_bucket() {
        let metrics = ServiceMetrics::new();
        metrics.record_success(RequestKind::Predict, Duration::ZERO, Some(1.0));
        assert_eq!(metrics.snapshot().probability_buckets[9], 1);
    }

    #[test]
    fn test_empty_latency_stats() {
        let stats = ServiceMetrics::new().latency_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_us, 0);
    }
}
