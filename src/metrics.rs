//! Performance metrics and statistics tracking for the freshness pipeline.

use crate::types::verdict::Verdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total requests received
    pub requests_processed: AtomicU64,
    /// Requests that produced a verdict
    pub verdicts_produced: AtomicU64,
    /// Requests that produced an error envelope
    pub errors: AtomicU64,
    /// Verdicts by classification
    verdicts_by_class: RwLock<HashMap<String, u64>>,
    /// Errors by category
    errors_by_category: RwLock<HashMap<String, u64>>,
    /// End-to-end processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Backend predict times (in microseconds)
    backend_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Freshness index distribution buckets
    index_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            verdicts_produced: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            verdicts_by_class: RwLock::new(HashMap::new()),
            errors_by_category: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            backend_times: RwLock::new(HashMap::new()),
            index_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    fn record_processing_time(&self, processing_time: Duration) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a request that produced a verdict
    pub fn record_verdict(&self, processing_time: Duration, verdict: &Verdict) {
        self.record_processing_time(processing_time);
        self.verdicts_produced.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_class) = self.verdicts_by_class.write() {
            *by_class
                .entry(verdict.classification.as_str().to_string())
                .or_insert(0) += 1;
        }

        // 100 lands in the top bucket
        let bucket = (verdict.freshness_index as usize / 10).min(9);
        if let Ok(mut buckets) = self.index_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a request that failed with an error of `category`
    pub fn record_error(&self, processing_time: Duration, category: &str) {
        self.record_processing_time(processing_time);
        self.errors.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_category) = self.errors_by_category.write() {
            *by_category.entry(category.to_string()).or_insert(0) += 1;
        }
    }

    /// Record backend predict time
    pub fn record_backend_time(&self, backend_id: &str, duration: Duration) {
        if let Ok(mut times) = self.backend_times.write() {
            let backend_times = times.entry(backend_id.to_string()).or_default();
            backend_times.push(duration.as_micros() as u64);
            // Keep only last 1000 per backend
            if backend_times.len() > 1000 {
                backend_times.drain(0..500);
            }
        }
    }

    /// Get processing time statistics
    pub fn processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[percentile_index(count, 0.95)],
            p99_us: sorted[percentile_index(count, 0.99)],
            max_us: sorted[count - 1],
        }
    }

    /// Get per-backend predict statistics
    pub fn backend_stats(&self) -> HashMap<String, BackendStats> {
        let times = match self.backend_times.read() {
            Ok(times) => times,
            Err(_) => return HashMap::new(),
        };
        let mut stats = HashMap::new();

        for (backend, backend_times) in times.iter() {
            if backend_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = backend_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                backend.clone(),
                BackendStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[percentile_index(count, 0.99)],
                },
            );
        }

        stats
    }

    /// Get current throughput (requests per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get freshness index distribution
    pub fn index_distribution(&self) -> [u64; 10] {
        self.index_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Get verdicts by classification
    pub fn verdicts_by_class(&self) -> HashMap<String, u64> {
        self.verdicts_by_class
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get errors by category
    pub fn errors_by_category(&self) -> HashMap<String, u64> {
        self.errors_by_category
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let request_count = self.requests_processed.load(Ordering::Relaxed);
        let verdict_count = self.verdicts_produced.load(Ordering::Relaxed);
        let error_count = self.errors.load(Ordering::Relaxed);
        let error_rate = if request_count > 0 {
            (error_count as f64 / request_count as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.processing_stats();
        let throughput = self.throughput();
        let index_dist = self.index_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             FRESHNESS PIPELINE - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Processed:     {:>8}  │  Throughput: {:>6.1} req/s ║",
            request_count, throughput
        );
        info!(
            "║ Verdicts: {:>8}  Errors: {:>8}  │  Error Rate: {:>6.1}%  ║",
            verdict_count, error_count, error_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Verdicts by Classification:                                  ║");
        let mut by_class: Vec<(String, u64)> = self.verdicts_by_class().into_iter().collect();
        by_class.sort();
        for (class, count) in &by_class {
            let pct = if verdict_count > 0 {
                (*count as f64 / verdict_count as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:12}: {:>6} ({:>5.1}%)                              ║", class, count, pct);
        }

        let mut by_category: Vec<(String, u64)> = self.errors_by_category().into_iter().collect();
        if !by_category.is_empty() {
            by_category.sort();
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Errors by Category:                                          ║");
            for (category, count) in &by_category {
                info!("║   {:26}: {:>6}                          ║", category, count);
            }
        }

        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Freshness Index Distribution:                                ║");
        let total: u64 = index_dist.iter().sum();
        for (i, &count) in index_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            let upper = if i == 9 { 100 } else { i * 10 + 9 };
            info!(
                "║   {:>3}-{:>3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                upper,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let backend_stats = self.backend_stats();
        if !backend_stats.is_empty() {
            info!("Backend Predict Times (μs):");
            for (backend, stats) in &backend_stats {
                info!(
                    "  {}: mean={} p50={} p99={} (calls={})",
                    backend, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
                );
            }
        }
    }
}

fn percentile_index(count: usize, quantile: f64) -> usize {
    ((count as f64 * quantile) as usize).min(count - 1)
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Backend-specific statistics
#[derive(Debug)]
pub struct BackendStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
