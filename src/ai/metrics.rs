//! Run Metrics
//!
//! Counters for one workflow run: gateway calls and tokens, search cache
//! hits, live searches, stored patterns and per-stage wall time. Shared by
//! the concurrent implementation/security agents, so counters are atomics.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::Serialize;

use crate::ai::provider::{LlmResponse, TokenUsage};

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector for a workflow run.
///
/// Counters are atomics; per-stage timings sit behind an RwLock.
pub struct MetricsCollector {
    session_id: String,
    start_time: Instant,
    api_calls: AtomicU32,
    failures: AtomicU32,
    retries: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    cache_hits: AtomicU32,
    cache_misses: AtomicU32,
    searches: AtomicU32,
    patterns_stored: AtomicU32,
    stages: RwLock<Vec<StageMetrics>>,
}

/// Wall-clock timing of one workflow stage
#[derive(Debug, Clone, Serialize)]
pub struct StageMetrics {
    pub name: String,
    pub duration_ms: u64,
    pub skipped: bool,
}

/// Summary statistics for a workflow run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub session_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub failures: u32,
    pub retries: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub searches: u32,
    pub patterns_stored: u32,
    pub stages: Vec<StageMetrics>,
}

impl MetricsCollector {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            failures: AtomicU32::new(0),
            retries: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            cache_hits: AtomicU32::new(0),
            cache_misses: AtomicU32::new(0),
            searches: AtomicU32::new(0),
            patterns_stored: AtomicU32::new(0),
            stages: RwLock::new(Vec::new()),
        }
    }

    /// Record metrics from an LLM response
    pub fn record_response(&self, response: &LlmResponse) {
        self.record_tokens(&response.usage, response.timing.latency_ms);
    }

    /// Record token usage directly
    pub fn record_tokens(&self, usage: &TokenUsage, latency_ms: u64) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record a failed external call (after retries)
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pattern_stored(&self) {
        self.patterns_stored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished (or skipped) stage
    pub fn complete_stage(&self, name: impl Into<String>, started: Instant, skipped: bool) {
        let mut stages = self.stages.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics stages RwLock poisoned, recovering");
            poisoned.into_inner()
        });
        stages.push(StageMetrics {
            name: name.into(),
            duration_ms: started.elapsed().as_millis() as u64,
            skipped,
        });
    }

    /// Point-in-time copy of every counter
    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        let stages = self
            .stages
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics stages RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        MetricsSummary {
            session_id: self.session_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            failures: self.failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            patterns_stored: self.patterns_stored.load(Ordering::Relaxed),
            stages,
        }
    }
}

impl MetricsSummary {
    /// Cache hit ratio in `[0.0, 1.0]`; zero when the cache was never consulted
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    /// Multi-line report printed after a run
    pub fn display(&self) -> String {
        let mut report = format!(
            "Session: {}\n\
             Duration: {:.1}s\n\
             API Calls: {} (failures: {}, retries: {})\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms\n\
             Search Cache: {} hits, {} misses ({:.0}% hit rate), {} live searches\n\
             Patterns Stored: {}",
            self.session_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.failures,
            self.retries,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate() * 100.0,
            self.searches,
            self.patterns_stored
        );

        for stage in &self.stages {
            let state = if stage.skipped { " (skipped)" } else { "" };
            report.push_str(&format!(
                "\n  {:<18} {:>6}ms{}",
                stage.name, stage.duration_ms, state
            ));
        }
        report
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector for workflow stages
pub type SharedMetrics = Arc<MetricsCollector>;

/// Create shared metrics collector
pub fn create_shared_metrics(session_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(session_id))
}

// =============================================================================
// Tests
// =============================================================================
