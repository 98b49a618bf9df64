//! Telemetry — thread-safe counter bank with periodic emission.
//!
//! Every pipeline stage records into this bank. One lock guards all
//! counters so a snapshot is always internally consistent (the HTTP
//! metrics endpoint requires that). Increments are cheap and never
//! performed while awaiting.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::info;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Snapshot of every counter tracked by the pipeline. All counters are
/// non-decreasing; the averages use a decaying mean biased to recent
/// samples: `avg = (avg + sample) / 2`.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    // Discovery
    pub tokens_found: u64,

    // Filtering
    pub tokens_filtered: u64,
    pub tokens_dropped: u64,

    // Safety
    pub safety_checks: u64,
    pub honeypots_detected: u64,
    pub safe_tokens: u64,

    // Strategy
    pub evaluations: u64,
    pub candidates_listed: u64,

    // Execution
    pub trades_executed: u64,
    pub execution_success: u64,
    pub execution_failed: u64,
    pub simulation_failed: u64,

    // Financial
    pub total_invested: f64,
    pub total_profit: f64,
    pub total_loss: f64,

    // Performance
    pub avg_decision_latency: Duration,
    pub avg_execution_time: Duration,
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Shared counter bank. Clone the `Arc` into every stage that records.
#[derive(Debug, Default)]
pub struct Telemetry {
    metrics: RwLock<Metrics>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_token_found(&self) {
        self.metrics.write().unwrap().tokens_found += 1;
    }

    pub fn record_token_filtered(&self, dropped: bool) {
        let mut m = self.metrics.write().unwrap();
        m.tokens_filtered += 1;
        if dropped {
            m.tokens_dropped += 1;
        }
    }

    pub fn record_safety_check(&self, is_honeypot: bool, is_safe: bool) {
        let mut m = self.metrics.write().unwrap();
        m.safety_checks += 1;
        if is_honeypot {
            m.honeypots_detected += 1;
        }
        if is_safe {
            m.safe_tokens += 1;
        }
    }

    pub fn record_evaluation(&self) {
        self.metrics.write().unwrap().evaluations += 1;
    }

    pub fn record_candidate_listed(&self) {
        self.metrics.write().unwrap().candidates_listed += 1;
    }

    /// Record a trade execution outcome. Successful executions add the
    /// committed amount to `total_invested`.
    pub fn record_execution(&self, success: bool, amount_usd: f64) {
        let mut m = self.metrics.write().unwrap();
        m.trades_executed += 1;
        if success {
            m.execution_success += 1;
            m.total_invested += amount_usd;
        } else {
            m.execution_failed += 1;
        }
    }

    pub fn record_simulation_failure(&self) {
        self.metrics.write().unwrap().simulation_failed += 1;
    }

    pub fn record_profit(&self, pnl: f64) {
        let mut m = self.metrics.write().unwrap();
        if pnl > 0.0 {
            m.total_profit += pnl;
        } else {
            m.total_loss += -pnl;
        }
    }

    /// Decaying mean; each new sample carries half the weight.
    pub fn record_decision_latency(&self, sample: Duration) {
        let mut m = self.metrics.write().unwrap();
        m.avg_decision_latency = (m.avg_decision_latency + sample) / 2;
    }

    pub fn record_execution_time(&self, sample: Duration) {
        let mut m = self.metrics.write().unwrap();
        m.avg_execution_time = (m.avg_execution_time + sample) / 2;
    }

    /// Deep copy of all counters, sampled under one lock acquisition.
    pub fn snapshot(&self) -> Metrics {
        self.metrics.read().unwrap().clone()
    }

    /// Emit a formatted snapshot to the log.
    pub fn log_metrics(&self) {
        let m = self.snapshot();
        info!(
            tokens_found = m.tokens_found,
            filtered = m.tokens_filtered,
            dropped = m.tokens_dropped,
            safety_checks = m.safety_checks,
            honeypots = m.honeypots_detected,
            safe = m.safe_tokens,
            evaluations = m.evaluations,
            candidates = m.candidates_listed,
            executions = m.trades_executed,
            exec_ok = m.execution_success,
            exec_failed = m.execution_failed,
            sim_failed = m.simulation_failed,
            invested = format!("${:.2}", m.total_invested),
            profit = format!("${:.2}", m.total_profit),
            loss = format!("${:.2}", m.total_loss),
            avg_decision_ms = m.avg_decision_latency.as_millis() as u64,
            avg_execution_ms = m.avg_execution_time.as_millis() as u64,
            "telemetry snapshot"
        );
    }

    /// Spawn a background ticker that logs a snapshot every `interval`
    /// until the returned sender fires or is dropped.
    pub fn start_periodic_logging(self: Arc<Self>, interval: Duration) -> oneshot::Sender<()> {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let telemetry = self;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; consume it so the
            // first snapshot lands one full interval after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => telemetry.log_metrics(),
                    _ = &mut stop_rx => break,
                }
            }
        });

        stop_tx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let telemetry = Telemetry::new();
        let m = telemetry.snapshot();
        assert_eq!(m.tokens_found, 0);
        assert_eq!(m.trades_executed, 0);
        assert_eq!(m.avg_decision_latency, Duration::ZERO);
        assert!((m.total_invested - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_record_token_filtered() {
        let telemetry = Telemetry::new();
        telemetry.record_token_filtered(false);
        telemetry.record_token_filtered(true);
        telemetry.record_token_filtered(true);

        let m = telemetry.snapshot();
        assert_eq!(m.tokens_filtered, 3);
        assert_eq!(m.tokens_dropped, 2);
    }

    #[test]
    fn test_record_safety_check() {
        let telemetry = Telemetry::new();
        telemetry.record_safety_check(true, false);
        telemetry.record_safety_check(false, true);
        telemetry.record_safety_check(false, false);

        let m = telemetry.snapshot();
        assert_eq!(m.safety_checks, 3);
        assert_eq!(m.honeypots_detected, 1);
        assert_eq!(m.safe_tokens, 1);
    }

    #[test]
    fn test_record_execution_tracks_invested() {
        let telemetry = Telemetry::new();
        telemetry.record_execution(true, 100.0);
        telemetry.record_execution(false, 0.0);
        telemetry.record_execution(true, 50.0);

        let m = telemetry.snapshot();
        assert_eq!(m.trades_executed, 3);
        assert_eq!(m.execution_success, 2);
        assert_eq!(m.execution_failed, 1);
        assert!((m.total_invested - 150.0).abs() < 1e-10);
    }

    #[test]
    fn test_record_profit_splits_sign() {
        let telemetry = Telemetry::new();
        telemetry.record_profit(30.0);
        telemetry.record_profit(-12.5);

        let m = telemetry.snapshot();
        assert!((m.total_profit - 30.0).abs() < 1e-10);
        assert!((m.total_loss - 12.5).abs() < 1e-10);
    }

    #[test]
    fn test_decaying_average_semantics() {
        // avg = (avg + sample) / 2, starting from zero:
        // (0 + 100) / 2 = 50; (50 + 200) / 2 = 125.
        let telemetry = Telemetry::new();
        telemetry.record_decision_latency(Duration::from_millis(100));
        assert_eq!(
            telemetry.snapshot().avg_decision_latency,
            Duration::from_millis(50)
        );
        telemetry.record_decision_latency(Duration::from_millis(200));
        assert_eq!(
            telemetry.snapshot().avg_decision_latency,
            Duration::from_millis(125)
        );
    }

    #[test]
    fn test_execution_time_average_independent() {
        let telemetry = Telemetry::new();
        telemetry.record_execution_time(Duration::from_millis(80));
        let m = telemetry.snapshot();
        assert_eq!(m.avg_execution_time, Duration::from_millis(40));
        assert_eq!(m.avg_decision_latency, Duration::ZERO);
    }

    #[test]
    fn test_counters_are_monotonic() {
        let telemetry = Telemetry::new();
        let mut last = 0;
        for _ in 0..10 {
            telemetry.record_token_found();
            let current = telemetry.snapshot().tokens_found;
            assert!(current > last);
            last = current;
        }
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let telemetry = Telemetry::new();
        telemetry.record_token_found();
        let snapshot = telemetry.snapshot();
        telemetry.record_token_found();
        // Earlier snapshot is unaffected by later writes.
        assert_eq!(snapshot.tokens_found, 1);
        assert_eq!(telemetry.snapshot().tokens_found, 2);
    }

    #[tokio::test]
    async fn test_periodic_logging_stops_on_signal() {
        let telemetry = Arc::new(Telemetry::new());
        let stop = telemetry.start_periodic_logging(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Both an explicit send and a drop stop the ticker.
        stop.send(()).ok();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_periodic_logging_stops_on_drop() {
        let telemetry = Arc::new(Telemetry::new());
        let stop = telemetry.start_periodic_logging(Duration::from_millis(10));
        drop(stop);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
