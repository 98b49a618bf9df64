//! Orchestrator — owns every component and wires the pipeline.
//!
//! Discovery events fan out to one ephemeral worker task per token;
//! inside a worker the stages run strictly in order and any drop,
//! unsafe verdict, or error ends the worker without touching later
//! stages. A separate consumer drains the listing's execution queue.
//! Workers race their pipeline against the root shutdown signal, so
//! cancellation aborts in-flight work without updating listing status.
//! Worker errors never propagate to the root; only startup errors are
//! fatal.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chains::base::BaseDiscoverer;
use crate::chains::solana::SolanaDiscoverer;
use crate::chains::Discoverer;
use crate::config::Config;
use crate::engine::executor::Executor;
use crate::engine::listing::Listing;
use crate::engine::offchain::OffChainGatherer;
use crate::engine::prefilter::PreFilter;
use crate::engine::safety::SafetyEvaluator;
use crate::engine::scanner::Scanner;
use crate::strategy::evaluator::StrategyEvaluator;
use crate::strategy::risk::RiskManager;
use crate::telemetry::Telemetry;
use crate::types::{Action, Candidate, CandidateStatus, ExecutionStatus, TokenFound};

const TELEMETRY_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Everything a per-token evaluation worker needs.
#[derive(Clone)]
struct EvalStages {
    config: Arc<Config>,
    prefilter: Arc<PreFilter>,
    safety: Arc<SafetyEvaluator>,
    offchain: Arc<OffChainGatherer>,
    strategy: Arc<StrategyEvaluator>,
    listing: Arc<Listing>,
    telemetry: Arc<Telemetry>,
}

/// Everything a per-candidate execution worker needs.
#[derive(Clone)]
struct ExecStages {
    config: Arc<Config>,
    executor: Arc<Executor>,
    risk: Arc<RiskManager>,
    listing: Arc<Listing>,
    telemetry: Arc<Telemetry>,
}

pub struct Orchestrator {
    scanner: Scanner,
    eval: EvalStages,
    exec: ExecStages,
    queue_rx: Option<mpsc::Receiver<Candidate>>,
    shutdown: watch::Sender<bool>,
    telemetry_stop: Option<oneshot::Sender<()>>,
    consumers: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Wire up all components against the live chain discoverers.
    pub fn new(config: Arc<Config>) -> Self {
        let discoverers: Vec<Box<dyn Discoverer>> = vec![
            Box::new(SolanaDiscoverer::new(config.solana_rpc_url.clone())),
            Box::new(BaseDiscoverer::new(config.base_rpc_url.clone())),
        ];
        Self::with_parts(
            Arc::clone(&config),
            discoverers,
            OffChainGatherer::new(Arc::clone(&config)),
        )
    }

    /// Wire up with specific discoverers and gatherer (tests feed
    /// scripted discoveries and offline data clients through here).
    pub fn with_parts(
        config: Arc<Config>,
        discoverers: Vec<Box<dyn Discoverer>>,
        offchain: OffChainGatherer,
    ) -> Self {
        let (listing, queue_rx) = Listing::new();
        let listing = Arc::new(listing);
        let telemetry = Arc::new(Telemetry::new());
        let (shutdown, _) = watch::channel(false);

        let eval = EvalStages {
            config: Arc::clone(&config),
            prefilter: Arc::new(PreFilter::new(Arc::clone(&config))),
            safety: Arc::new(SafetyEvaluator::new(Arc::clone(&config))),
            offchain: Arc::new(offchain),
            strategy: Arc::new(StrategyEvaluator::new(Arc::clone(&config))),
            listing: Arc::clone(&listing),
            telemetry: Arc::clone(&telemetry),
        };
        let exec = ExecStages {
            config: Arc::clone(&config),
            executor: Arc::new(Executor::new(Arc::clone(&config))),
            risk: Arc::new(RiskManager::new(&config)),
            listing,
            telemetry,
        };

        Self {
            scanner: Scanner::new(config, discoverers),
            eval,
            exec,
            queue_rx: Some(queue_rx),
            shutdown,
            telemetry_stop: None,
            consumers: Vec::new(),
        }
    }

    pub fn listing(&self) -> Arc<Listing> {
        Arc::clone(&self.eval.listing)
    }

    pub fn risk(&self) -> Arc<RiskManager> {
        Arc::clone(&self.exec.risk)
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.eval.telemetry)
    }

    /// Start everything and park until shutdown is signalled.
    pub async fn run(&mut self) -> Result<()> {
        let config = &self.eval.config;
        info!(
            dry_run = config.dry_run,
            auto_execute = config.auto_execute,
            "orchestrator starting"
        );

        self.telemetry_stop = Some(
            Arc::clone(&self.eval.telemetry).start_periodic_logging(TELEMETRY_LOG_INTERVAL),
        );

        let events = self
            .scanner
            .take_events()
            .ok_or_else(|| anyhow!("discovery stream already taken"))?;
        let queue_rx = self
            .queue_rx
            .take()
            .ok_or_else(|| anyhow!("execution queue already taken"))?;

        self.scanner.start();
        let discovery = self.spawn_discovery_consumer(events);
        let execution = self.spawn_execution_consumer(queue_rx);
        self.consumers.push(discovery);
        self.consumers.push(execution);

        // Park until `shutdown` flips; the consumers own the work.
        let mut shutdown = self.shutdown.subscribe();
        let _ = shutdown.changed().await;
        Ok(())
    }

    /// Signal the root shutdown, stop the scanner (draining and closing
    /// the discovery channel), stop telemetry, and join the consumers.
    pub async fn shutdown(&mut self) {
        info!("orchestrator shutting down");
        let _ = self.shutdown.send(true);
        self.scanner.stop().await;
        if let Some(stop) = self.telemetry_stop.take() {
            let _ = stop.send(());
        }
        for handle in self.consumers.drain(..) {
            let _ = handle.await;
        }
        info!("orchestrator stopped");
    }

    fn spawn_discovery_consumer(
        &self,
        mut events: mpsc::Receiver<TokenFound>,
    ) -> JoinHandle<()> {
        let stages = self.eval.clone();
        let shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            info!("token processing pipeline started");
            let mut consumer_shutdown = shutdown.clone();
            loop {
                tokio::select! {
                    _ = consumer_shutdown.changed() => break,
                    event = events.recv() => {
                        let Some(token) = event else { break };
                        let stages = stages.clone();
                        let mut worker_shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = worker_shutdown.changed() => {
                                    debug!("token worker cancelled mid-pipeline");
                                }
                                _ = process_token(stages, token) => {}
                            }
                        });
                    }
                }
            }
            info!("token processing pipeline stopped");
        })
    }

    fn spawn_execution_consumer(
        &self,
        mut queue_rx: mpsc::Receiver<Candidate>,
    ) -> JoinHandle<()> {
        let stages = self.exec.clone();
        let shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            info!("execution processor started");
            let mut consumer_shutdown = shutdown.clone();
            loop {
                tokio::select! {
                    _ = consumer_shutdown.changed() => break,
                    candidate = queue_rx.recv() => {
                        let Some(candidate) = candidate else { break };
                        if !(stages.config.auto_execute
                            && candidate.decision.action == Action::Buy)
                        {
                            continue;
                        }
                        let stages = stages.clone();
                        let mut worker_shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = worker_shutdown.changed() => {
                                    debug!("execution worker cancelled");
                                }
                                _ = execute_candidate(stages, candidate) => {}
                            }
                        });
                    }
                }
            }
            info!("execution processor stopped");
        })
    }
}

/// Drive one token through prefilter → safety → off-chain → strategy →
/// listing. Sequential; every gate short-circuits the rest.
async fn process_token(stages: EvalStages, token: TokenFound) {
    let started = Instant::now();
    debug!(token = %token.token_address, chain = %token.chain, "processing token");
    stages.telemetry.record_token_found();

    let prefiltered = stages.prefilter.filter(token);
    stages.telemetry.record_token_filtered(prefiltered.dropped);
    if prefiltered.dropped {
        debug!(
            token = %prefiltered.token.token_address,
            reasons = ?prefiltered.reasons,
            "token dropped by pre-filter"
        );
        return;
    }

    let safety = match stages.safety.evaluate(&prefiltered).await {
        Ok(report) => report,
        Err(error) => {
            warn!(
                token = %prefiltered.token.token_address,
                %error,
                "safety evaluation failed, skipping token"
            );
            return;
        }
    };

    let is_honeypot = safety.honeypot_score >= stages.config.max_honeypot_score;
    let is_safe = stages.safety.can_trade(&safety);
    stages.telemetry.record_safety_check(is_honeypot, is_safe);
    if !is_safe {
        debug!(
            token = %safety.token_address,
            honeypot_score = format!("{:.2}", safety.honeypot_score),
            "token failed safety gate"
        );
        return;
    }

    let offchain = match stages.offchain.gather(&prefiltered).await {
        Ok(metrics) => metrics,
        Err(error) => {
            warn!(
                token = %prefiltered.token.token_address,
                %error,
                "off-chain gathering failed, skipping token"
            );
            return;
        }
    };

    let decision = stages.strategy.evaluate(&safety, &offchain, &prefiltered);
    stages.telemetry.record_evaluation();
    stages.telemetry.record_decision_latency(started.elapsed());

    match decision.action {
        Action::List | Action::Buy => {
            stages
                .listing
                .add_candidate(prefiltered.token, safety, offchain, decision);
            stages.telemetry.record_candidate_listed();
        }
        action => {
            debug!(
                token = %decision.token_address,
                %action,
                "decision below listing bar"
            );
        }
    }
}

/// Execute one queued candidate: daily-reset check, risk gate, optional
/// simulation, execution, then the status/accounting updates.
async fn execute_candidate(stages: ExecStages, candidate: Candidate) {
    let started = Instant::now();
    let address = candidate.token.token_address.clone();
    debug!(token = %address, "executing candidate");

    stages.risk.check_daily_reset();

    if let Err(rejection) = stages.risk.can_execute(&candidate.decision) {
        warn!(token = %address, reason = rejection.tag(), "execution blocked by risk manager");
        stages.listing.update_status(&address, CandidateStatus::Rejected);
        return;
    }

    if !stages.config.dry_run {
        let simulation = stages.executor.simulate(&candidate).await;
        let passed = match simulation {
            Ok(passed) => passed,
            Err(error) => {
                warn!(token = %address, %error, "simulation errored");
                false
            }
        };
        if !passed {
            stages.telemetry.record_simulation_failure();
            stages.listing.update_status(&address, CandidateStatus::Rejected);
            return;
        }
    }

    let result = stages.executor.execute(&candidate).await;
    stages.telemetry.record_execution_time(started.elapsed());

    match result {
        Ok(result) if result.status == ExecutionStatus::Confirmed => {
            info!(token = %address, tx = %result.tx_hash, "execution confirmed");
            stages.telemetry.record_execution(true, result.amount_usd);
            stages.risk.record_execution(&result);
            stages.listing.update_status(&address, CandidateStatus::Executed);
        }
        Ok(result) => {
            warn!(token = %address, status = %result.status, "execution did not confirm");
            stages.telemetry.record_execution(false, 0.0);
            stages.listing.update_status(&address, CandidateStatus::Failed);
        }
        Err(error) => {
            warn!(token = %address, %error, "execution failed");
            stages.telemetry.record_execution(false, 0.0);
            stages.listing.update_status(&address, CandidateStatus::Failed);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CexClient, DexClient, SocialClient};
    use crate::types::Chain;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;

    /// Emits one scripted batch, then nothing.
    struct OneShotDiscoverer {
        chain: Chain,
        tokens: Vec<TokenFound>,
    }

    #[async_trait]
    impl Discoverer for OneShotDiscoverer {
        fn chain(&self) -> Chain {
            self.chain
        }

        async fn discover(&mut self, cursor: u64) -> AnyResult<(Vec<TokenFound>, u64)> {
            Ok((std::mem::take(&mut self.tokens), cursor + 1))
        }
    }

    fn offline_gatherer(config: Arc<Config>) -> OffChainGatherer {
        OffChainGatherer::with_clients(
            config,
            DexClient::with_base_url("http://127.0.0.1:9"),
            CexClient::with_base_url("http://127.0.0.1:9", None),
            SocialClient::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9", None),
        )
    }

    fn test_stages(config: Config) -> (EvalStages, ExecStages) {
        let config = Arc::new(config);
        let orch = Orchestrator::with_parts(
            Arc::clone(&config),
            Vec::new(),
            offline_gatherer(Arc::clone(&config)),
        );
        (orch.eval.clone(), orch.exec.clone())
    }

    #[tokio::test]
    async fn test_blacklisted_token_short_circuits() {
        let (eval, _) = test_stages(Config {
            blacklisted_tokens: vec!["EvilMint".into()],
            ..Config::default()
        });

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "EvilMint")).await;

        // Dropped before safety: no safety check, no candidate.
        let metrics = eval.telemetry.snapshot();
        assert_eq!(metrics.tokens_found, 1);
        assert_eq!(metrics.tokens_dropped, 1);
        assert_eq!(metrics.safety_checks, 0);
        assert_eq!(eval.listing.candidate_count(), 0);
    }

    #[tokio::test]
    async fn test_skip_decision_not_listed() {
        // Clean but unremarkable token: offline metrics leave velocity
        // falling and win probability under the listing bar.
        let (eval, _) = test_stages(Config::default());

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "MehMint")).await;

        let metrics = eval.telemetry.snapshot();
        assert_eq!(metrics.safety_checks, 1);
        assert_eq!(metrics.evaluations, 1);
        assert_eq!(metrics.candidates_listed, 0);
        assert_eq!(eval.listing.candidate_count(), 0);
    }

    #[tokio::test]
    async fn test_whitelisted_token_gets_listed() {
        // Whitelisting lifts priority to high, which pushes the score
        // over the threshold even with zeroed off-chain data.
        let (eval, _) = test_stages(Config {
            whitelisted_tokens: vec!["GoodMint".into()],
            auto_execute: true,
            ..Config::default()
        });

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "GoodMint")).await;

        assert_eq!(eval.listing.candidate_count(), 1);
        let candidate = eval.listing.get_candidate("GoodMint").unwrap();
        assert_eq!(candidate.status, CandidateStatus::Pending);
        assert_eq!(candidate.decision.action, Action::Buy);
        assert_eq!(eval.telemetry.snapshot().candidates_listed, 1);
    }

    #[tokio::test]
    async fn test_execute_candidate_dry_run_happy_path() {
        let (eval, exec) = test_stages(Config {
            whitelisted_tokens: vec!["GoodMint".into()],
            auto_execute: true,
            dry_run: true,
            ..Config::default()
        });

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "GoodMint")).await;
        let candidate = eval.listing.get_candidate("GoodMint").unwrap();

        execute_candidate(exec.clone(), candidate).await;

        let stored = exec.listing.get_candidate("GoodMint").unwrap();
        assert_eq!(stored.status, CandidateStatus::Executed);
        // Dry-run execution still feeds exposure accounting.
        assert!((exec.risk.get_status().current_exposure - 100.0).abs() < 1e-10);
        let metrics = exec.telemetry.snapshot();
        assert_eq!(metrics.execution_success, 1);
        assert!((metrics.total_invested - 100.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_execute_candidate_risk_rejection_updates_status() {
        let (eval, exec) = test_stages(Config {
            whitelisted_tokens: vec!["GoodMint".into()],
            auto_execute: true,
            // Tiny balance: min position of $100 exceeds the single
            // position cap ($1), so the risk gate rejects.
            account_balance: 100.0,
            ..Config::default()
        });

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "GoodMint")).await;
        let candidate = eval.listing.get_candidate("GoodMint").unwrap();

        execute_candidate(exec.clone(), candidate).await;

        let stored = exec.listing.get_candidate("GoodMint").unwrap();
        assert_eq!(stored.status, CandidateStatus::Rejected);
        assert_eq!(exec.telemetry.snapshot().trades_executed, 0);
        assert!((exec.risk.get_status().current_exposure - 0.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_halted_risk_manager_rejects_candidate() {
        let (eval, exec) = test_stages(Config {
            whitelisted_tokens: vec!["GoodMint".into()],
            auto_execute: true,
            daily_loss_limit: 100.0,
            ..Config::default()
        });
        exec.risk.record_profit("Other", -150.0);

        process_token(eval.clone(), TokenFound::sample(Chain::Solana, "GoodMint")).await;
        let candidate = eval.listing.get_candidate("GoodMint").unwrap();
        execute_candidate(exec.clone(), candidate).await;

        assert_eq!(
            exec.listing.get_candidate("GoodMint").unwrap().status,
            CandidateStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_full_pipeline_through_run_loop() {
        let config = Arc::new(Config {
            whitelisted_tokens: vec!["GoodMint".into()],
            blacklisted_tokens: vec!["EvilMint".into()],
            auto_execute: true,
            dry_run: true,
            scan_interval_solana: Duration::from_millis(10),
            scan_interval_base: Duration::from_millis(10),
            ..Config::default()
        });

        let discoverer = OneShotDiscoverer {
            chain: Chain::Solana,
            tokens: vec![
                TokenFound::sample(Chain::Solana, "GoodMint"),
                TokenFound::sample(Chain::Solana, "EvilMint"),
            ],
        };
        let mut orchestrator = Orchestrator::with_parts(
            Arc::clone(&config),
            vec![Box::new(discoverer)],
            offline_gatherer(Arc::clone(&config)),
        );
        let listing = orchestrator.listing();
        let risk = orchestrator.risk();
        let telemetry = orchestrator.telemetry();

        // Drive the run loop until the candidate executes (or timeout).
        tokio::select! {
            result = orchestrator.run() => {
                result.unwrap();
            }
            _ = async {
                for _ in 0..200 {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if listing
                        .get_candidate("GoodMint")
                        .map(|c| c.status == CandidateStatus::Executed)
                        .unwrap_or(false)
                    {
                        break;
                    }
                }
            } => {}
        }
        orchestrator.shutdown().await;

        let executed = listing.get_candidate("GoodMint").unwrap();
        assert_eq!(executed.status, CandidateStatus::Executed);
        // The blacklisted token never became a candidate.
        assert!(listing.get_candidate("EvilMint").is_none());
        assert!((risk.get_status().current_exposure - 100.0).abs() < 1e-10);

        let metrics = telemetry.snapshot();
        assert_eq!(metrics.tokens_found, 2);
        assert_eq!(metrics.tokens_dropped, 1);
        assert_eq!(metrics.execution_success, 1);
    }
}
