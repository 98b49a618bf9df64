//! Chain scanner — emits `TokenFound` events from both chains.
//!
//! One polling task per chain, each on its own tick interval, all
//! feeding one bounded discovery channel. Emission never blocks: when
//! the channel is full the event is dropped and counted, preserving
//! scanner liveness over completeness. Stop is deterministic — signal,
//! join both tasks, and the channel closes once the last task's sender
//! drops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::chains::Discoverer;
use crate::config::Config;
use crate::types::TokenFound;

/// Capacity of the discovery channel.
const DISCOVERY_BUFFER: usize = 100;

pub struct Scanner {
    config: Arc<Config>,
    discoverers: Vec<Box<dyn Discoverer>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    events_tx: Option<mpsc::Sender<TokenFound>>,
    events_rx: Option<mpsc::Receiver<TokenFound>>,
    dropped: Arc<AtomicU64>,
}

impl Scanner {
    pub fn new(config: Arc<Config>, discoverers: Vec<Box<dyn Discoverer>>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(DISCOVERY_BUFFER);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            discoverers,
            shutdown,
            tasks: Vec::new(),
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Take the consumer end of the discovery channel. The stream is
    /// infinite until `stop`; it cannot be taken twice.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TokenFound>> {
        self.events_rx.take()
    }

    /// Count of events dropped because the discovery channel was full.
    pub fn events_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spawn one polling task per discoverer. Idempotent: a second call
    /// is a no-op.
    pub fn start(&mut self) {
        let Some(events_tx) = self.events_tx.take() else {
            return;
        };

        info!(chains = self.discoverers.len(), "scanner starting");

        for mut discoverer in self.discoverers.drain(..) {
            let chain = discoverer.chain();
            let interval = self.config.scan_interval(chain);
            let tx = events_tx.clone();
            let mut shutdown = self.shutdown.subscribe();
            let dropped = Arc::clone(&self.dropped);

            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                let mut cursor = 0u64;
                info!(%chain, interval_ms = interval.as_millis() as u64, "chain scanner started");

                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = ticker.tick() => {
                            match discoverer.discover(cursor).await {
                                Ok((tokens, next_cursor)) => {
                                    cursor = next_cursor;
                                    for token in tokens {
                                        match tx.try_send(token) {
                                            Ok(()) => {}
                                            Err(TrySendError::Full(token)) => {
                                                dropped.fetch_add(1, Ordering::Relaxed);
                                                warn!(
                                                    %chain,
                                                    token = %token.token_address,
                                                    "discovery channel full, dropping event"
                                                );
                                            }
                                            // Consumer gone; nothing left to scan for.
                                            Err(TrySendError::Closed(_)) => return,
                                        }
                                    }
                                }
                                Err(error) => {
                                    warn!(%chain, %error, "discovery poll failed");
                                }
                            }
                        }
                    }
                }

                info!(%chain, "chain scanner stopped");
            });

            self.tasks.push(handle);
        }
        // The clones moved into the tasks now hold the only senders, so
        // the channel closes exactly when the last task exits.
        drop(events_tx);
    }

    /// Signal shutdown and join every polling task.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.tasks.drain(..) {
            let _ = handle.await;
        }
        let lost = self.events_dropped();
        if lost > 0 {
            warn!(lost, "scanner stopped with dropped discovery events");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chain;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Emits scripted batches, one per tick, then nothing.
    struct ScriptedDiscoverer {
        chain: Chain,
        batches: Vec<Vec<TokenFound>>,
    }

    impl ScriptedDiscoverer {
        fn new(chain: Chain, batches: Vec<Vec<TokenFound>>) -> Self {
            Self { chain, batches }
        }
    }

    #[async_trait]
    impl Discoverer for ScriptedDiscoverer {
        fn chain(&self) -> Chain {
            self.chain
        }

        async fn discover(&mut self, cursor: u64) -> Result<(Vec<TokenFound>, u64)> {
            if self.batches.is_empty() {
                return Ok((Vec::new(), cursor));
            }
            Ok((self.batches.remove(0), cursor + 1))
        }
    }

    /// Always fails; the scanner must keep ticking regardless.
    struct FailingDiscoverer;

    #[async_trait]
    impl Discoverer for FailingDiscoverer {
        fn chain(&self) -> Chain {
            Chain::Base
        }

        async fn discover(&mut self, _cursor: u64) -> Result<(Vec<TokenFound>, u64)> {
            anyhow::bail!("rpc unreachable")
        }
    }

    fn fast_config() -> Arc<Config> {
        Arc::new(Config {
            scan_interval_solana: Duration::from_millis(10),
            scan_interval_base: Duration::from_millis(10),
            ..Config::default()
        })
    }

    fn batch(chain: Chain, prefix: &str, count: usize) -> Vec<TokenFound> {
        (0..count)
            .map(|i| TokenFound::sample(chain, &format!("{prefix}-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_scanner_emits_discovered_tokens() {
        let discoverer =
            ScriptedDiscoverer::new(Chain::Solana, vec![batch(Chain::Solana, "mint", 3)]);
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(discoverer)]);
        let mut events = scanner.take_events().unwrap();

        scanner.start();
        let mut received = Vec::new();
        for _ in 0..3 {
            let token = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("timed out waiting for token")
                .expect("channel closed early");
            received.push(token);
        }
        scanner.stop().await;

        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|t| t.chain == Chain::Solana));
        assert_eq!(scanner.events_dropped(), 0);
    }

    #[tokio::test]
    async fn test_scanner_runs_both_chains() {
        let solana =
            ScriptedDiscoverer::new(Chain::Solana, vec![batch(Chain::Solana, "sol", 1)]);
        let base = ScriptedDiscoverer::new(Chain::Base, vec![batch(Chain::Base, "base", 1)]);
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(solana), Box::new(base)]);
        let mut events = scanner.take_events().unwrap();

        scanner.start();
        let mut chains = Vec::new();
        for _ in 0..2 {
            let token = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("timed out")
                .expect("closed early");
            chains.push(token.chain);
        }
        scanner.stop().await;

        assert!(chains.contains(&Chain::Solana));
        assert!(chains.contains(&Chain::Base));
    }

    #[tokio::test]
    async fn test_stop_closes_event_channel() {
        let discoverer = ScriptedDiscoverer::new(Chain::Solana, Vec::new());
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(discoverer)]);
        let mut events = scanner.take_events().unwrap();

        scanner.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        scanner.stop().await;

        // After the tasks join, the channel must read as closed.
        let end = tokio::time::timeout(Duration::from_secs(1), async {
            while events.recv().await.is_some() {}
        })
        .await;
        assert!(end.is_ok(), "channel did not close after stop");
    }

    #[tokio::test]
    async fn test_overflow_drops_and_counts() {
        // 150 tokens in one tick against a capacity-100 channel that
        // nobody drains: exactly 50 events must be counted as lost.
        let discoverer =
            ScriptedDiscoverer::new(Chain::Solana, vec![batch(Chain::Solana, "flood", 150)]);
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(discoverer)]);
        let mut events = scanner.take_events().unwrap();

        scanner.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        scanner.stop().await;

        assert_eq!(scanner.events_dropped(), 50);

        let mut delivered = 0;
        while let Ok(Some(_)) =
            tokio::time::timeout(Duration::from_millis(100), events.recv()).await
        {
            delivered += 1;
        }
        assert_eq!(delivered, 100);
    }

    #[tokio::test]
    async fn test_discovery_errors_do_not_kill_scanner() {
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(FailingDiscoverer)]);
        let _events = scanner.take_events().unwrap();

        scanner.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Still stoppable after repeated failures: the task is alive.
        scanner.stop().await;
        assert_eq!(scanner.events_dropped(), 0);
    }

    #[tokio::test]
    async fn test_events_cannot_be_taken_twice() {
        let mut scanner = Scanner::new(fast_config(), Vec::new());
        assert!(scanner.take_events().is_some());
        assert!(scanner.take_events().is_none());
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let discoverer = ScriptedDiscoverer::new(Chain::Solana, Vec::new());
        let mut scanner = Scanner::new(fast_config(), vec![Box::new(discoverer)]);
        let _events = scanner.take_events().unwrap();
        scanner.start();
        let tasks_after_first = scanner.tasks.len();
        scanner.start();
        assert_eq!(scanner.tasks.len(), tasks_after_first);
        scanner.stop().await;
    }
}
