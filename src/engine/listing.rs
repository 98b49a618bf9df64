//! Candidate listing — concurrent registry plus bounded execution queue.
//!
//! The registry maps token address to candidate under a read/write
//! lock; many snapshot readers, one writer. `add_candidate` is the sole
//! queue producer and the orchestrator's execution loop is the sole
//! consumer. A full queue keeps the candidate in the registry but skips
//! queueing — the registry is the source of truth, the queue is only a
//! work signal.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::{
    Candidate, CandidateStatus, Decision, OffChainMetrics, SafetyReport, TokenFound,
};

/// Capacity of the execution queue.
const EXECUTION_QUEUE_CAPACITY: usize = 100;

pub struct Listing {
    candidates: RwLock<HashMap<String, Candidate>>,
    queue_tx: mpsc::Sender<Candidate>,
}

impl Listing {
    /// Build a listing with the default queue capacity. Returns the
    /// store and the consumer end of the execution queue.
    pub fn new() -> (Self, mpsc::Receiver<Candidate>) {
        Self::with_queue_capacity(EXECUTION_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(capacity: usize) -> (Self, mpsc::Receiver<Candidate>) {
        let (queue_tx, queue_rx) = mpsc::channel(capacity);
        (
            Self {
                candidates: RwLock::new(HashMap::new()),
                queue_tx,
            },
            queue_rx,
        )
    }

    /// Insert a PENDING candidate (overwriting any earlier sighting of
    /// the same address) and offer it to the execution queue.
    pub fn add_candidate(
        &self,
        token: TokenFound,
        safety: SafetyReport,
        offchain: OffChainMetrics,
        decision: Decision,
    ) -> Candidate {
        let candidate = Candidate {
            token,
            safety,
            offchain,
            decision,
            listed_at: Utc::now(),
            status: CandidateStatus::Pending,
        };

        {
            let mut candidates = self.candidates.write().unwrap();
            candidates.insert(candidate.token.token_address.clone(), candidate.clone());
        }

        info!(
            token = %candidate.token.token_address,
            win_probability = format!("{:.2}", candidate.decision.win_probability),
            action = %candidate.decision.action,
            "candidate listed"
        );

        if let Err(mpsc::error::TrySendError::Full(candidate)) =
            self.queue_tx.try_send(candidate.clone())
        {
            warn!(
                token = %candidate.token.token_address,
                "execution queue full, candidate kept in registry but not queued"
            );
        }

        candidate
    }

    pub fn get_candidate(&self, token_address: &str) -> Option<Candidate> {
        self.candidates.read().unwrap().get(token_address).cloned()
    }

    pub fn all_candidates(&self) -> Vec<Candidate> {
        self.candidates.read().unwrap().values().cloned().collect()
    }

    pub fn pending_candidates(&self) -> Vec<Candidate> {
        self.candidates
            .read()
            .unwrap()
            .values()
            .filter(|c| c.status == CandidateStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.read().unwrap().len()
    }

    /// Single mutator for candidate status. Transitions are forward-only;
    /// an illegal transition (or unknown address) is logged and ignored.
    pub fn update_status(&self, token_address: &str, status: CandidateStatus) {
        let mut candidates = self.candidates.write().unwrap();
        match candidates.get_mut(token_address) {
            Some(candidate) if candidate.status.can_progress_to(status) => {
                candidate.status = status;
                info!(token = %token_address, status = %status, "candidate status updated");
            }
            Some(candidate) => {
                warn!(
                    token = %token_address,
                    from = %candidate.status,
                    to = %status,
                    "illegal status transition ignored"
                );
            }
            None => {
                warn!(token = %token_address, "status update for unknown candidate");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Action, Chain, Confidence, OwnerControls, SimulatedSell, Velocity,
    };
    use std::collections::HashMap;

    fn make_parts(address: &str) -> (TokenFound, SafetyReport, OffChainMetrics, Decision) {
        let token = TokenFound::sample(Chain::Solana, address);
        let safety = SafetyReport {
            token_address: address.into(),
            chain: Chain::Solana,
            can_buy: true,
            can_sell: true,
            honeypot_score: 0.05,
            liquidity_locked: true,
            owner_controls: OwnerControls::default(),
            simulated_sell: SimulatedSell::default(),
            reasons: Vec::new(),
            evaluated_at: Utc::now(),
        };
        let offchain = OffChainMetrics {
            token_address: address.into(),
            volume_24h_cex: 0.0,
            volume_24h_dex: 0.0,
            price_cex: 0.0,
            price_dex: 0.0,
            market_cap: 0.0,
            social_mentions: HashMap::new(),
            velocity: Velocity::Stable,
            evaluated_at: Utc::now(),
        };
        let decision = Decision {
            token_address: address.into(),
            chain: Chain::Solana,
            win_probability: 0.9,
            expected_roi: 0.3,
            expected_roi_std: 0.25,
            confidence: Confidence::High,
            action: Action::Buy,
            suggested_amount_usd: 100.0,
            stop_loss_pct: 0.2,
            take_profit_pct: 0.45,
            time_horizon_minutes: 60,
            rationale: Vec::new(),
            evaluated_at: Utc::now(),
        };
        (token, safety, offchain, decision)
    }

    fn add(listing: &Listing, address: &str) -> Candidate {
        let (token, safety, offchain, decision) = make_parts(address);
        listing.add_candidate(token, safety, offchain, decision)
    }

    #[test]
    fn test_add_candidate_inserts_pending() {
        let (listing, _rx) = Listing::new();
        let candidate = add(&listing, "Mint1");

        assert_eq!(candidate.status, CandidateStatus::Pending);
        assert_eq!(listing.candidate_count(), 1);
        let stored = listing.get_candidate("Mint1").unwrap();
        assert_eq!(stored.status, CandidateStatus::Pending);
    }

    #[tokio::test]
    async fn test_add_candidate_queues_for_execution() {
        let (listing, mut rx) = Listing::new();
        add(&listing, "Mint1");

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.token.token_address, "Mint1");
    }

    #[test]
    fn test_duplicate_address_overwrites() {
        let (listing, _rx) = Listing::new();
        add(&listing, "Mint1");
        listing.update_status("Mint1", CandidateStatus::Executed);

        // Re-seen token replaces the old record, fresh and PENDING.
        add(&listing, "Mint1");
        assert_eq!(listing.candidate_count(), 1);
        assert_eq!(
            listing.get_candidate("Mint1").unwrap().status,
            CandidateStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_full_queue_keeps_candidate_in_registry() {
        let (listing, mut rx) = Listing::with_queue_capacity(1);
        add(&listing, "Mint1");
        add(&listing, "Mint2"); // queue full, registry insert still happens

        assert_eq!(listing.candidate_count(), 2);
        assert_eq!(rx.recv().await.unwrap().token.token_address, "Mint1");
        // Only one candidate ever made the queue.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_pending_candidates_filters_by_status() {
        let (listing, _rx) = Listing::new();
        add(&listing, "Mint1");
        add(&listing, "Mint2");
        listing.update_status("Mint1", CandidateStatus::Rejected);

        let pending = listing.pending_candidates();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].token.token_address, "Mint2");
        assert_eq!(listing.all_candidates().len(), 2);
    }

    #[test]
    fn test_update_status_forward_only() {
        let (listing, _rx) = Listing::new();
        add(&listing, "Mint1");

        listing.update_status("Mint1", CandidateStatus::Executed);
        assert_eq!(
            listing.get_candidate("Mint1").unwrap().status,
            CandidateStatus::Executed
        );

        // Terminal state never regresses.
        listing.update_status("Mint1", CandidateStatus::Pending);
        listing.update_status("Mint1", CandidateStatus::Rejected);
        assert_eq!(
            listing.get_candidate("Mint1").unwrap().status,
            CandidateStatus::Executed
        );
    }

    #[test]
    fn test_update_status_unknown_address_is_ignored() {
        let (listing, _rx) = Listing::new();
        listing.update_status("Nobody", CandidateStatus::Rejected);
        assert_eq!(listing.candidate_count(), 0);
    }

    #[test]
    fn test_get_candidate_missing() {
        let (listing, _rx) = Listing::new();
        assert!(listing.get_candidate("Mint1").is_none());
    }
}
