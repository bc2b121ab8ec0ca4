// src/services/nonce_ledger.rs
//! Replay protection: the ledger of consumed (DID, nonce) pairs.
//!
//! Each identity-proof nonce may be accepted exactly once. Records are kept
//! for the configured retention window (longer than the timestamp freshness
//! window) and then swept. Sweeps are opportunistic: an atomic last-sweep
//! stamp gates them, so the request path pays at most an amortized O(1)
//! check and no dedicated timer is needed.
//!
//! The ledger is sharded by DID hash. Concurrent record/sweep operations on
//! the same identity serialize on one shard lock; a sweep releases each
//! shard before touching the next, so it never holds the whole ledger.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

const SHARD_COUNT: usize = 16;

type Shard = HashMap<String, HashMap<String, DateTime<Utc>>>;

/// Tracks which one-time nonce values have been consumed, per identity.
pub struct NonceLedger {
    shards: Vec<Mutex<Shard>>,
    retention: Duration,
    sweep_interval: Duration,
    /// Unix seconds of the last sweep; gate for `maybe_sweep`.
    last_sweep: AtomicI64,
}

impl NonceLedger {
    /// Creates a ledger.
    ///
    /// # Arguments
    /// * `retention` - how long a consumed nonce stays recorded; must exceed
    ///   the timestamp freshness window (validated at the config layer)
    /// * `sweep_interval` - minimum time between opportunistic sweeps
    pub fn new(retention: Duration, sweep_interval: Duration) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(Shard::new())).collect();
        NonceLedger {
            shards,
            retention,
            sweep_interval,
            last_sweep: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    fn shard_for(&self, did: &str) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        did.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Atomically records a (DID, nonce) pair if it has not been seen.
    ///
    /// # Returns
    /// `true` if the pair was unseen and is now recorded; `false` if it was
    /// already present (the caller must reject the request). The
    /// test-and-set happens under one shard lock, so two concurrent requests
    /// presenting the same pair cannot both observe `true`.
    pub fn record_if_new(&self, did: &str, nonce: &str, now: DateTime<Utc>) -> bool {
        let mut shard = self.shard_for(did).lock().unwrap();
        let per_did = shard.entry(did.to_string()).or_default();
        if per_did.contains_key(nonce) {
            log::warn!("Nonce {} has already been used for DID {}", nonce, did);
            return false;
        }
        per_did.insert(nonce.to_string(), now);
        true
    }

    /// Removes entries older than the retention window.
    ///
    /// Locks one shard at a time; identities whose nonces have all expired
    /// are dropped entirely so memory stays bounded per identity.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut cleaned = 0usize;
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap();
            for nonces in shard.values_mut() {
                let before = nonces.len();
                nonces.retain(|_, issued_at| now - *issued_at <= self.retention);
                cleaned += before - nonces.len();
            }
            shard.retain(|_, nonces| !nonces.is_empty());
        }
        if cleaned > 0 {
            log::info!("Cleaned up {} expired nonces", cleaned);
        }
    }

    /// Sweeps if more than the sweep interval has elapsed since the last
    /// sweep. The compare-exchange on the stamp ensures only one caller
    /// performs the sweep per interval.
    pub fn maybe_sweep(&self, now: DateTime<Utc>) {
        let last = self.last_sweep.load(Ordering::Acquire);
        if now.timestamp() - last <= self.sweep_interval.num_seconds() {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now.timestamp(), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ledger() -> NonceLedger {
        NonceLedger::new(Duration::minutes(6), Duration::seconds(60))
    }

    #[test]
    fn second_record_of_same_pair_is_rejected() {
        let ledger = ledger();
        let now = Utc::now();
        assert!(ledger.record_if_new("did:wba:a", "n1", now));
        assert!(!ledger.record_if_new("did:wba:a", "n1", now));
        // Same nonce under a different DID is a distinct pair.
        assert!(ledger.record_if_new("did:wba:b", "n1", now));
    }

    #[test]
    fn nonce_slot_frees_after_retention_and_sweep() {
        let ledger = ledger();
        let t0 = Utc::now();
        assert!(ledger.record_if_new("did:wba:a", "n1", t0));
        assert!(!ledger.record_if_new("did:wba:a", "n1", t0));

        // One second short of retention: still recorded.
        let t1 = t0 + Duration::minutes(6);
        ledger.sweep(t1);
        assert!(!ledger.record_if_new("did:wba:a", "n1", t1));

        // Past retention: swept, the pair may be recorded again.
        let t2 = t0 + Duration::minutes(6) + Duration::seconds(1);
        ledger.sweep(t2);
        assert!(ledger.record_if_new("did:wba:a", "n1", t2));
    }

    #[test]
    fn maybe_sweep_respects_the_interval() {
        let ledger = ledger();
        let t0 = Utc::now();
        assert!(ledger.record_if_new("did:wba:a", "n1", t0 - Duration::minutes(10)));

        // Within the interval since construction: no sweep happens.
        ledger.maybe_sweep(t0 + Duration::seconds(30));
        assert!(!ledger.record_if_new("did:wba:a", "n1", t0));

        // Past the interval: the stale entry is swept out.
        ledger.maybe_sweep(t0 + Duration::seconds(61));
        assert!(ledger.record_if_new("did:wba:a", "n1", t0));
    }

    #[test]
    fn concurrent_consumption_admits_exactly_one() {
        let ledger = Arc::new(ledger());
        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                ledger.record_if_new("did:wba:a", "contended", now)
            }));
        }
        let accepted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
