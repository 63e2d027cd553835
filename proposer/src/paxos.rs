//! Ballot minting, bump-on-conflict and value adoption: the pure
//! decision logic behind a Proposer's consensus round, kept free of
//! networking so it's unit-testable without an HTTP server.

use chrono::Utc;
use paxos_core::wire::PromiseResponse;
use paxos_core::{n_of, Ballot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Mints strictly increasing ballot `n`s for one Proposer. Seeded from a
/// wall-clock millisecond reading so collisions across restarts of the
/// same `proposer_id` are improbable.
pub struct BallotMinter {
    counter: AtomicU64,
    proposer_id: String,
}

impl BallotMinter {
    pub fn new(proposer_id: impl Into<String>) -> Self {
        BallotMinter {
            counter: AtomicU64::new(Utc::now().timestamp_millis().max(0) as u64),
            proposer_id: proposer_id.into(),
        }
    }

    /// Mints the next ballot: `n := ++local_counter`.
    pub fn next(&self) -> Ballot {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ballot::new(n, self.proposer_id.clone())
    }

    /// Bump-on-conflict: `new_n := highest_seen_n + 1`,
    /// `local_counter := max(local_counter, new_n)`, preserving this
    /// Proposer's own suffix in the returned ballot.
    pub fn bump(&self, highest_seen_n: u64) -> Ballot {
        let new_n = highest_seen_n + 1;
        self.counter.fetch_max(new_n, Ordering::SeqCst);
        let n = self.counter.load(Ordering::SeqCst);
        Ballot::new(n, self.proposer_id.clone())
    }
}

/// Computes `highest_seen_n` from a batch of candidate TID strings (the
/// `tid_in_use`/`tid`/`accepted_id` fields pooled from a round's
/// responses), defaulting to 0 when none carry a parseable ballot.
pub fn highest_seen_n<'a>(tids: impl Iterator<Item = Option<&'a str>>) -> u64 {
    tids.flatten().map(n_of).max().unwrap_or(0)
}

/// Value adoption: among the received promises, the
/// one with the highest `accepted_id.n` that also carries a non-null
/// `accepted_value`. Returns `None` when no promise carried a prior
/// accepted value, in which case the Proposer's own transaction stands.
pub fn highest_adopted_value(promises: &[PromiseResponse]) -> Option<&PromiseResponse> {
    promises
        .iter()
        .filter(|p| p.accepted_id.is_some() && p.accepted_value.is_some())
        .max_by_key(|p| n_of(p.accepted_id.as_deref().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paxos_core::Transaction;

    #[test]
    fn next_mints_strictly_increasing_ballots() {
        let minter = BallotMinter::new("p1");
        let a = minter.next();
        let b = minter.next();
        assert!(b.n > a.n);
        assert_eq!(a.proposer_id, "p1");
    }

    #[test]
    fn bump_jumps_past_highest_seen() {
        let minter = BallotMinter::new("p1");
        minter.next(); // whatever the seed is
        let bumped = minter.bump(99);
        assert_eq!(bumped.n, 100);
        assert_eq!(bumped.proposer_id, "p1");
    }

    #[test]
    fn bump_never_goes_backwards() {
        let minter = BallotMinter::new("p1");
        let first = minter.bump(50);
        let second = minter.bump(10); // a stale, lower conflict report
        assert!(second.n >= first.n);
    }

    #[test]
    fn highest_seen_n_ignores_missing_and_unparseable() {
        let tids = vec![Some("7:p2"), None, Some("garbage"), Some("12:p3")];
        assert_eq!(highest_seen_n(tids.into_iter()), 12);
    }

    #[test]
    fn highest_seen_n_defaults_to_zero() {
        let tids: Vec<Option<&str>> = vec![None, None];
        assert_eq!(highest_seen_n(tids.into_iter()), 0);
    }

    fn tx(id: u64) -> Transaction {
        Transaction {
            client_id: "c1".into(),
            request_id: id,
            timestamp: 0,
            value: format!("V{id}"),
        }
    }

    #[test]
    fn adopts_the_highest_numbered_prior_value() {
        let promises = vec![
            PromiseResponse {
                kind: "promise".into(),
                tid_in_use: Some("10:p1".into()),
                accepted_id: Some("6:p2".into()),
                accepted_value: Some(tx(1)),
            },
            PromiseResponse {
                kind: "promise".into(),
                tid_in_use: Some("10:p1".into()),
                accepted_id: Some("8:p3".into()),
                accepted_value: Some(tx(2)),
            },
        ];

        let adopted = highest_adopted_value(&promises).unwrap();
        assert_eq!(adopted.accepted_value.as_ref().unwrap().request_id, 2);
    }

    #[test]
    fn no_adoption_when_no_promise_carries_a_prior_value() {
        let promises = vec![PromiseResponse {
            kind: "promise".into(),
            tid_in_use: Some("10:p1".into()),
            accepted_id: None,
            accepted_value: None,
        }];
        assert!(highest_adopted_value(&promises).is_none());
    }
}
