//! Per-TID vote tally, deduped by `acceptor_id` so a retried `/learn`
//! notification can't double-count a vote.

use paxos_core::Transaction;
use std::collections::{HashMap, HashSet};

struct TallyEntry {
    yes_voters: HashSet<String>,
    no_voters: HashSet<String>,
    transaction: Option<Transaction>,
    notified: bool,
}

impl TallyEntry {
    fn new() -> Self {
        TallyEntry {
            yes_voters: HashSet::new(),
            no_voters: HashSet::new(),
            transaction: None,
            notified: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TallyDecision {
    /// Quorum not yet reached, or already notified for this TID; the
    /// idempotence guard short-circuits before a second decision.
    Pending,
    Committed,
    Rejected,
}

pub struct LearnerState {
    tallies: HashMap<String, TallyEntry>,
    quorum: usize,
}

impl LearnerState {
    pub fn new(quorum: usize) -> Self {
        LearnerState {
            tallies: HashMap::new(),
            quorum,
        }
    }

    /// Records one Acceptor's vote for `proposal_id` and returns the
    /// decision this vote causes. The returned `Transaction` (when
    /// present) is the one the caller should deliver in a COMMITTED or
    /// REJECTED commit notification.
    pub fn record_vote(
        &mut self,
        acceptor_id: &str,
        proposal_id: &str,
        accepted: bool,
        transaction: Transaction,
    ) -> (TallyDecision, Transaction) {
        let entry = self
            .tallies
            .entry(proposal_id.to_string())
            .or_insert_with(TallyEntry::new);

        // Every Acceptor that accepted this TID accepted the same value,
        // so overwriting on every vote is safe.
        entry.transaction = Some(transaction.clone());

        if accepted {
            entry.yes_voters.insert(acceptor_id.to_string());
        } else {
            entry.no_voters.insert(acceptor_id.to_string());
        }

        if entry.notified {
            return (TallyDecision::Pending, transaction);
        }

        if entry.yes_voters.len() >= self.quorum {
            entry.notified = true;
            (TallyDecision::Committed, transaction)
        } else if entry.no_voters.len() >= self.quorum {
            entry.notified = true;
            (TallyDecision::Rejected, transaction)
        } else {
            (TallyDecision::Pending, transaction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        Transaction {
            client_id: "client-1".into(),
            request_id: 1,
            timestamp: 0,
            value: "WRITE".into(),
        }
    }

    #[test]
    fn pending_below_quorum() {
        let mut s = LearnerState::new(2);
        let (decision, _) = s.record_vote("a1", "1:p1", true, tx());
        assert_eq!(decision, TallyDecision::Pending);
    }

    #[test]
    fn commits_at_quorum() {
        let mut s = LearnerState::new(2);
        s.record_vote("a1", "1:p1", true, tx());
        let (decision, _) = s.record_vote("a2", "1:p1", true, tx());
        assert_eq!(decision, TallyDecision::Committed);
    }

    #[test]
    fn rejects_at_quorum_of_no_votes() {
        let mut s = LearnerState::new(2);
        s.record_vote("a1", "1:p1", false, tx());
        let (decision, _) = s.record_vote("a2", "1:p1", false, tx());
        assert_eq!(decision, TallyDecision::Rejected);
    }

    #[test]
    fn duplicate_acceptor_vote_does_not_double_count() {
        let mut s = LearnerState::new(2);
        s.record_vote("a1", "1:p1", true, tx());
        s.record_vote("a1", "1:p1", true, tx()); // retried notification
        let (decision, _) = s.record_vote("a1", "1:p1", true, tx()); // still just a1
        assert_eq!(decision, TallyDecision::Pending, "a single acceptor can never reach quorum alone");

        let (decision, _) = s.record_vote("a2", "1:p1", true, tx());
        assert_eq!(decision, TallyDecision::Committed);
    }

    #[test]
    fn notified_is_at_most_once() {
        let mut s = LearnerState::new(2);
        s.record_vote("a1", "1:p1", true, tx());
        let (first, _) = s.record_vote("a2", "1:p1", true, tx());
        assert_eq!(first, TallyDecision::Committed);

        let (second, _) = s.record_vote("a3", "1:p1", true, tx());
        assert_eq!(second, TallyDecision::Pending, "already notified, no second commit");
    }

    #[test]
    fn distinct_tids_are_independent() {
        let mut s = LearnerState::new(2);
        s.record_vote("a1", "1:p1", true, tx());
        s.record_vote("a1", "2:p2", true, tx());
        let (decision, _) = s.record_vote("a2", "2:p2", true, tx());
        assert_eq!(decision, TallyDecision::Committed);
    }
}
