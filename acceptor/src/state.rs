//! Acceptor state machine: the `(highest_promised, accepted_id,
//! accepted_value)` tuple, and the pure Prepare/Accept transition logic,
//! kept free of any HTTP or networking concern so it is unit-testable on
//! its own. Ballots are held as structured `Ballot` values and only
//! rendered to the wire string at the edges of this type.

use paxos_core::{Ballot, Transaction};

#[derive(Debug, Default)]
pub struct AcceptorState {
    highest_promised: Option<Ballot>,
    accepted: Option<(Ballot, Transaction)>,
}

pub struct PrepareOutcome {
    pub promised: bool,
    pub tid_in_use: Option<String>,
    pub accepted_id: Option<String>,
    pub accepted_value: Option<Transaction>,
}

pub struct AcceptOutcome {
    pub accepted: bool,
    pub tid_in_use: Option<String>,
}

impl AcceptorState {
    pub fn new() -> Self {
        Self::default()
    }

    fn highest_promised_n(&self) -> u64 {
        self.highest_promised.as_ref().map(|b| b.n).unwrap_or(0)
    }

    fn informational_fields(&self) -> (Option<String>, Option<String>, Option<Transaction>) {
        (
            self.highest_promised.as_ref().map(Ballot::to_string),
            self.accepted.as_ref().map(|(id, _)| id.to_string()),
            self.accepted.as_ref().map(|(_, value)| value.clone()),
        )
    }

    /// Promises on `n >= highest_promised_n`, not strict `>`: a retry
    /// with the same TID still gets promised.
    pub fn prepare(&mut self, proposal_id: &Ballot) -> PrepareOutcome {
        let promised = proposal_id.n >= self.highest_promised_n();

        if promised {
            self.highest_promised = Some(proposal_id.clone());
        }

        let (tid_in_use, accepted_id, accepted_value) = self.informational_fields();
        PrepareOutcome {
            promised,
            tid_in_use,
            accepted_id,
            accepted_value,
        }
    }

    /// `accepted_id`/`accepted_value` are retained (not zeroed) after a
    /// successful Accept, so a later Prepare can report them for adoption.
    pub fn accept(&mut self, proposal_id: &Ballot, transaction: Transaction) -> AcceptOutcome {
        if proposal_id.n >= self.highest_promised_n() {
            self.accepted = Some((proposal_id.clone(), transaction));
            self.highest_promised = Some(proposal_id.clone());

            AcceptOutcome {
                accepted: true,
                tid_in_use: None,
            }
        } else {
            AcceptOutcome {
                accepted: false,
                tid_in_use: self.highest_promised.as_ref().map(Ballot::to_string),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(s: &str) -> Ballot {
        s.parse().unwrap()
    }

    fn tx(request_id: u64) -> Transaction {
        Transaction {
            client_id: "client-1".into(),
            request_id,
            timestamp: 0,
            value: "WRITE".into(),
        }
    }

    #[test]
    fn starts_unpromised() {
        let mut s = AcceptorState::new();
        let out = s.prepare(&ballot("1:p1"));
        assert!(out.promised);
        assert!(out.accepted_id.is_none());
    }

    #[test]
    fn equal_n_is_promised_not_rejected() {
        let mut s = AcceptorState::new();
        s.prepare(&ballot("5:p1"));
        let out = s.prepare(&ballot("5:p2"));
        assert!(out.promised, "n == highest_promised_n must be promised (>=, not >)");
    }

    #[test]
    fn lower_n_is_rejected_with_tid_in_use() {
        let mut s = AcceptorState::new();
        s.prepare(&ballot("7:p2"));
        let out = s.prepare(&ballot("5:p1"));
        assert!(!out.promised);
        assert_eq!(out.tid_in_use.as_deref(), Some("7:p2"));
    }

    #[test]
    fn accept_retains_state_for_future_prepares() {
        let mut s = AcceptorState::new();
        s.prepare(&ballot("6:p2"));
        let accepted = s.accept(&ballot("6:p2"), tx(1));
        assert!(accepted.accepted);

        // A later Prepare must see the value just accepted, so a
        // concurrent Proposer can adopt it.
        let promise = s.prepare(&ballot("10:p1"));
        assert_eq!(promise.accepted_id.as_deref(), Some("6:p2"));
        assert_eq!(promise.accepted_value.unwrap().request_id, 1);
    }

    #[test]
    fn accept_below_promised_is_rejected() {
        let mut s = AcceptorState::new();
        s.prepare(&ballot("9:p1"));
        let out = s.accept(&ballot("5:p2"), tx(2));
        assert!(!out.accepted);
        assert_eq!(out.tid_in_use.as_deref(), Some("9:p1"));
    }

    #[test]
    fn later_accept_overwrites_earlier_one() {
        let mut s = AcceptorState::new();
        s.prepare(&ballot("3:p1"));
        s.accept(&ballot("3:p1"), tx(1));
        s.prepare(&ballot("4:p2"));
        s.accept(&ballot("4:p2"), tx(2));

        let promise = s.prepare(&ballot("20:p3"));
        assert_eq!(promise.accepted_id.as_deref(), Some("4:p2"));
        assert_eq!(promise.accepted_value.unwrap().request_id, 2);
    }
}
