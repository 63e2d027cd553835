//! Ballot numbers ("TIDs"): `(n, proposer_id)` pairs.
//!
//! Kept as a structured type internally, serialized to the wire form
//! `"<n>:<proposer_id>"` only at message boundaries.

use std::fmt;
use std::str::FromStr;

/// A Paxos ballot number. Ordering compares `n` only; `proposer_id` breaks
/// no ties, so two ballots with the same `n` and different proposers are
/// `Equal` under `Ord` but not `eq` under `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ballot {
    pub n: u64,
    pub proposer_id: String,
}

impl Ballot {
    pub fn new(n: u64, proposer_id: impl Into<String>) -> Self {
        Ballot {
            n,
            proposer_id: proposer_id.into(),
        }
    }
}

impl PartialOrd for Ballot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ballot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.n.cmp(&other.n)
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.n, self.proposer_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotParseError(pub String);

impl fmt::Display for BallotParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ballot id: {}", self.0)
    }
}

impl std::error::Error for BallotParseError {}

impl FromStr for Ballot {
    type Err = BallotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (n_str, proposer_id) = s
            .split_once(':')
            .ok_or_else(|| BallotParseError(s.to_string()))?;
        let n = n_str
            .parse::<u64>()
            .map_err(|_| BallotParseError(s.to_string()))?;
        Ok(Ballot {
            n,
            proposer_id: proposer_id.to_string(),
        })
    }
}

/// Extracts the numeric prefix from a TID string, defaulting to 0 on any
/// parse failure. Used to pool `n`s out of a batch of conflict responses
/// without rejecting a malformed one outright.
pub fn n_of(tid: &str) -> u64 {
    tid.split(':').next().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Parses a wire-form TID leniently: a missing or unparseable numeric
/// prefix defaults to `n = 0` rather than failing, so a boundary that
/// must tolerate garbage input can still get a `Ballot` back instead of
/// an `Err` to handle.
pub fn parse_lenient(tid: &str) -> Ballot {
    match tid.split_once(':') {
        Some((n_str, proposer_id)) => Ballot::new(n_str.parse().unwrap_or(0), proposer_id),
        None => Ballot::new(0, tid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_format() {
        crate::test_support::init_logging();
        let b = Ballot::new(7, "proposer-a");
        assert_eq!(b.to_string(), "7:proposer-a");
    }

    #[test]
    fn parse_round_trips() {
        let b: Ballot = "12:proposer-b".parse().unwrap();
        assert_eq!(b, Ballot::new(12, "proposer-b"));
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!("not-a-ballot".parse::<Ballot>().is_err());
    }

    #[test]
    fn ordering_compares_n_only() {
        let a = Ballot::new(5, "x");
        let b = Ballot::new(5, "y");
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
        assert_ne!(a, b);
        assert!(Ballot::new(4, "x") < Ballot::new(5, "x"));
    }

    #[test]
    fn n_of_defaults_to_zero_on_garbage() {
        assert_eq!(n_of("garbage"), 0);
        assert_eq!(n_of("9:proposer-c"), 9);
        assert_eq!(n_of(""), 0);
    }

    #[test]
    fn parse_lenient_matches_strict_parse_on_valid_input() {
        assert_eq!(parse_lenient("12:proposer-b"), Ballot::new(12, "proposer-b"));
    }

    #[test]
    fn parse_lenient_defaults_n_to_zero_on_garbage() {
        assert_eq!(parse_lenient("garbage"), Ballot::new(0, "garbage"));
        assert_eq!(parse_lenient("x:proposer-a"), Ballot::new(0, "proposer-a"));
    }
}
