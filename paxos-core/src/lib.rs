//! Shared types and ambient stack for the Paxos cluster's four roles:
//! ballots, transactions, env-var configuration, structured logging,
//! Prometheus-style metrics and an HTTP client helper.

pub mod ballot;
pub mod config;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod transaction;
pub mod wire;

pub use ballot::{n_of, Ballot};
pub use transaction::Transaction;

/// Shared once-only logger init for this crate's own test modules, so
/// repeated `#[test]` functions don't re-initialize the global
/// subscriber.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub(crate) fn init_logging() {
        INIT.call_once(|| {
            crate::logger::init_test();
        });
    }
}
