//! Environment-variable configuration: comma-separated lists, trimmed,
//! blanks dropped, with a default used only when the variable is unset.

use std::env;

/// Reads a comma-separated list from an environment variable, falling
/// back to `default` (also comma-separated) when the variable is unset.
pub fn load_urls_from_env(var: &str, default: &str) -> Vec<String> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn env_string(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

pub fn env_u16(var: &str, default: u16) -> u16 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn env_f64(var: &str, default: f64) -> f64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// The per-instance identifier used as `proposer_id`/`acceptor_id` and,
/// for clients, as the hostname in the commit callback URL.
pub fn node_id() -> String {
    env_string("HOSTNAME", "node")
}

pub struct AcceptorConfig {
    pub port: u16,
    pub acceptor_id: String,
    pub learner_urls: Vec<String>,
}

impl AcceptorConfig {
    pub fn from_env() -> Self {
        AcceptorConfig {
            port: env_u16("PORT", 8000),
            acceptor_id: node_id(),
            learner_urls: load_urls_from_env(
                "LEARNER_URLS",
                "http://learner1:8200/learn,http://learner2:8200/learn",
            ),
        }
    }
}

pub struct ProposerConfig {
    pub port: u16,
    pub proposer_id: String,
    pub acceptor_urls: Vec<String>,
    pub learner_urls: Vec<String>,
    pub backoff_min: f64,
    pub backoff_max: f64,
}

impl ProposerConfig {
    pub fn from_env() -> Self {
        ProposerConfig {
            port: env_u16("PORT", 9000),
            proposer_id: node_id(),
            acceptor_urls: load_urls_from_env(
                "ACCEPTOR_URLS",
                "http://acceptor1:8000,http://acceptor2:8000,http://acceptor3:8000",
            ),
            learner_urls: load_urls_from_env(
                "LEARNER_URLS",
                "http://learner1:8200/learn,http://learner2:8200/learn",
            ),
            backoff_min: env_f64("PROPOSER_BASE_BACKOFF_MIN", 1.0),
            backoff_max: env_f64("PROPOSER_BASE_BACKOFF_MAX", 5.0),
        }
    }

    /// `MAJORITY := floor(|Acceptors| / 2) + 1`, computed once at startup.
    pub fn majority(&self) -> usize {
        majority_of(self.acceptor_urls.len())
    }
}

pub fn majority_of(acceptor_count: usize) -> usize {
    if acceptor_count == 0 {
        2
    } else {
        acceptor_count / 2 + 1
    }
}

pub struct LearnerConfig {
    pub port: u16,
    pub learner_id: String,
    /// Acceptor URLs, consulted only for their count: the Learner's
    /// quorum must be kept consistent with the Acceptor cluster size,
    /// so it reads the same `ACCEPTOR_URLS`
    /// variable the Proposer does rather than carrying its own count.
    pub acceptor_urls: Vec<String>,
}

impl LearnerConfig {
    pub fn from_env() -> Self {
        LearnerConfig {
            port: env_u16("PORT", 8200),
            learner_id: node_id(),
            acceptor_urls: load_urls_from_env(
                "ACCEPTOR_URLS",
                "http://acceptor1:8000,http://acceptor2:8000,http://acceptor3:8000",
            ),
        }
    }

    pub fn quorum(&self) -> usize {
        majority_of(self.acceptor_urls.len())
    }
}

pub struct ClientConfig {
    pub port: u16,
    pub client_id: String,
    pub proposer_urls: Vec<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        ClientConfig {
            port: env_u16("PORT", 5000),
            client_id: node_id(),
            proposer_urls: load_urls_from_env(
                "PROPOSER_URLS",
                "http://proposer1:9000/propose,http://proposer2:9000/propose",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_list_trims_and_drops_blanks() {
        crate::test_support::init_logging();
        let urls = load_urls_from_env(
            "PAXOS_CORE_TEST_UNSET_VAR_XYZ",
            " http://a:8000 , http://b:8000,,http://c:8000 ",
        );
        assert_eq!(
            urls,
            vec!["http://a:8000", "http://b:8000", "http://c:8000"]
        );
    }

    #[test]
    fn majority_matches_spec_formula() {
        assert_eq!(majority_of(3), 2);
        assert_eq!(majority_of(4), 3);
        assert_eq!(majority_of(1), 1);
        assert_eq!(majority_of(0), 2);
    }
}
