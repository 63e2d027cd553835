//! Prometheus-text-format counters, one registry per role. Registered
//! unconditionally at startup, independent of which consensus features a
//! given role exercises.

use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::with_opts(Opts::new(name, help)).expect("valid metric opts");
    registry
        .register(Box::new(counter.clone()))
        .expect("metric name registered once");
    counter
}

fn render(registry: &Registry) -> String {
    let families = registry.gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buf)
        .expect("prometheus text encoding never fails for well-formed counters");
    String::from_utf8(buf).expect("prometheus text encoder emits utf-8")
}

pub struct ProposerMetrics {
    registry: Registry,
    pub attempts_total: IntCounter,
    pub prepares_sent_total: IntCounter,
    pub promises_quorum_fail_total: IntCounter,
    pub accepts_quorum_fail_total: IntCounter,
    pub commits_total: IntCounter,
}

impl ProposerMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        ProposerMetrics {
            attempts_total: counter(
                &registry,
                "paxos_attempts_total",
                "Total client /propose requests received",
            ),
            prepares_sent_total: counter(
                &registry,
                "paxos_prepares_sent_total",
                "Total PREPARE messages sent",
            ),
            promises_quorum_fail_total: counter(
                &registry,
                "paxos_promises_quorum_fail_total",
                "Total Phase 1 (Prepare) quorum failures",
            ),
            accepts_quorum_fail_total: counter(
                &registry,
                "paxos_accepts_quorum_fail_total",
                "Total Phase 2 (Accept) quorum failures",
            ),
            commits_total: counter(
                &registry,
                "paxos_commits_total",
                "Total proposals completed successfully (COMMITTED)",
            ),
            registry,
        }
    }

    pub fn render(&self) -> String {
        render(&self.registry)
    }
}

impl Default for ProposerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AcceptorMetrics {
    registry: Registry,
    pub promises_sent_total: IntCounter,
    pub accepts_received_total: IntCounter,
    pub rejections_sent_total: IntCounter,
    pub learner_notifications_total: IntCounter,
}

impl AcceptorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        AcceptorMetrics {
            promises_sent_total: counter(
                &registry,
                "paxos_promises_sent_total",
                "Total PROMISE messages sent",
            ),
            accepts_received_total: counter(
                &registry,
                "paxos_accepts_received_total",
                "Total ACCEPT messages received and accepted",
            ),
            rejections_sent_total: counter(
                &registry,
                "paxos_rejections_sent_total",
                "Total rejections sent (not_promise or not_accepted)",
            ),
            learner_notifications_total: counter(
                &registry,
                "paxos_learner_notifications_total",
                "Total vote notifications sent to Learners",
            ),
            registry,
        }
    }

    pub fn render(&self) -> String {
        render(&self.registry)
    }
}

impl Default for AcceptorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LearnerMetrics {
    registry: Registry,
    pub commit_total: IntCounter,
    pub client_notification_sent_total: IntCounter,
}

impl LearnerMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        LearnerMetrics {
            commit_total: counter(
                &registry,
                "paxos_commit_total",
                "Total proposals that reached COMMITTED quorum",
            ),
            client_notification_sent_total: counter(
                &registry,
                "paxos_client_notification_sent_total",
                "Total commit notifications sent to clients",
            ),
            registry,
        }
    }

    pub fn render(&self) -> String {
        render(&self.registry)
    }
}

impl Default for LearnerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_contains_registered_counter_names() {
        crate::test_support::init_logging();
        let metrics = ProposerMetrics::new();
        metrics.attempts_total.inc();
        let text = metrics.render();
        assert!(text.contains("paxos_attempts_total 1"));
    }
}
