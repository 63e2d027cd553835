//! The client-submitted payload the cluster reaches agreement on.

use serde::{Deserialize, Serialize};

/// An opaque client transaction, compared for equality by structural value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub client_id: String,
    pub request_id: u64,
    pub timestamp: i64,
    pub value: String,
}
