//! JSON request/response bodies for each role's HTTP endpoints,
//! shared by every role so the wire shape lives in exactly one place.

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeRequest {
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeResponse {
    pub status: String,
    pub proposal_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeError {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub proposal_id: String,
    #[serde(default)]
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromiseResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub tid_in_use: Option<String>,
    pub accepted_id: Option<String>,
    pub accepted_value: Option<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub proposal_id: String,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub response: String,
    pub tid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tid_in_use: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnRequest {
    pub acceptor_id: String,
    pub proposal_id: String,
    pub accepted: bool,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub request_id: u64,
    pub result: String,
    pub proposal_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub ok: bool,
}
