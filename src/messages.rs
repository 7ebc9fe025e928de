//! JSON bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub id: u64,
    pub prompt: String,
    pub model: String,
    pub duration: Duration,
    pub response: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalyzeReply {
    Success { response: AnalysisResponse },
    Warning { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusReply {
    pub status: String,
    pub model: String,
    pub in_flight: usize,
}
