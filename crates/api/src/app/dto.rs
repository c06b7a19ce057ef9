use serde::Serialize;

use stocksync_infra::{SyncOutcome, SyncReport};

/// Body returned for an accepted webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResponse {
    Processed { report: SyncReport },
    Duplicate { webhook_id: String },
}

impl From<SyncOutcome> for WebhookResponse {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Processed(report) => WebhookResponse::Processed { report },
            SyncOutcome::Duplicate { webhook_id } => WebhookResponse::Duplicate { webhook_id },
        }
    }
}
