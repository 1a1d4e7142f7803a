//! Workflow ingest endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tenant_common::Event;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::functions::{FunctionSpec, FUNCTIONS};
use super::signing::{verify_signature, SIGNATURE_HEADER};
use super::WorkflowError;
use crate::api::AppState;

/// A single event or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncomingEvents {
    Batch(Vec<Event>),
    Single(Event),
}

impl IncomingEvents {
    fn into_vec(self) -> Vec<Event> {
        match self {
            Self::Batch(events) => events,
            Self::Single(event) => vec![event],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ids: Vec<Uuid>,
    pub status: u16,
}

#[derive(Debug, Serialize)]
pub struct FunctionsResponse {
    pub functions: &'static [FunctionSpec],
}

/// GET /api/workflows
pub async fn list_functions() -> Json<FunctionsResponse> {
    Json(FunctionsResponse {
        functions: FUNCTIONS,
    })
}

/// POST /api/workflows
///
/// The raw body must carry a valid `X-Event-Signature`.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), WorkflowError> {
    let key = state
        .config
        .event_key
        .as_deref()
        .ok_or(WorkflowError::NotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WorkflowError::InvalidSignature)?;

    if !verify_signature(key, &body, signature) {
        warn!("Rejected event with invalid signature");
        return Err(WorkflowError::InvalidSignature);
    }

    let events = serde_json::from_slice::<IncomingEvents>(&body)?.into_vec();

    let mut ids = Vec::with_capacity(events.len());
    for event in events {
        let name = event.name();
        let id = state.events.send(event).await?;
        info!(event_id = %id, name, "Event accepted");
        ids.push(id);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            ids,
            status: StatusCode::ACCEPTED.as_u16(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_and_batched_bodies_parse() {
        let one = json!({
            "name": "user/rejected",
            "data": {
                "userId": Uuid::new_v4(),
                "rejectedBy": Uuid::new_v4(),
                "timestamp": "2025-05-10T12:00:00Z"
            }
        });
        let parsed: IncomingEvents = serde_json::from_value(one.clone()).unwrap();
        assert_eq!(parsed.into_vec().len(), 1);

        let many: IncomingEvents = serde_json::from_value(json!([one.clone(), one])).unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let raw = json!({ "name": "user/deleted", "data": {} });
        assert!(serde_json::from_value::<IncomingEvents>(raw).is_err());
    }
}
