//! Event Queue and Worker
//!
//! Background worker that runs workflow functions for events taken from a
//! Redis queue, with backoff retries and dead-letter handling.
//!
//! Architecture:
//! - New envelopes go into `EVENT_QUEUE_KEY` (list, BRPOP).
//! - Failed runs are scheduled into `RETRY_ZSET_KEY` (sorted set, score = Unix timestamp).
//! - The worker loop polls both: immediate queue and due retries.
//!
//! A retried envelope keeps its id, so steps that already completed are
//! answered from the step store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fred::interfaces::{ListInterface, LuaInterface, SortedSetsInterface};
use fred::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tenant_common::Event;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::functions::Runtime;
use super::{queries, WorkflowError};

/// Redis key for the immediate event queue.
const EVENT_QUEUE_KEY: &str = "workflow:events:queue";

/// Redis key for the delayed retry sorted set (score = Unix timestamp when due).
const RETRY_ZSET_KEY: &str = "workflow:events:retry";

/// Maximum attempts before dead-lettering.
pub const MAX_ATTEMPTS: u32 = 5;

/// Retry delays in seconds.
pub const RETRY_DELAYS_SECS: [u64; 5] = [5, 30, 120, 600, 1800];

const _: () = assert!(MAX_ATTEMPTS as usize <= RETRY_DELAYS_SECS.len());

/// Atomically removes and returns due items from the retry sorted set.
const PROMOTE_RETRIES_LUA: &str = r"
local items = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 50)
if #items > 0 then
    redis.call('ZREM', KEYS[1], unpack(items))
end
return items
";

/// One queued event. `id` doubles as the run id for memoized steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub name: String,
    pub data: Value,
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub attempt: u32,
}

impl Envelope {
    pub fn new(event: &Event) -> Result<Self, WorkflowError> {
        let mut value = serde_json::to_value(event)?;
        let data = value.get_mut("data").map(Value::take).unwrap_or(Value::Null);

        Ok(Self {
            id: Uuid::now_v7(),
            name: event.name().to_string(),
            data,
            ts: Utc::now(),
            attempt: 0,
        })
    }

    /// Decode the typed event carried by this envelope.
    pub fn event(&self) -> Result<Event, WorkflowError> {
        Ok(serde_json::from_value(
            json!({ "name": self.name, "data": self.data }),
        )?)
    }
}

/// Anything that can publish workflow events.
#[async_trait]
pub trait EventSender: Send + Sync {
    /// Publish an event, returning the envelope id.
    async fn send(&self, event: Event) -> Result<Uuid, WorkflowError>;
}

/// Redis-backed event queue.
#[derive(Clone)]
pub struct EventBus {
    redis: Client,
}

impl EventBus {
    pub const fn new(redis: Client) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl EventSender for EventBus {
    async fn send(&self, event: Event) -> Result<Uuid, WorkflowError> {
        let envelope = Envelope::new(&event)?;
        enqueue(&self.redis, &envelope).await?;
        debug!(event_id = %envelope.id, name = %envelope.name, "Event enqueued");
        Ok(envelope.id)
    }
}

/// Enqueue an envelope for immediate processing.
pub async fn enqueue(redis: &Client, envelope: &Envelope) -> Result<(), WorkflowError> {
    let payload = serde_json::to_string(envelope)?;
    redis.lpush::<(), _, _>(EVENT_QUEUE_KEY, payload).await?;
    Ok(())
}

/// Schedule an envelope for retry at a future timestamp.
async fn schedule_retry(
    redis: &Client,
    envelope: &Envelope,
    run_at: f64,
) -> Result<(), WorkflowError> {
    let payload = serde_json::to_string(envelope)?;

    redis
        .zadd::<(), _, _>(RETRY_ZSET_KEY, None, None, false, false, (run_at, payload))
        .await?;
    Ok(())
}

/// Move due retries from the sorted set into the immediate queue.
async fn promote_due_retries(redis: &Client) {
    let now = Utc::now().timestamp() as f64;

    let items: Vec<String> = match redis
        .eval(PROMOTE_RETRIES_LUA, vec![RETRY_ZSET_KEY], vec![now.to_string()])
        .await
    {
        Ok(items) => items,
        Err(e) => {
            error!("Failed to promote due retries (Lua): {}", e);
            return;
        }
    };

    for payload in &items {
        if let Err(e) = redis
            .lpush::<(), _, _>(EVENT_QUEUE_KEY, payload.as_str())
            .await
        {
            error!("Failed to re-enqueue promoted retry item: {}", e);
        }
    }
}

/// Delay before the next attempt, given the attempt that just failed.
#[must_use]
pub fn retry_delay(attempt: u32) -> Option<Duration> {
    if attempt >= MAX_ATTEMPTS {
        return None;
    }
    let secs = RETRY_DELAYS_SECS
        .get(attempt as usize)
        .copied()
        .unwrap_or(1800);
    Some(Duration::from_secs(secs))
}

/// Spawn the background event worker.
pub async fn spawn_event_worker(db: PgPool, redis: Client, runtime: Arc<Runtime>) {
    info!("Workflow event worker started");

    let mut consecutive_errors: u32 = 0;

    loop {
        promote_due_retries(&redis).await;

        // Short timeout so due retries are promoted promptly
        let result: Result<Option<(String, String)>, _> = redis.brpop(EVENT_QUEUE_KEY, 2.0).await;

        let payload_str = match result {
            Ok(Some((_key, value))) => {
                consecutive_errors = 0;
                value
            }
            Ok(None) => {
                consecutive_errors = 0;
                continue;
            }
            Err(e) => {
                consecutive_errors += 1;
                let backoff_secs = 1u64 << consecutive_errors.min(6);
                if backoff_secs > 30 {
                    error!(
                        consecutive_errors,
                        backoff_secs,
                        "Persistent Redis failure in event worker, backing off: {}",
                        e
                    );
                } else {
                    error!("Failed to BRPOP from event queue: {}", e);
                }
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                continue;
            }
        };

        let envelope: Envelope = match serde_json::from_str(&payload_str) {
            Ok(envelope) => envelope,
            Err(e) => {
                let truncated: String = payload_str.chars().take(500).collect();
                error!(
                    error = %e,
                    payload_preview = %truncated,
                    "Failed to deserialize event envelope"
                );
                continue;
            }
        };

        let db = db.clone();
        let redis = redis.clone();
        let runtime = runtime.clone();

        tokio::spawn(async move {
            let event_id = envelope.id;
            let name = envelope.name.clone();
            let handle = tokio::spawn(async move {
                process_event(&db, &redis, &runtime, envelope).await;
            });
            if let Err(e) = handle.await {
                error!(event_id = %event_id, name = %name, "Workflow run panicked: {}", e);
            }
        });
    }
}

/// Run the function registered for one envelope.
async fn process_event(db: &PgPool, redis: &Client, runtime: &Runtime, envelope: Envelope) {
    match runtime.run(&envelope).await {
        Ok(Some(output)) => {
            info!(
                event_id = %envelope.id,
                name = %envelope.name,
                attempt = envelope.attempt,
                output = %output,
                "Workflow run completed"
            );
        }
        Ok(None) => {
            debug!(event_id = %envelope.id, name = %envelope.name, "No function registered for event");
        }
        Err(e) if e.is_retryable() => {
            warn!(
                event_id = %envelope.id,
                name = %envelope.name,
                attempt = envelope.attempt,
                error = %e,
                "Workflow run failed"
            );
            handle_retry(db, redis, envelope, &e.to_string()).await;
        }
        Err(e) => {
            error!(
                event_id = %envelope.id,
                name = %envelope.name,
                error = %e,
                "Workflow run failed permanently, dead-lettering"
            );
            dead_letter(db, &envelope, &e.to_string()).await;
        }
    }
}

/// Handle retry or dead-letter for a failed run.
async fn handle_retry(db: &PgPool, redis: &Client, mut envelope: Envelope, error: &str) {
    let Some(delay) = retry_delay(envelope.attempt) else {
        warn!(
            event_id = %envelope.id,
            name = %envelope.name,
            "Workflow run exhausted all retries, dead-lettering"
        );
        dead_letter(db, &envelope, error).await;
        return;
    };

    envelope.attempt += 1;
    let run_at = Utc::now().timestamp() as f64 + delay.as_secs_f64();

    if let Err(e) = schedule_retry(redis, &envelope, run_at).await {
        error!(
            event_id = %envelope.id,
            attempt = envelope.attempt,
            "Failed to schedule retry, falling back to dead-letter: {}", e
        );
        dead_letter(db, &envelope, &format!("{error} (retry scheduling failed: {e})")).await;
    }
}

async fn dead_letter(db: &PgPool, envelope: &Envelope, error: &str) {
    if let Err(e) = queries::insert_dead_letter(db, envelope, Some(error)).await {
        error!(event_id = %envelope.id, "Failed to insert dead letter: {}", e);
    }
}
