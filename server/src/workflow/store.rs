//! Verification data access used by the workflow functions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tenant_common::{RoleName, VerificationStatus};
use uuid::Uuid;

use super::{queries, WorkflowError};
use crate::db::display_name_or_full;

/// Roles allowed to decide a verification.
pub const VERIFIER_ROLES: &[RoleName] = &[RoleName::Admin, RoleName::FloorCaptain];

/// Someone notified about a pending registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approver {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<queries::ApproverRow> for Approver {
    fn from(row: queries::ApproverRow) -> Self {
        Self {
            name: display_name_or_full(None, row.first_name.as_deref(), row.last_name.as_deref()),
            user_id: row.user_id,
            email: row.email,
        }
    }
}

/// A verification decision taken by `actor_id`.
#[derive(Debug, Clone)]
pub struct Decision {
    pub user_id: Uuid,
    pub status: VerificationStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// What applying a decision did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    /// False when the profile already held the requested status.
    pub applied: bool,
    pub user_name: String,
}

/// Whether moving `current` to `target` changes anything.
///
/// `Ok(false)` for a repeat of the current status, `Ok(true)` for a real
/// transition, and a non-retryable error for a crossing between terminal states.
pub fn check_transition(
    current: VerificationStatus,
    target: VerificationStatus,
) -> Result<bool, WorkflowError> {
    if current == target {
        Ok(false)
    } else if current.can_transition_to(target) {
        Ok(true)
    } else {
        Err(WorkflowError::Fatal(format!(
            "Cannot change verification status from {current} to {target}"
        )))
    }
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Make sure the profile is awaiting a decision; returns its status.
    async fn mark_pending(&self, user_id: Uuid) -> Result<VerificationStatus, WorkflowError>;

    async fn unit_floor(&self, unit_id: Uuid) -> Result<Option<i32>, WorkflowError>;

    async fn floor_captains(&self, floor: i32) -> Result<Vec<Approver>, WorkflowError>;

    async fn admins(&self) -> Result<Vec<Approver>, WorkflowError>;

    async fn actor_can_verify(&self, actor_id: Uuid) -> Result<bool, WorkflowError>;

    async fn apply_decision(&self, decision: &Decision) -> Result<DecisionOutcome, WorkflowError>;

    /// Where to send the user's notification, if known.
    async fn contact_email(&self, user_id: Uuid) -> Result<Option<String>, WorkflowError>;
}

/// [`VerificationStore`] over `PostgreSQL`.
#[derive(Clone)]
pub struct PgVerificationStore {
    pool: PgPool,
}

impl PgVerificationStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationStore for PgVerificationStore {
    async fn mark_pending(&self, user_id: Uuid) -> Result<VerificationStatus, WorkflowError> {
        queries::ensure_pending(&self.pool, user_id)
            .await
            .map_err(|e| WorkflowError::Step(format!("Failed to update user profile: {e}")))?
            .ok_or_else(|| {
                WorkflowError::Fatal("Failed to update user profile: profile not found".into())
            })
    }

    async fn unit_floor(&self, unit_id: Uuid) -> Result<Option<i32>, WorkflowError> {
        Ok(queries::unit_floor(&self.pool, unit_id).await?)
    }

    async fn floor_captains(&self, floor: i32) -> Result<Vec<Approver>, WorkflowError> {
        let rows = queries::floor_captains(&self.pool, floor).await?;
        Ok(rows.into_iter().map(Approver::from).collect())
    }

    async fn admins(&self) -> Result<Vec<Approver>, WorkflowError> {
        let rows = queries::users_with_role(&self.pool, RoleName::Admin).await?;
        Ok(rows.into_iter().map(Approver::from).collect())
    }

    async fn actor_can_verify(&self, actor_id: Uuid) -> Result<bool, WorkflowError> {
        queries::holds_any_role(&self.pool, actor_id, VERIFIER_ROLES)
            .await
            .map_err(|e| {
                WorkflowError::Step(format!("Failed to update user verification status: {e}"))
            })
    }

    async fn apply_decision(&self, decision: &Decision) -> Result<DecisionOutcome, WorkflowError> {
        let failed = |e: sqlx::Error| {
            WorkflowError::Step(format!("Failed to update user verification status: {e}"))
        };

        if let Some((first, last)) = queries::decide_pending(
            &self.pool,
            decision.user_id,
            decision.status,
            decision.actor_id,
            decision.at,
            decision.notes.as_deref(),
        )
        .await
        .map_err(failed)?
        {
            return Ok(DecisionOutcome {
                applied: true,
                user_name: display_name_or_full(None, first.as_deref(), last.as_deref()),
            });
        }

        let current = queries::decision_state(&self.pool, decision.user_id)
            .await
            .map_err(failed)?
            .ok_or_else(|| {
                WorkflowError::Fatal(
                    "Failed to update user verification status: profile not found".into(),
                )
            })?;

        if check_transition(current.verification_status, decision.status)? {
            // Went back to pending between the two statements
            return Err(WorkflowError::Step(
                "Failed to update user verification status: concurrent update".into(),
            ));
        }

        Ok(DecisionOutcome {
            applied: false,
            user_name: display_name_or_full(
                None,
                current.first_name.as_deref(),
                current.last_name.as_deref(),
            ),
        })
    }

    async fn contact_email(&self, user_id: Uuid) -> Result<Option<String>, WorkflowError> {
        Ok(queries::user_email(&self.pool, user_id).await?)
    }
}
