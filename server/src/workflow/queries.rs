//! Workflow Database Queries

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tenant_common::{RoleName, VerificationStatus};
use tracing::error;
use uuid::Uuid;

use super::bus::Envelope;

/// Someone who can approve a registration, with where to reach them.
#[derive(Debug, Clone, FromRow)]
pub struct ApproverRow {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DecisionRow {
    #[sqlx(try_from = "String")]
    pub verification_status: VerificationStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn insert_dead_letter(
    pool: &PgPool,
    envelope: &Envelope,
    error_message: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO workflow_dead_letters
            (event_id, event_name, data, attempts, error, event_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(envelope.id)
    .bind(&envelope.name)
    .bind(&envelope.data)
    .bind(envelope.attempt as i32 + 1)
    .bind(error_message)
    .bind(envelope.ts)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(query = "insert_dead_letter", event_id = %envelope.id, error = %e, "Database query failed");
        e
    })?;
    Ok(())
}

/// Returns the resulting status, or `None` when the profile does not exist.
/// Only a profile without a decision is touched.
pub async fn ensure_pending(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<VerificationStatus>> {
    let row: Option<(String,)> = sqlx::query_as(
        r"
        UPDATE user_profiles
        SET verification_status = CASE
                WHEN verification_status IN ('approved', 'rejected') THEN verification_status
                ELSE 'pending'
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING verification_status
        ",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(status,)| status.parse().ok()))
}

pub async fn unit_floor(pool: &PgPool, unit_id: Uuid) -> sqlx::Result<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT floor FROM units WHERE id = $1")
        .bind(unit_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn floor_captains(pool: &PgPool, floor: i32) -> sqlx::Result<Vec<ApproverRow>> {
    sqlx::query_as::<_, ApproverRow>(
        r"
        SELECT DISTINCT u.id AS user_id, u.email, p.first_name, p.last_name
        FROM floor_captain_assignments fca
        JOIN users u ON u.id = fca.user_id
        LEFT JOIN user_profiles p ON p.id = u.id
        WHERE fca.floor_number = $1
        ORDER BY u.email
        ",
    )
    .bind(floor)
    .fetch_all(pool)
    .await
}

pub async fn users_with_role(pool: &PgPool, role: RoleName) -> sqlx::Result<Vec<ApproverRow>> {
    sqlx::query_as::<_, ApproverRow>(
        r"
        SELECT u.id AS user_id, u.email, p.first_name, p.last_name
        FROM user_roles ur
        JOIN roles r ON r.id = ur.role_id
        JOIN users u ON u.id = ur.user_id
        LEFT JOIN user_profiles p ON p.id = u.id
        WHERE r.name = $1
        ORDER BY u.email
        ",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await
}

pub async fn holds_any_role(pool: &PgPool, user_id: Uuid, roles: &[RoleName]) -> sqlx::Result<bool> {
    let names: Vec<&str> = roles.iter().map(RoleName::as_str).collect();
    let result: (bool,) = sqlx::query_as(
        r"
        SELECT EXISTS(
            SELECT 1 FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.name = ANY($2)
        )
        ",
    )
    .bind(user_id)
    .bind(&names)
    .fetch_one(pool)
    .await?;
    Ok(result.0)
}

/// Move a pending profile to a terminal status. Returns `None` when the profile
/// was not pending.
pub async fn decide_pending(
    pool: &PgPool,
    user_id: Uuid,
    status: VerificationStatus,
    actor_id: Uuid,
    at: DateTime<Utc>,
    notes: Option<&str>,
) -> sqlx::Result<Option<(Option<String>, Option<String>)>> {
    sqlx::query_as(
        r"
        UPDATE user_profiles
        SET verification_status = $2,
            verified_by = $3,
            verified_at = $4,
            verification_notes = $5,
            updated_at = NOW()
        WHERE id = $1 AND verification_status = 'pending'
        RETURNING first_name, last_name
        ",
    )
    .bind(user_id)
    .bind(status.as_str())
    .bind(actor_id)
    .bind(at)
    .bind(notes)
    .fetch_optional(pool)
    .await
}

pub async fn decision_state(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<DecisionRow>> {
    sqlx::query_as::<_, DecisionRow>(
        "SELECT verification_status, first_name, last_name FROM user_profiles WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn user_email(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0).filter(|e| !e.trim().is_empty()))
}
