//! Admin Queries

use sqlx::PgPool;
use tenant_common::RoleName;
use tracing::error;
use uuid::Uuid;

use super::types::{AssignmentRow, EligibleUser, PendingProfileRow};
use crate::db::assign_role;

fn db_error(query: &'static str) -> impl Fn(sqlx::Error) -> sqlx::Error {
    move |e| {
        error!(query, error = %e, "Database query failed");
        e
    }
}

const PENDING_SELECT: &str = r"
    SELECT
        p.id, u.email, p.first_name, p.last_name, p.display_name, p.phone,
        p.move_in_date, p.created_at, un.unit_number, un.floor
    FROM user_profiles p
    JOIN users u ON u.id = p.id
    LEFT JOIN units un ON un.id = p.unit_id
    WHERE p.verification_status = 'pending'
";

/// Pending registrations, newest first.
pub async fn pending_profiles(pool: &PgPool) -> sqlx::Result<Vec<PendingProfileRow>> {
    sqlx::query_as::<_, PendingProfileRow>(&format!("{PENDING_SELECT} ORDER BY p.created_at DESC"))
        .fetch_all(pool)
        .await
        .map_err(db_error("pending_profiles"))
}

/// A single registration, if it is still pending.
pub async fn pending_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> sqlx::Result<Option<PendingProfileRow>> {
    sqlx::query_as::<_, PendingProfileRow>(&format!("{PENDING_SELECT} AND p.id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("pending_profile"))
}

pub async fn captain_assignments(pool: &PgPool) -> sqlx::Result<Vec<AssignmentRow>> {
    sqlx::query_as::<_, AssignmentRow>(
        r"
        SELECT
            fca.id, fca.user_id, fca.floor_number, fca.assigned_by, fca.assigned_at,
            u.email, p.first_name, p.last_name, p.profile_picture_url
        FROM floor_captain_assignments fca
        LEFT JOIN users u ON u.id = fca.user_id
        LEFT JOIN user_profiles p ON p.id = fca.user_id
        ORDER BY fca.floor_number, fca.assigned_at
        ",
    )
    .fetch_all(pool)
    .await
    .map_err(db_error("captain_assignments"))
}

/// Approved, current residents, by last name.
pub async fn eligible_users(pool: &PgPool) -> sqlx::Result<Vec<EligibleUser>> {
    sqlx::query_as::<_, EligibleUser>(
        r"
        SELECT p.id, u.email, p.first_name, p.last_name, p.profile_picture_url
        FROM user_profiles p
        JOIN users u ON u.id = p.id
        WHERE p.verification_status = 'approved'
          AND p.residency_status = 'current'
        ORDER BY p.last_name NULLS LAST, p.first_name NULLS LAST
        ",
    )
    .fetch_all(pool)
    .await
    .map_err(db_error("eligible_users"))
}

pub async fn find_assignment(
    pool: &PgPool,
    user_id: Uuid,
    floor: i32,
) -> sqlx::Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM floor_captain_assignments WHERE user_id = $1 AND floor_number = $2",
    )
    .bind(user_id)
    .bind(floor)
    .fetch_optional(pool)
    .await
    .map_err(db_error("find_assignment"))?;
    Ok(row.map(|r| r.0))
}

/// Grant the `FloorCaptain` role when missing and record the assignment.
pub async fn create_assignment(
    pool: &PgPool,
    user_id: Uuid,
    floor: i32,
    assigned_by: Uuid,
) -> sqlx::Result<Uuid> {
    let mut tx = pool.begin().await.map_err(db_error("create_assignment"))?;

    let (role_id,): (Uuid,) = sqlx::query_as("SELECT id FROM roles WHERE name = $1")
        .bind(RoleName::FloorCaptain.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create_assignment"))?;

    assign_role(&mut *tx, user_id, role_id, Some(assigned_by)).await?;

    let (id,): (Uuid,) = sqlx::query_as(
        r"
        INSERT INTO floor_captain_assignments (user_id, floor_number, assigned_by)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(floor)
    .bind(assigned_by)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error("create_assignment"))?;

    tx.commit().await.map_err(db_error("create_assignment"))?;
    Ok(id)
}

/// Returns whether a row was deleted.
pub async fn delete_assignment(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM floor_captain_assignments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error("delete_assignment"))?;
    Ok(result.rows_affected() > 0)
}
