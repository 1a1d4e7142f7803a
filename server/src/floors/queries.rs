//! Floor Queries

use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::types::{AnnouncementRow, FloorContact, FloorInfo, NewAnnouncement};
use crate::db::FloorCaptainAssignment;
use crate::directory::queries::RESIDENT_SELECT;
use crate::directory::ResidentRow;

fn db_error(query: &'static str) -> impl Fn(sqlx::Error) -> sqlx::Error {
    move |e| {
        error!(query, error = %e, "Database query failed");
        e
    }
}

/// Every floor that has at least one unit.
pub async fn all_unit_floors(pool: &PgPool) -> sqlx::Result<Vec<i32>> {
    let rows: Vec<(i32,)> = sqlx::query_as("SELECT DISTINCT floor FROM units ORDER BY floor")
        .fetch_all(pool)
        .await
        .map_err(db_error("all_unit_floors"))?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn captain_assignments(
    pool: &PgPool,
    user_id: Uuid,
) -> sqlx::Result<Vec<FloorCaptainAssignment>> {
    sqlx::query_as::<_, FloorCaptainAssignment>(
        r"
        SELECT id, user_id, floor_number, assigned_by, assigned_at
        FROM floor_captain_assignments
        WHERE user_id = $1
        ORDER BY floor_number
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(db_error("captain_assignments"))
}

pub async fn floor_info(pool: &PgPool, floor: i32) -> sqlx::Result<FloorInfo> {
    let (unit_count, resident_count): (i64, i64) = sqlx::query_as(
        r"
        SELECT
            (SELECT COUNT(*) FROM units WHERE floor = $1),
            (SELECT COUNT(*)
               FROM user_profiles p
               JOIN units un ON un.id = p.unit_id
              WHERE un.floor = $1
                AND p.verification_status = 'approved'
                AND p.residency_status = 'current')
        ",
    )
    .bind(floor)
    .fetch_one(pool)
    .await
    .map_err(db_error("floor_info"))?;

    Ok(FloorInfo {
        floor_number: floor,
        unit_count,
        resident_count,
    })
}

pub async fn floor_residents(pool: &PgPool, floor: i32) -> sqlx::Result<Vec<ResidentRow>> {
    let sql = format!(
        r"
        {RESIDENT_SELECT}
        WHERE un.floor = $1
        ORDER BY p.last_name NULLS LAST, p.first_name NULLS LAST
        "
    );
    sqlx::query_as::<_, ResidentRow>(&sql)
        .bind(floor)
        .fetch_all(pool)
        .await
        .map_err(db_error("floor_residents"))
}

pub async fn floor_announcements(pool: &PgPool, floor: i32) -> sqlx::Result<Vec<AnnouncementRow>> {
    sqlx::query_as::<_, AnnouncementRow>(
        r"
        SELECT
            a.id, a.title, a.content, a.created_at, a.is_pinned, a.expires_at,
            p.id AS author_id,
            p.display_name AS author_display_name,
            p.first_name AS author_first_name,
            p.last_name AS author_last_name
        FROM announcements a
        LEFT JOIN user_profiles p ON p.id = a.created_by
        WHERE a.target_floor = $1
        ORDER BY a.is_pinned DESC, a.created_at DESC
        ",
    )
    .bind(floor)
    .fetch_all(pool)
    .await
    .map_err(db_error("floor_announcements"))
}

pub async fn insert_announcement(
    pool: &PgPool,
    author: Uuid,
    announcement: &NewAnnouncement,
) -> sqlx::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r"
        INSERT INTO announcements (title, content, created_by, target_floor, is_pinned, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(&announcement.title)
    .bind(&announcement.content)
    .bind(author)
    .bind(announcement.floor_number)
    .bind(announcement.is_pinned)
    .bind(announcement.expires_at)
    .fetch_one(pool)
    .await
    .map_err(db_error("insert_announcement"))?;
    Ok(id)
}

/// Approved, current residents of a floor, with their login address.
pub async fn floor_contacts(pool: &PgPool, floor: i32) -> sqlx::Result<Vec<FloorContact>> {
    sqlx::query_as::<_, FloorContact>(
        r"
        SELECT u.email, p.first_name, p.last_name, p.display_name
        FROM user_profiles p
        JOIN users u ON u.id = p.id
        JOIN units un ON un.id = p.unit_id
        WHERE un.floor = $1
          AND p.verification_status = 'approved'
          AND p.residency_status = 'current'
          AND u.email <> ''
        ORDER BY p.last_name NULLS LAST
        ",
    )
    .bind(floor)
    .fetch_all(pool)
    .await
    .map_err(db_error("floor_contacts"))
}
