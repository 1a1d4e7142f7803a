//! Directory Queries

use sqlx::PgPool;
use tracing::error;

use super::types::{DirectoryFilters, ResidentRow};

/// Columns and joins shared by every resident listing.
pub(crate) const RESIDENT_SELECT: &str = r"
    SELECT
        p.id, p.first_name, p.last_name, p.display_name, p.bio, p.phone,
        p.profile_picture_url, p.occupation, p.move_in_date, p.residency_status,
        p.languages_spoken, p.social_media_links, p.unit_id,
        p.profile_visibility, p.verification_status, p.created_at,
        u.email, u.last_login,
        un.unit_number, un.floor,
        s.skills, s.interests, s.community_involvement
    FROM user_profiles p
    LEFT JOIN users u ON u.id = p.id
    LEFT JOIN units un ON un.id = p.unit_id
    LEFT JOIN user_skills s ON s.id = p.id
";

/// Profiles visible in the directory.
const LISTED: &str = r"
    p.verification_status = 'approved'
    AND p.residency_status = 'current'
    AND p.profile_visibility <> 'private'
";

pub async fn list_verified_residents(
    pool: &PgPool,
    filters: &DirectoryFilters,
) -> sqlx::Result<Vec<ResidentRow>> {
    let sql = format!(
        r"
        {RESIDENT_SELECT}
        WHERE {LISTED}
          AND ($1::int IS NULL OR un.floor = $1)
          AND ($2::text IS NULL
               OR p.first_name ILIKE $2
               OR p.last_name ILIKE $2
               OR p.display_name ILIKE $2
               OR p.occupation ILIKE $2
               OR un.unit_number ILIKE $2
               OR EXISTS (SELECT 1 FROM unnest(s.skills) AS skill WHERE skill ILIKE $2))
        ORDER BY p.last_name NULLS LAST, p.first_name NULLS LAST
        "
    );

    sqlx::query_as::<_, ResidentRow>(&sql)
        .bind(filters.floor)
        .bind(filters.search_pattern())
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(query = "list_verified_residents", error = %e, "Database query failed");
            e
        })
}

pub async fn list_directory_floors(pool: &PgPool) -> sqlx::Result<Vec<i32>> {
    let sql = format!(
        r"
        SELECT DISTINCT un.floor
        FROM units un
        JOIN user_profiles p ON p.unit_id = un.id
        WHERE {LISTED}
        ORDER BY un.floor
        "
    );

    let rows: Vec<(i32,)> = sqlx::query_as(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(query = "list_directory_floors", error = %e, "Database query failed");
            e
        })?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
