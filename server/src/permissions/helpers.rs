//! Permission helper functions for API handlers.

use sqlx::PgPool;
use tracing::warn;

use super::models::UserWithRoles;
use super::queries::is_assigned_to_floor;
use super::resolver::{is_admin, is_floor_captain};

/// Whether a user may act on a floor.
///
/// Admins may act on every floor; a floor captain only on floors they are
/// assigned to; anyone else on none.
#[tracing::instrument(skip(pool, user), fields(user_id = %user.id))]
pub async fn can_manage_floor(
    pool: &PgPool,
    user: &UserWithRoles,
    floor_number: i32,
) -> sqlx::Result<bool> {
    if is_admin(Some(user)) {
        return Ok(true);
    }
    if !is_floor_captain(Some(user)) {
        return Ok(false);
    }

    let assigned = is_assigned_to_floor(pool, user.id, floor_number).await?;
    if !assigned {
        warn!(floor = floor_number, "Floor captain is not assigned to floor");
    }
    Ok(assigned)
}
