//! Database queries for the permission system.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use super::models::{RoleWithPermissions, UserWithRoles};

#[derive(Debug, FromRow)]
struct AssignedRoleRow {
    id: Uuid,
    name: String,
    permissions: JsonValue,
}

/// Keep only boolean entries of a stored permission map.
fn permission_map(value: JsonValue) -> HashMap<String, bool> {
    match value {
        JsonValue::Object(map) => map
            .into_iter()
            .filter_map(|(key, v)| v.as_bool().map(|b| (key, b)))
            .collect(),
        _ => HashMap::new(),
    }
}

/// Load every role assigned to a user.
///
/// Returns `None` when the user holds no roles. Database failures are logged
/// and also yield `None`, so callers treat them as "access denied".
#[tracing::instrument(skip(pool))]
pub async fn get_user_roles(pool: &PgPool, user_id: Uuid) -> Option<UserWithRoles> {
    let rows = sqlx::query_as::<_, AssignedRoleRow>(
        r"
        SELECT r.id, r.name, r.permissions
        FROM user_roles ur
        JOIN roles r ON r.id = ur.role_id
        WHERE ur.user_id = $1
        ORDER BY r.name
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!(query = "get_user_roles", user_id = %user_id, error = %e, "Error fetching user roles");
            return None;
        }
    };

    if rows.is_empty() {
        return None;
    }

    Some(UserWithRoles {
        id: user_id,
        roles: rows
            .into_iter()
            .map(|row| RoleWithPermissions {
                id: row.id,
                name: row.name,
                permissions: permission_map(row.permissions),
            })
            .collect(),
    })
}

/// Check whether a user is assigned to a floor.
pub async fn is_assigned_to_floor(
    pool: &PgPool,
    user_id: Uuid,
    floor_number: i32,
) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as(
        r"
        SELECT EXISTS(
            SELECT 1 FROM floor_captain_assignments
            WHERE user_id = $1 AND floor_number = $2
        )
        ",
    )
    .bind(user_id)
    .bind(floor_number)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}
