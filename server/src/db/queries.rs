//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tenant_common::{RoleName, VerificationStatus};
use tracing::{error, warn};
use uuid::Uuid;

use super::models::{Profile, Role, Session, User};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find user by email (case-insensitive).
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_email", email = %email))
}

/// Check if email exists.
pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
            .bind(email)
            .fetch_one(pool)
            .await?;

    Ok(result.0)
}

/// Create a new user with a hashed password.
pub async fn create_user<'e, E>(executor: E, email: &str, password_hash: &str) -> sqlx::Result<User>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING *
        ",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(executor)
    .await
    .map_err(db_error!("create_user", email = %email))
}

/// Record a successful login.
pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(db_error!("touch_last_login", user_id = %user_id))?;
    Ok(())
}

// ============================================================================
// Profile Queries
// ============================================================================

/// Find the profile belonging to a user.
pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>("SELECT * FROM user_profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_profile", user_id = %user_id))
}

/// Create a pending profile for a freshly registered user.
pub async fn create_profile<'e, E>(
    executor: E,
    user_id: Uuid,
    first_name: &str,
    last_name: &str,
    unit_id: Option<Uuid>,
) -> sqlx::Result<Profile>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Profile>(
        r"
        INSERT INTO user_profiles
            (id, first_name, last_name, display_name, unit_id, verification_status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(format!("{first_name} {last_name}"))
    .bind(unit_id)
    .bind(VerificationStatus::Pending.as_str())
    .fetch_one(executor)
    .await
    .map_err(db_error!("create_profile", user_id = %user_id))
}

/// Create a user, their pending profile and the Resident role in one transaction.
///
/// Nothing is written unless every insert succeeds.
pub async fn create_account(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    unit_id: Option<Uuid>,
) -> sqlx::Result<User> {
    let mut tx = pool
        .begin()
        .await
        .map_err(db_error!("create_account", email = %email))?;

    let user = create_user(&mut *tx, email, password_hash).await?;
    create_profile(&mut *tx, user.id, first_name, last_name, unit_id).await?;

    match find_role_by_name(&mut *tx, RoleName::Resident.as_str()).await? {
        Some(role) => assign_role(&mut *tx, user.id, role.id, None).await?,
        None => warn!(user_id = %user.id, "Resident role missing, registering without role"),
    }

    tx.commit()
        .await
        .map_err(db_error!("create_account", email = %email))?;
    Ok(user)
}

/// Find a unit id by its unit number.
pub async fn find_unit_id_by_number(pool: &PgPool, unit_number: &str) -> sqlx::Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM units WHERE unit_number = $1")
        .bind(unit_number)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_unit_id_by_number", unit_number = %unit_number))?;
    Ok(row.map(|r| r.0))
}

// ============================================================================
// Role Queries
// ============================================================================

/// Find a role by its exact name.
pub async fn find_role_by_name<'e, E>(executor: E, name: &str) -> sqlx::Result<Option<Role>>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await
        .map_err(db_error!("find_role_by_name", role = %name))
}

/// List the roles held by a user, by name.
pub async fn list_user_roles(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Role>> {
    sqlx::query_as::<_, Role>(
        r"
        SELECT r.*
        FROM roles r
        JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = $1
        ORDER BY r.name
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_user_roles", user_id = %user_id))
}

/// Grant a role to a user. Granting an already-held role is a no-op.
pub async fn assign_role<'e, E>(
    executor: E,
    user_id: Uuid,
    role_id: Uuid,
    assigned_by: Option<Uuid>,
) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO user_roles (user_id, role_id, assigned_by)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, role_id) DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(role_id)
    .bind(assigned_by)
    .execute(executor)
    .await
    .map_err(db_error!("assign_role", user_id = %user_id, role_id = %role_id))?;
    Ok(())
}

// ============================================================================
// Session Queries
// ============================================================================

/// Create a new session row keyed by the token's `jti`.
pub async fn create_session(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<Session> {
    sqlx::query_as::<_, Session>(
        r"
        INSERT INTO sessions (id, user_id, token_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_session", user_id = %user_id))
}

/// Find an unexpired session by ID.
pub async fn find_active_session(pool: &PgPool, session_id: Uuid) -> sqlx::Result<Option<Session>> {
    sqlx::query_as::<_, Session>(
        r"
        SELECT * FROM sessions
        WHERE id = $1 AND expires_at > NOW()
        ",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_active_session", session_id = %session_id))
}

/// Delete a session by ID.
pub async fn delete_session(pool: &PgPool, session_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(db_error!("delete_session", session_id = %session_id))?;
    Ok(())
}

/// Clean up expired sessions (for background job).
pub async fn cleanup_expired_sessions(pool: &PgPool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await
        .map_err(|e| {
            error!(query = "cleanup_expired_sessions", error = %e, "Database query failed");
            e
        })?;
    Ok(result.rows_affected())
}
