//! Directory handlers.

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::CookieJar;
use tenant_common::VerificationStatus;

use super::queries;
use super::types::{DirectoryFilters, DirectoryView, ResidentProfile};
use crate::api::{ActionError, AppState};
use crate::auth::{require_roles, AuthContext, DIRECTORY_ROLES};
use crate::db::Profile;

/// Only approved residents may browse the directory, whatever their roles.
pub fn ensure_verified(profile: Option<&Profile>) -> Result<(), ActionError> {
    match profile {
        Some(p) if p.verification_status == VerificationStatus::Approved => Ok(()),
        _ => Err(ActionError::Forbidden(
            "Only verified residents can access the directory",
        )),
    }
}

async fn directory_caller(state: &AppState, jar: &CookieJar) -> Result<AuthContext, ActionError> {
    let ctx = require_roles(state, jar, DIRECTORY_ROLES).await?;
    ensure_verified(ctx.profile.as_ref())?;
    Ok(ctx)
}

async fn residents(
    state: &AppState,
    filters: &DirectoryFilters,
) -> Result<Vec<ResidentProfile>, ActionError> {
    let rows = queries::list_verified_residents(&state.db, filters)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch residents"))?;
    Ok(rows.into_iter().map(ResidentProfile::from).collect())
}

async fn floors(state: &AppState) -> Result<Vec<i32>, ActionError> {
    queries::list_directory_floors(&state.db)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floors"))
}

/// GET /dashboard/directory
pub async fn directory_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(filters): Query<DirectoryFilters>,
) -> Result<Json<DirectoryView>, ActionError> {
    directory_caller(&state, &jar).await?;

    Ok(Json(DirectoryView {
        residents: residents(&state, &filters).await?,
        floors: floors(&state).await?,
    }))
}

/// GET /dashboard/directory/residents
#[tracing::instrument(skip(state, jar))]
pub async fn fetch_verified_residents(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(filters): Query<DirectoryFilters>,
) -> Result<Json<Vec<ResidentProfile>>, ActionError> {
    directory_caller(&state, &jar).await?;
    residents(&state, &filters).await.map(Json)
}

/// GET /dashboard/directory/floors
pub async fn fetch_available_floors(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<i32>>, ActionError> {
    directory_caller(&state, &jar).await?;
    floors(&state).await.map(Json)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn profile(status: VerificationStatus) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            display_name: None,
            bio: None,
            phone: None,
            profile_picture_url: None,
            occupation: None,
            move_in_date: None,
            residency_status: Some("current".into()),
            languages_spoken: None,
            social_media_links: None,
            unit_id: None,
            profile_visibility: "residents".into(),
            verification_status: status,
            verified_by: None,
            verified_at: None,
            verification_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn approved_profile_passes() {
        assert!(ensure_verified(Some(&profile(VerificationStatus::Approved))).is_ok());
    }

    #[test]
    fn unverified_callers_are_refused() {
        let expected = Err(ActionError::Forbidden(
            "Only verified residents can access the directory",
        ));
        assert_eq!(ensure_verified(Some(&profile(VerificationStatus::Pending))), expected);
        assert_eq!(ensure_verified(Some(&profile(VerificationStatus::Rejected))), expected);
        assert_eq!(ensure_verified(None), expected);
    }
}
