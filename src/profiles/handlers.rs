use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{dto::ProfileResponse, model::HealthProfile};
use crate::{auth::extractors::AuthUser, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/health-profile",
        get(get_profile)
            .put(put_profile)
            .patch(patch_profile)
            .delete(delete_profile),
    )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    match state.profiles.get_profile(user_id).await {
        Ok(Some(profile)) => Ok(Json(profile.into())),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Health profile not found".into())),
        Err(e) => {
            error!(error = %format!("{e:#}"), %user_id, "get_profile failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load health profile".into()))
        }
    }
}

#[instrument(skip(state, profile))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(profile): Json<HealthProfile>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    save_profile(&state, user_id, profile).await
}

/// Replaces only the fields present in the body, then validates the result
/// as a whole.
#[instrument(skip(state, patch))]
pub async fn patch_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(patch): Json<Value>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let Value::Object(fields) = patch else {
        return Err((StatusCode::BAD_REQUEST, "expected a JSON object".into()));
    };

    let current = match state.profiles.get_profile(user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Health profile not found".into())),
        Err(e) => {
            error!(error = %format!("{e:#}"), %user_id, "get_profile failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load health profile".into()));
        }
    };

    let profile = current.apply_patch(&fields).map_err(|e| {
        warn!(%user_id, error = %e, "health profile patch rejected");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;
    save_profile(&state, user_id, profile).await
}

/// Soft-unlinks the profile; stored plans are kept.
#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    match state.profiles.unlink_profile(user_id).await {
        Ok(true) => {
            info!(%user_id, "health profile unlinked");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err((StatusCode::NOT_FOUND, "Health profile not found".into())),
        Err(e) => {
            error!(error = %format!("{e:#}"), %user_id, "unlink_profile failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete health profile".into()))
        }
    }
}

async fn save_profile(
    state: &AppState,
    user_id: Uuid,
    mut profile: HealthProfile,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    profile.allergies = normalize_list(profile.allergies);
    profile.intolerances = normalize_list(profile.intolerances);

    let problems = profile.validate();
    if !problems.is_empty() {
        warn!(%user_id, ?problems, "health profile rejected");
        return Err((StatusCode::BAD_REQUEST, problems.join("; ")));
    }

    if let Err(e) = state.profiles.upsert_profile(user_id, &profile).await {
        error!(error = %format!("{e:#}"), %user_id, "upsert_profile failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to save health profile".into()));
    }

    info!(%user_id, condition = profile.primary_condition.slug(), "health profile saved");
    Ok(Json(profile.into()))
}

/// Trims free-text entries and drops blanks.
fn normalize_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
