use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        GenerateMealPlanRequest, ListQuery, MealPlanListResponse, MealPlanResponse, StatusResponse,
        UpdateStatusRequest, UsageResponse,
    },
    model::PlanStatus,
    pipeline::generate_meal_plan,
};
use crate::{auth::extractors::AuthUser, error::GenerationError, quota::enforcer, state::AppState};

const MAX_PAGE: i64 = 100;

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_plans))
        .route("/meal-plans/generate", post(generate))
        .route("/meal-plans/usage", get(usage))
        .route("/meal-plans/:id", get(get_plan))
        .route("/meal-plans/:id/status", patch(update_status))
}

#[instrument(skip(state, body))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<GenerateMealPlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MealPlanResponse>), GenerationError> {
    let Json(body) = body.map_err(|e| GenerationError::InvalidRequest(e.body_text()))?;
    let plan = generate_meal_plan(&state, user_id, body.into(), OffsetDateTime::now_utc()).await?;
    Ok((
        StatusCode::CREATED,
        Json(MealPlanResponse {
            success: true,
            meal_plan: plan,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn usage(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UsageResponse>, GenerationError> {
    let usage = enforcer::usage(&state, user_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(UsageResponse {
        success: true,
        usage,
    }))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<MealPlanListResponse>, (StatusCode, String)> {
    let status = match q.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            PlanStatus::parse(s)
                .ok_or((StatusCode::BAD_REQUEST, format!("unknown status {s:?}")))?,
        ),
    };
    let limit = q.limit.clamp(1, MAX_PAGE);
    let offset = q.offset.max(0);

    let meal_plans = state
        .plans
        .list_plans(user_id, status, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(MealPlanListResponse {
        success: true,
        meal_plans,
        limit,
        offset,
    }))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealPlanResponse>, (StatusCode, String)> {
    match state.plans.get_plan(user_id, id).await.map_err(internal)? {
        Some(plan) => Ok(Json(MealPlanResponse {
            success: true,
            meal_plan: plan,
        })),
        None => Err((StatusCode::NOT_FOUND, "Meal plan not found".into())),
    }
}

#[instrument(skip(state, body))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let plan = state
        .plans
        .get_plan(user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Meal plan not found".to_string()))?;

    if !plan.status.can_transition_to(body.status) {
        warn!(%id, from = plan.status.as_str(), to = body.status.as_str(), "status change refused");
        return Err((
            StatusCode::CONFLICT,
            format!(
                "cannot move a {} plan to {}",
                plan.status.as_str(),
                body.status.as_str()
            ),
        ));
    }

    if !state
        .plans
        .update_status(user_id, id, plan.status, body.status)
        .await
        .map_err(internal)?
    {
        // Another request changed the status after it was read.
        let exists = state.plans.get_plan(user_id, id).await.map_err(internal)?.is_some();
        if !exists {
            return Err((StatusCode::NOT_FOUND, "Meal plan not found".into()));
        }
        warn!(%id, from = plan.status.as_str(), to = body.status.as_str(), "status changed concurrently");
        return Err((
            StatusCode::CONFLICT,
            "meal plan status changed, reload and try again".into(),
        ));
    }

    info!(%id, from = plan.status.as_str(), to = body.status.as_str(), "meal plan status changed");
    Ok(Json(StatusResponse {
        success: true,
        id,
        status: body.status,
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
}
