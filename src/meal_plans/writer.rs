use time::{macros::format_description, Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    model::{DayPlan, MealPlan, PlanStatus},
    nutrition, shopping,
    repo::CreatePlanError,
    validator::ValidatedPlan,
};
use crate::{
    error::GenerationError, profiles::resolver::GenerationRequest,
    quota::enforcer::QuotaReservation, state::AppState,
};

/// Builds the full aggregate: dated days with recomputed totals, the flat
/// shopping list and averages over the recomputed totals.
pub fn assemble(
    user_id: Uuid,
    request: &GenerationRequest,
    validated: ValidatedPlan,
    now: OffsetDateTime,
) -> Result<MealPlan, GenerationError> {
    let start_date = request.start_date;
    let end_date = request.end_date().ok_or_else(|| {
        GenerationError::InvalidRequest("start date is out of the supported range".into())
    })?;

    let mut days = Vec::with_capacity(validated.days.len());
    for (offset, day) in validated.days.into_iter().enumerate() {
        let total_nutrition = nutrition::day_total(&day);
        let date = start_date
            .checked_add(Duration::days(offset as i64))
            .ok_or_else(|| GenerationError::InvalidRequest("plan runs past the supported date range".into()))?;
        days.push(DayPlan {
            day: (offset + 1) as u8,
            date,
            breakfast: day.breakfast,
            lunch: day.lunch,
            dinner: day.dinner,
            snacks: day.snacks,
            total_nutrition,
        });
    }

    let totals: Vec<_> = days.iter().map(|d| d.total_nutrition).collect();
    let condition = request.health_condition;
    let created_on = now
        .format(format_description!("[month repr:short] [day padding:none], [year]"))
        .map_err(|e| GenerationError::Internal(e.into()))?;

    Ok(MealPlan {
        id: Uuid::new_v4(),
        user_id,
        name: format!(
            "{}-Day Meal Plan for {}",
            request.duration_days,
            condition.display_name()
        ),
        description: format!("Personalized meal plan created on {created_on}"),
        health_condition: condition,
        dietary_preferences: request.dietary_preferences.clone(),
        duration_days: request.duration_days,
        start_date,
        end_date,
        days,
        shopping_list: shopping::flatten(validated.shopping_list),
        nutrition_summary: nutrition::summarize(&totals),
        health_tips: validated.health_tips,
        status: PlanStatus::Active,
        adherence_score: 0,
        created_at: now,
    })
}

/// Single atomic create. On any failure nothing is stored.
#[instrument(skip(st, plan, reservation), fields(plan_id = %plan.id, user_id = %plan.user_id))]
pub async fn persist(
    st: &AppState,
    plan: &MealPlan,
    reservation: &QuotaReservation,
) -> Result<Uuid, GenerationError> {
    match st.plans.create_plan(plan, reservation).await {
        Ok(id) => {
            info!(days = plan.days.len(), "meal plan stored");
            Ok(id)
        }
        Err(CreatePlanError::QuotaExceeded { limit, count }) => Err(GenerationError::QuotaExceeded {
            tier: reservation.tier.name.clone(),
            limit,
            count,
        }),
        Err(CreatePlanError::Storage(e)) => Err(GenerationError::PersistenceFailure(e)),
    }
}
