use time::{OffsetDateTime, UtcOffset};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{model::MealPlan, prompt, validator, writer};
use crate::{
    error::GenerationError,
    profiles::resolver::{resolve_request, GenerationOverrides},
    quota::enforcer::check_quota,
    state::AppState,
};

/// One generation attempt, start to finish.
///
/// Resolve the request, check the monthly allowance, compile the prompt,
/// call the provider once, validate, assemble and store. Quota is only
/// spent by the final insert, so any earlier failure leaves the user's
/// allowance and stored plans untouched.
#[instrument(skip(st, overrides), fields(days = overrides.duration_days))]
pub async fn generate_meal_plan(
    st: &AppState,
    user_id: Uuid,
    overrides: GenerationOverrides,
    now: OffsetDateTime,
) -> Result<MealPlan, GenerationError> {
    let today = now.to_offset(UtcOffset::UTC).date();
    let request = resolve_request(st, user_id, overrides, today).await?;

    let reservation = check_quota(st, user_id, now).await?;

    let compiled = prompt::compile(&request);
    let raw = st.llm.generate(&compiled).await?;

    let validated = validator::validate_response(&raw, usize::from(request.duration_days))?;
    let plan = writer::assemble(user_id, &request, validated, now)?;
    writer::persist(st, &plan, &reservation).await?;

    info!(
        plan_id = %plan.id,
        condition = plan.health_condition.slug(),
        tier = %reservation.tier.name,
        "meal plan generated"
    );
    Ok(plan)
}
