use serde::Serialize;
use time::{OffsetDateTime, Time, UtcOffset};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::tiers::{MonthlyLimit, PlanTier};
use crate::{error::GenerationError, state::AppState};

/// Admission granted by the pre-generation quota check.
///
/// Holding one does not consume anything: the unit is only spent when the
/// plan store re-checks the count and inserts the plan in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaReservation {
    pub user_id: Uuid,
    pub tier: PlanTier,
    pub window_start: OffsetDateTime,
}

impl QuotaReservation {
    pub fn limit(&self) -> MonthlyLimit {
        self.tier.monthly_limit
    }
}

/// Usage for the current billing month.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRecord {
    pub tier: String,
    pub limit: Option<u32>,
    pub used: i64,
    pub remaining: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(UtcOffset::UTC);
    let first = now.date() - time::Duration::days(i64::from(now.day()) - 1);
    first.with_time(Time::MIDNIGHT).assume_utc()
}

async fn resolve_tier(st: &AppState, user_id: Uuid) -> Result<PlanTier, GenerationError> {
    let name = st
        .billing
        .tier_name(user_id)
        .await
        .map_err(GenerationError::Internal)?;
    Ok(st.config.tiers.resolve(name.as_deref()))
}

/// Fails with `QuotaExceeded` when the user's tier has no generations left
/// this month.
#[instrument(skip(st))]
pub async fn check_quota(
    st: &AppState,
    user_id: Uuid,
    now: OffsetDateTime,
) -> Result<QuotaReservation, GenerationError> {
    let tier = resolve_tier(st, user_id).await?;
    let window_start = month_start(now);

    if let MonthlyLimit::Limited(limit) = tier.monthly_limit {
        let used = st
            .plans
            .count_plans_since(user_id, window_start)
            .await
            .map_err(GenerationError::Internal)?;
        if !tier.monthly_limit.allows(used) {
            return Err(GenerationError::QuotaExceeded {
                tier: tier.name,
                limit,
                count: used,
            });
        }
        debug!(tier = %tier.name, used, limit, "quota available");
    }

    Ok(QuotaReservation {
        user_id,
        tier,
        window_start,
    })
}

pub async fn usage(
    st: &AppState,
    user_id: Uuid,
    now: OffsetDateTime,
) -> Result<QuotaRecord, GenerationError> {
    let tier = resolve_tier(st, user_id).await?;
    let period_start = month_start(now);
    let used = st
        .plans
        .count_plans_since(user_id, period_start)
        .await
        .map_err(GenerationError::Internal)?;
    let limit = tier.monthly_limit.as_option();
    Ok(QuotaRecord {
        tier: tier.name,
        limit,
        used,
        remaining: limit.map(|l| (i64::from(l) - used).max(0)),
        period_start,
    })
}
