use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

use super::model::{MealPlan, MealPlanSummary, PlanStatus};
use crate::profiles::model::HealthCondition;
use crate::quota::{enforcer::QuotaReservation, tiers::MonthlyLimit};

#[derive(Debug, thiserror::Error)]
pub enum CreatePlanError {
    #[error("monthly limit reached: {count}/{limit}")]
    QuotaExceeded { limit: u32, count: i64 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn count_plans_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64>;

    /// Re-checks the reservation's monthly limit and inserts the whole plan
    /// in one atomic step. Concurrent calls for the same user are serialised.
    async fn create_plan(
        &self,
        plan: &MealPlan,
        reservation: &QuotaReservation,
    ) -> Result<Uuid, CreatePlanError>;

    async fn list_plans(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>>;

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlan>>;

    /// Moves the plan from `from` to `to` only if it is still in `from`.
    /// Returns false when no such plan belongs to the user or its status has
    /// already changed.
    async fn update_status(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Advisory lock key for one user's plan writes.
fn lock_key(user_id: Uuid) -> i64 {
    let (hi, lo) = user_id.as_u64_pair();
    (hi ^ lo) as i64
}

#[derive(Debug, FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    health_condition: String,
    status: String,
    start_date: Date,
    end_date: Date,
    duration_days: i16,
    created_at: OffsetDateTime,
}

impl From<PlanRow> for MealPlanSummary {
    fn from(r: PlanRow) -> Self {
        let health_condition = HealthCondition::from_slug(&r.health_condition).unwrap_or_else(|| {
            warn!(plan_id = %r.id, value = %r.health_condition, "unknown stored health condition");
            HealthCondition::default()
        });
        let status = PlanStatus::parse(&r.status).unwrap_or_else(|| {
            warn!(plan_id = %r.id, value = %r.status, "unknown stored plan status");
            PlanStatus::Active
        });
        let duration_days = u8::try_from(r.duration_days).unwrap_or_else(|_| {
            warn!(plan_id = %r.id, value = r.duration_days, "stored duration out of range");
            0
        });
        Self {
            id: r.id,
            name: r.name,
            health_condition,
            status,
            start_date: r.start_date,
            end_date: r.end_date,
            duration_days,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn count_plans_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*)
              FROM meal_plans
             WHERE user_id = $1 AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.db)
        .await
        .with_context(|| format!("count meal plans for user {user_id}"))?;
        Ok(count)
    }

    async fn create_plan(
        &self,
        plan: &MealPlan,
        reservation: &QuotaReservation,
    ) -> Result<Uuid, CreatePlanError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock_key(plan.user_id))
            .execute(&mut *tx)
            .await
            .context("acquire plan lock")?;

        if let MonthlyLimit::Limited(limit) = reservation.limit() {
            let (count,) = sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM meal_plans WHERE user_id = $1 AND created_at >= $2",
            )
            .bind(plan.user_id)
            .bind(reservation.window_start)
            .fetch_one(&mut *tx)
            .await
            .context("recount meal plans")?;

            if !reservation.limit().allows(count) {
                tx.rollback().await.context("rollback tx")?;
                return Err(CreatePlanError::QuotaExceeded { limit, count });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO meal_plans
                (id, user_id, name, health_condition, status, start_date, end_date,
                 duration_days, document, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.name)
        .bind(plan.health_condition.slug())
        .bind(plan.status.as_str())
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(i16::from(plan.duration_days))
        .bind(Json(plan))
        .bind(plan.created_at)
        .execute(&mut *tx)
        .await
        .context("insert meal plan")?;

        tx.commit().await.context("commit tx")?;
        Ok(plan.id)
    }

    async fn list_plans(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, name, health_condition, status, start_date, end_date,
                   duration_days, created_at
              FROM meal_plans
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status.map(PlanStatus::as_str))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list meal plans for user {user_id}"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlan>> {
        let row = sqlx::query_as::<_, (Json<MealPlan>,)>(
            "SELECT document FROM meal_plans WHERE id = $1 AND user_id = $2",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("load meal plan {plan_id}"))?;
        Ok(row.map(|(Json(plan),)| plan))
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE meal_plans
               SET status = $3,
                   document = jsonb_set(document, '{status}', to_jsonb($3::text))
             WHERE id = $1 AND user_id = $2 AND status = $4
            "#,
        )
        .bind(plan_id)
        .bind(user_id)
        .bind(to.as_str())
        .bind(from.as_str())
        .execute(&self.db)
        .await
        .with_context(|| format!("update status of meal plan {plan_id}"))?;
        Ok(res.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_plan, MemoryPlanStore};
    use time::macros::{date, datetime};

    fn row(condition: &str, status: &str, duration_days: i16) -> PlanRow {
        PlanRow {
            id: Uuid::new_v4(),
            name: "3-Day Meal Plan".into(),
            health_condition: condition.into(),
            status: status.into(),
            start_date: date!(2025 - 03 - 01),
            end_date: date!(2025 - 03 - 03),
            duration_days,
            created_at: datetime!(2025-02-28 12:00 UTC),
        }
    }

    #[test]
    fn lock_key_is_stable_per_user() {
        let user = Uuid::new_v4();
        assert_eq!(lock_key(user), lock_key(user));
        assert_ne!(lock_key(Uuid::from_u128(1)), lock_key(Uuid::from_u128(2)));
    }

    #[test]
    fn summary_row_decodes_stored_values() {
        let summary = MealPlanSummary::from(row("kidney-disease", "archived", 3));
        assert_eq!(summary.health_condition, HealthCondition::KidneyDisease);
        assert_eq!(summary.status, PlanStatus::Archived);
        assert_eq!(summary.duration_days, 3);
    }

    #[test]
    fn corrupt_summary_row_still_decodes() {
        let summary = MealPlanSummary::from(row("gout", "paused", 400));
        assert_eq!(summary.health_condition, HealthCondition::GeneralWellness);
        assert_eq!(summary.status, PlanStatus::Active);
        assert_eq!(summary.duration_days, 0);
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let store = MemoryPlanStore::default();
        let user = Uuid::new_v4();
        let plan = sample_plan(user, datetime!(2025-05-02 09:00 UTC));
        store.insert(plan.clone());

        assert!(store
            .update_status(user, plan.id, PlanStatus::Active, PlanStatus::Archived)
            .await
            .unwrap());
        // A second writer that read the plan while it was still active loses.
        assert!(!store
            .update_status(user, plan.id, PlanStatus::Active, PlanStatus::Completed)
            .await
            .unwrap());
        assert_eq!(store.all()[0].status, PlanStatus::Archived);

        assert!(!store
            .update_status(Uuid::new_v4(), plan.id, PlanStatus::Archived, PlanStatus::Archived)
            .await
            .unwrap());
    }
}
