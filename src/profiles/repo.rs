use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::model::HealthProfile;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The user's active profile; unlinked profiles count as absent.
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<HealthProfile>>;
    async fn upsert_profile(&self, user_id: Uuid, profile: &HealthProfile) -> anyhow::Result<()>;
    /// Soft-unlinks the active profile. Returns false when there was none.
    async fn unlink_profile(&self, user_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<HealthProfile>> {
        let row = sqlx::query_as::<_, (Json<HealthProfile>,)>(
            r#"
            SELECT profile
              FROM health_profiles
             WHERE user_id = $1 AND unlinked_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("load health profile for user {user_id}"))?;

        Ok(row.map(|(Json(profile),)| profile))
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: &HealthProfile) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO health_profiles (user_id, primary_condition, profile)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
               SET primary_condition = EXCLUDED.primary_condition,
                   profile = EXCLUDED.profile,
                   unlinked_at = NULL,
                   updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(profile.primary_condition.slug())
        .bind(Json(profile))
        .execute(&self.db)
        .await
        .with_context(|| format!("upsert health profile for user {user_id}"))?;
        Ok(())
    }

    async fn unlink_profile(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE health_profiles
               SET unlinked_at = now(),
                   updated_at = now()
             WHERE user_id = $1 AND unlinked_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await
        .with_context(|| format!("unlink health profile for user {user_id}"))?;
        Ok(res.rows_affected() == 1)
    }
}
