use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Source of a user's current subscription tier.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Name of the active tier, `None` when the user has no live subscription.
    async fn tier_name(&self, user_id: Uuid) -> anyhow::Result<Option<String>>;
}

/// Reads the subscription mirror kept up to date by the billing webhook.
#[derive(Clone)]
pub struct PgSubscriptionProvider {
    db: PgPool,
}

impl PgSubscriptionProvider {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionProvider for PgSubscriptionProvider {
    async fn tier_name(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT tier
              FROM subscriptions
             WHERE user_id = $1 AND status IN ('active', 'trialing')
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("load subscription for user {user_id}"))?;
        Ok(row.map(|(tier,)| tier))
    }
}
