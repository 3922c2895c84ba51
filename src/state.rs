use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::llm::{openai::OpenAiProvider, GenerationClient, GenerationProvider};
use crate::meal_plans::repo::{PgPlanStore, PlanStore};
use crate::profiles::repo::{PgProfileStore, ProfileStore};
use crate::quota::billing::{PgSubscriptionProvider, SubscriptionProvider};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub plans: Arc<dyn PlanStore>,
    pub billing: Arc<dyn SubscriptionProvider>,
    pub llm: GenerationClient,
}

impl AppState {
    /// Wires the Postgres-backed stores and the configured provider.
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let provider = Arc::new(OpenAiProvider::new(config.llm.clone())?) as Arc<dyn GenerationProvider>;
        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgProfileStore::new(db.clone())),
            Arc::new(PgPlanStore::new(db.clone())),
            Arc::new(PgSubscriptionProvider::new(db)),
            provider,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        profiles: Arc<dyn ProfileStore>,
        plans: Arc<dyn PlanStore>,
        billing: Arc<dyn SubscriptionProvider>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let llm = GenerationClient::new(provider, Duration::from_secs(config.llm.timeout_secs));
        Self {
            config,
            profiles,
            plans,
            billing,
            llm,
        }
    }

    /// In-memory collaborators only; nothing touches the network.
    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Harness::new().state
    }
}
