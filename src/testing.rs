//! In-memory collaborators and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::config::{AppConfig, JwtConfig, LlmConfig};
use crate::llm::{CompiledPrompt, GenerationClient, GenerationProvider, ProviderError};
use crate::meal_plans::{
    model::{MealPlan, MealPlanSummary, PlanStatus},
    repo::{CreatePlanError, PlanStore},
    validator::validate_response,
    writer::assemble,
};
use crate::profiles::{
    model::{sample_profile, HealthProfile},
    repo::ProfileStore,
    resolver::{merge, GenerationOverrides},
};
use crate::quota::{billing::SubscriptionProvider, enforcer::QuotaReservation, tiers::TierConfig};
use crate::state::AppState;

/// A well-formed provider response for `days` days: 300/400/500 kcal for
/// breakfast, lunch and dinner, no snacks.
pub fn provider_payload(days: usize) -> Value {
    let meal = |name: String, calories: f64, ingredients: Value| {
        json!({
            "name": name,
            "description": "Simple and balanced",
            "prepTime": 10,
            "cookingTime": 15,
            "servings": 1,
            "ingredients": ingredients,
            "instructions": ["Prepare the ingredients", "Cook and serve"],
            "nutrition": {
                "calories": calories,
                "protein": calories / 20.0,
                "carbs": calories / 10.0,
                "fat": calories / 40.0,
                "fiber": 6,
                "sugar": 5.5,
                "sodium": calories / 2.0
            },
            "tips": ["Swap in seasonal vegetables"]
        })
    };

    let meal_plan: Vec<Value> = (0..days)
        .map(|i| {
            json!({
                "day": i + 1,
                "breakfast": meal(
                    format!("Breakfast bowl {}", i + 1),
                    300.0,
                    json!([{ "name": "rolled oats", "amount": 50, "unit": "g" }]),
                ),
                "lunch": meal(
                    format!("Lentil salad {}", i + 1),
                    400.0,
                    json!([
                        { "name": "green lentils", "amount": 80, "unit": "g" },
                        { "name": "cucumber", "amount": 0.5, "unit": "piece" }
                    ]),
                ),
                "dinner": meal(
                    format!("Baked salmon {}", i + 1),
                    500.0,
                    json!([{ "name": "salmon fillet", "amount": 150, "unit": "g" }]),
                ),
            })
        })
        .collect();

    json!({
        "mealPlan": meal_plan,
        "shoppingList": [
            {
                "category": "Produce",
                "items": [
                    { "name": "cucumber", "quantity": "2", "notes": "firm" },
                    { "name": "spinach", "quantity": "1 bag" }
                ]
            },
            {
                "category": "Pantry",
                "items": [{ "name": "rolled oats", "quantity": "500 g" }]
            }
        ],
        "nutritionSummary": {
            "averageDailyCalories": 1200,
            "averageDailyProtein": 60,
            "averageDailyCarbs": 120,
            "averageDailyFat": 30,
            "averageDailyFiber": 18
        },
        "healthTips": ["Pair carbohydrates with protein", "Walk after dinner"]
    })
}

enum Script {
    Reply(String),
    Fail(Box<dyn Fn() -> ProviderError + Send + Sync>),
}

/// Provider double that answers every call the same way.
pub struct ScriptedProvider {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<CompiledPrompt>>,
}

impl ScriptedProvider {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::new(Script::Reply(text.into()))
    }

    pub fn fail(make: impl Fn() -> ProviderError + Send + Sync + 'static) -> Self {
        Self::new(Script::Fail(Box::new(make)))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<CompiledPrompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete_json(&self, prompt: &CompiledPrompt) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail(make) => Err(make()),
        }
    }
}

/// Profiles keyed by user; unlinked entries are kept but hidden.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, (HealthProfile, bool)>>,
}

impl MemoryProfileStore {
    pub fn is_unlinked(&self, user_id: Uuid) -> bool {
        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .is_some_and(|(_, unlinked)| *unlinked)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<HealthProfile>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .get(&user_id)
            .filter(|(_, unlinked)| !unlinked)
            .map(|(profile, _)| profile.clone()))
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: &HealthProfile) -> anyhow::Result<()> {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id, (profile.clone(), false));
        Ok(())
    }

    async fn unlink_profile(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.get_mut(&user_id) {
            Some((_, unlinked)) if !*unlinked => {
                *unlinked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Plan store whose check-and-insert happens under one lock, like the
/// advisory-locked transaction in Postgres.
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<Vec<MealPlan>>,
    fail_writes: AtomicBool,
}

impl MemoryPlanStore {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, plan: MealPlan) {
        self.plans.lock().unwrap().push(plan);
    }

    pub fn all(&self) -> Vec<MealPlan> {
        self.plans.lock().unwrap().clone()
    }

    pub fn count_for(&self, user_id: Uuid) -> usize {
        self.plans.lock().unwrap().iter().filter(|p| p.user_id == user_id).count()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn count_plans_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64> {
        let plans = self.plans.lock().unwrap();
        Ok(plans
            .iter()
            .filter(|p| p.user_id == user_id && p.created_at >= since)
            .count() as i64)
    }

    async fn create_plan(
        &self,
        plan: &MealPlan,
        reservation: &QuotaReservation,
    ) -> Result<Uuid, CreatePlanError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CreatePlanError::Storage(anyhow::anyhow!("connection reset by peer")));
        }
        let mut plans = self.plans.lock().unwrap();
        if let Some(limit) = reservation.limit().as_option() {
            let count = plans
                .iter()
                .filter(|p| p.user_id == plan.user_id && p.created_at >= reservation.window_start)
                .count() as i64;
            if !reservation.limit().allows(count) {
                return Err(CreatePlanError::QuotaExceeded { limit, count });
            }
        }
        plans.push(plan.clone());
        Ok(plan.id)
    }

    async fn list_plans(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>> {
        let plans = self.plans.lock().unwrap();
        let mut mine: Vec<&MealPlan> = plans
            .iter()
            .filter(|p| p.user_id == user_id && status.map_or(true, |s| p.status == s))
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(MealPlanSummary::from)
            .collect())
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlan>> {
        let plans = self.plans.lock().unwrap();
        Ok(plans
            .iter()
            .find(|p| p.id == plan_id && p.user_id == user_id)
            .cloned())
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    ) -> anyhow::Result<bool> {
        let mut plans = self.plans.lock().unwrap();
        match plans
            .iter_mut()
            .find(|p| p.id == plan_id && p.user_id == user_id && p.status == from)
        {
            Some(plan) => {
                plan.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryBilling {
    tiers: Mutex<HashMap<Uuid, String>>,
}

impl MemoryBilling {
    pub fn set_tier(&self, user_id: Uuid, tier: &str) {
        self.tiers.lock().unwrap().insert(user_id, tier.to_string());
    }
}

#[async_trait]
impl SubscriptionProvider for MemoryBilling {
    async fn tier_name(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self.tiers.lock().unwrap().get(&user_id).cloned())
    }
}

pub fn test_config(jwt_secret: &str) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        jwt: JwtConfig {
            secret: jwt_secret.into(),
            issuer: "nutriplan-test".into(),
            audience: "nutriplan-test-users".into(),
        },
        llm: LlmConfig {
            timeout_secs: 5,
            ..LlmConfig::default()
        },
        tiers: TierConfig::default(),
    }
}

/// An `AppState` wired to in-memory collaborators, with handles kept so a
/// test can seed and inspect them.
pub struct Harness {
    pub state: AppState,
    pub profiles: Arc<MemoryProfileStore>,
    pub plans: Arc<MemoryPlanStore>,
    pub billing: Arc<MemoryBilling>,
    pub provider: Arc<ScriptedProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(ScriptedProvider::reply(provider_payload(3).to_string()))
    }

    pub fn with_provider(provider: ScriptedProvider) -> Self {
        Self::build(provider, "test-secret")
    }

    pub fn with_jwt_secret(secret: &str) -> Self {
        Self::build(ScriptedProvider::reply("{}"), secret)
    }

    fn build(provider: ScriptedProvider, jwt_secret: &str) -> Self {
        let profiles = Arc::new(MemoryProfileStore::default());
        let plans = Arc::new(MemoryPlanStore::default());
        let billing = Arc::new(MemoryBilling::default());
        let provider = Arc::new(provider);
        let state = AppState::from_parts(
            Arc::new(test_config(jwt_secret)),
            profiles.clone(),
            plans.clone(),
            billing.clone(),
            provider.clone(),
        );
        Self {
            state,
            profiles,
            plans,
            billing,
            provider,
        }
    }

    /// Replaces the provider deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.state.llm = GenerationClient::new(self.provider.clone(), timeout);
        self
    }

    pub fn add_profile(&self, user_id: Uuid) {
        self.profiles
            .profiles
            .lock()
            .unwrap()
            .insert(user_id, (sample_profile(), false));
    }

    /// Stores `n` finished one-day plans directly, bypassing quota.
    pub fn seed_plans(&self, user_id: Uuid, n: usize, created_at: OffsetDateTime) {
        for _ in 0..n {
            self.plans.insert(sample_plan(user_id, created_at));
        }
    }
}

pub fn sample_plan(user_id: Uuid, created_at: OffsetDateTime) -> MealPlan {
    let request = merge(
        &sample_profile(),
        GenerationOverrides {
            duration_days: 1,
            ..Default::default()
        },
        created_at.date(),
    )
    .unwrap();
    let validated = validate_response(&provider_payload(1).to_string(), 1).unwrap();
    assemble(user_id, &request, validated, created_at).unwrap()
}

pub fn token_of_kind(state: &AppState, user_id: Uuid, kind: TokenKind) -> String {
    let cfg = &state.config.jwt;
    let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + 3600,
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .unwrap()
}

/// `Authorization` header value carrying a fresh access token.
pub fn bearer(state: &AppState, user_id: Uuid) -> String {
    format!("Bearer {}", token_of_kind(state, user_id, TokenKind::Access))
}
