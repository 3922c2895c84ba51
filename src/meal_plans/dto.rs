use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::model::{MealPlan, MealPlanSummary, PlanStatus};
use crate::profiles::model::{BudgetLevel, CookingTime};
use crate::profiles::resolver::GenerationOverrides;
use crate::quota::enforcer::QuotaRecord;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMealPlanRequest {
    pub duration: u32,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub cooking_time: Option<CookingTime>,
    #[serde(default)]
    pub budget_level: Option<BudgetLevel>,
    #[serde(default)]
    pub cuisine_preferences: Option<Vec<String>>,
    #[serde(default)]
    pub custom_notes: Option<String>,
}

impl From<GenerateMealPlanRequest> for GenerationOverrides {
    fn from(req: GenerateMealPlanRequest) -> Self {
        Self {
            // Out-of-range values are rejected by the resolver.
            duration_days: u8::try_from(req.duration).unwrap_or(u8::MAX),
            start_date: req.start_date,
            cooking_time: req.cooking_time,
            budget_level: req.budget_level,
            cuisine_preferences: req.cuisine_preferences,
            custom_notes: req.custom_notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanResponse {
    pub success: bool,
    pub meal_plan: MealPlan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanListResponse {
    pub success: bool,
    pub meal_plans: Vec<MealPlanSummary>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub success: bool,
    pub usage: QuotaRecord,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PlanStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: PlanStatus,
}
