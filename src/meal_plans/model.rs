use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::profiles::model::{DietaryPreference, HealthCondition};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Per-meal (or per-day) nutrition. Calories in kcal, sodium in mg, the rest in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl Add for NutritionInfo {
    type Output = NutritionInfo;

    fn add(self, rhs: Self) -> Self::Output {
        NutritionInfo {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
            fiber: self.fiber + rhs.fiber,
            sugar: self.sugar + rhs.sugar,
            sodium: self.sodium + rhs.sodium,
        }
    }
}

impl<'a> Sum<&'a NutritionInfo> for NutritionInfo {
    fn sum<I: Iterator<Item = &'a NutritionInfo>>(iter: I) -> Self {
        iter.fold(NutritionInfo::default(), |acc, n| acc + *n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub name: String,
    pub description: String,
    pub prep_time: u32,
    pub cooking_time: u32,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub nutrition: NutritionInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u8,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub breakfast: Meal,
    pub lunch: Meal,
    pub dinner: Meal,
    #[serde(default)]
    pub snacks: Vec<Meal>,
    pub total_nutrition: NutritionInfo,
}

impl DayPlan {
    /// Meals in slot order: breakfast, lunch, dinner, then snacks.
    pub fn meals(&self) -> impl Iterator<Item = &Meal> {
        [&self.breakfast, &self.lunch, &self.dinner]
            .into_iter()
            .chain(self.snacks.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub quantity: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

/// Average daily intake across the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub average_daily_calories: f64,
    pub average_daily_protein: f64,
    pub average_daily_carbs: f64,
    pub average_daily_fat: f64,
    pub average_daily_fiber: f64,
    pub average_daily_sugar: f64,
    pub average_daily_sodium: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PlanStatus::Draft),
            "active" => Some(PlanStatus::Active),
            "completed" => Some(PlanStatus::Completed),
            "archived" => Some(PlanStatus::Archived),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: PlanStatus) -> bool {
        use PlanStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Archived) | (Active, Completed) | (Active, Archived) | (Completed, Archived)
        )
    }
}

/// The persisted aggregate. Written once, as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub health_condition: HealthCondition,
    pub dietary_preferences: Vec<DietaryPreference>,
    pub duration_days: u8,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub days: Vec<DayPlan>,
    pub shopping_list: Vec<ShoppingItem>,
    pub nutrition_summary: NutritionSummary,
    pub health_tips: Vec<String>,
    pub status: PlanStatus,
    pub adherence_score: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// List view of a stored plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanSummary {
    pub id: Uuid,
    pub name: String,
    pub health_condition: HealthCondition,
    pub status: PlanStatus,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub duration_days: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&MealPlan> for MealPlanSummary {
    fn from(plan: &MealPlan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            health_condition: plan.health_condition,
            status: plan.status,
            start_date: plan.start_date,
            end_date: plan.end_date,
            duration_days: plan.duration_days,
            created_at: plan.created_at,
        }
    }
}
