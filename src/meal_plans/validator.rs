//! Structural validation of raw provider output.
//!
//! The provider is untrusted: its text is parsed into a loose JSON value and
//! then walked field by field. Every violation is collected with its path
//! (`mealPlan[2].lunch.nutrition.sodium`) so a rejected attempt can be
//! diagnosed from the logs. Nothing is repaired or defaulted; unknown fields
//! are ignored and do not survive into the typed result.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::model::{Ingredient, Meal, NutritionInfo};
use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub path: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// One day of provider output. Any day-level totals the provider sent are
/// not carried over.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDay {
    pub breakfast: Meal,
    pub lunch: Meal,
    pub dinner: Meal,
    pub snacks: Vec<Meal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingEntry {
    pub name: String,
    pub quantity: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingCategory {
    pub category: String,
    pub items: Vec<ShoppingEntry>,
}

/// Averages as claimed by the provider. Checked for shape only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderNutritionSummary {
    pub average_daily_calories: f64,
    pub average_daily_protein: f64,
    pub average_daily_carbs: f64,
    pub average_daily_fat: f64,
    pub average_daily_fiber: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub days: Vec<ValidatedDay>,
    pub shopping_list: Vec<ShoppingCategory>,
    pub nutrition_summary: ProviderNutritionSummary,
    pub health_tips: Vec<String>,
}

/// Parses and validates a provider response that should describe
/// `expected_days` days.
pub fn validate_response(raw: &str, expected_days: usize) -> Result<ValidatedPlan, GenerationError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let mut c = Checker::default();
    let plan = plan(&mut c, &value, expected_days);

    match plan {
        Some(plan) if c.violations.is_empty() => Ok(plan),
        _ if c.violations.is_empty() => Err(GenerationError::SchemaViolation(vec![
            FieldViolation::new("$", "response could not be validated"),
        ])),
        _ => Err(GenerationError::SchemaViolation(c.violations)),
    }
}

fn plan(c: &mut Checker, value: &Value, expected_days: usize) -> Option<ValidatedPlan> {
    let root = c.object(Some(value), "")?;

    let days = c.array(root.get("mealPlan"), "mealPlan").and_then(|days| {
        if days.len() != expected_days {
            c.fail(
                "mealPlan",
                format!("expected {expected_days} days, got {}", days.len()),
            );
        }
        let parsed: Vec<Option<ValidatedDay>> = days
            .iter()
            .enumerate()
            .map(|(i, d)| day(c, d, &index("mealPlan", i)))
            .collect();
        parsed.into_iter().collect::<Option<Vec<_>>>()
    });

    let shopping_list = c
        .array(root.get("shoppingList"), "shoppingList")
        .and_then(|groups| {
            let parsed: Vec<Option<ShoppingCategory>> = groups
                .iter()
                .enumerate()
                .map(|(i, g)| shopping_category(c, g, &index("shoppingList", i)))
                .collect();
            parsed.into_iter().collect::<Option<Vec<_>>>()
        });

    let nutrition_summary = summary(c, root.get("nutritionSummary"), "nutritionSummary");
    let health_tips = c.strings(root.get("healthTips"), "healthTips");

    Some(ValidatedPlan {
        days: days?,
        shopping_list: shopping_list?,
        nutrition_summary: nutrition_summary?,
        health_tips: health_tips?,
    })
}

fn day(c: &mut Checker, value: &Value, path: &str) -> Option<ValidatedDay> {
    let obj = c.object(Some(value), path)?;
    let breakfast = meal(c, obj.get("breakfast"), &field(path, "breakfast"));
    let lunch = meal(c, obj.get("lunch"), &field(path, "lunch"));
    let dinner = meal(c, obj.get("dinner"), &field(path, "dinner"));

    let snacks_path = field(path, "snacks");
    let snacks = match present(obj.get("snacks")) {
        None => Some(Vec::new()),
        Some(v) => c.array(Some(v), &snacks_path).and_then(|items| {
            let parsed: Vec<Option<Meal>> = items
                .iter()
                .enumerate()
                .map(|(i, m)| meal(c, Some(m), &index(&snacks_path, i)))
                .collect();
            parsed.into_iter().collect::<Option<Vec<_>>>()
        }),
    };

    Some(ValidatedDay {
        breakfast: breakfast?,
        lunch: lunch?,
        dinner: dinner?,
        snacks: snacks?,
    })
}

fn meal(c: &mut Checker, value: Option<&Value>, path: &str) -> Option<Meal> {
    let obj = c.object(value, path)?;
    let name = c.string(obj.get("name"), &field(path, "name"));
    let description = c.string(obj.get("description"), &field(path, "description"));
    let prep_time = c.whole(obj.get("prepTime"), &field(path, "prepTime"), 0);
    let cooking_time = c.whole(obj.get("cookingTime"), &field(path, "cookingTime"), 0);
    let servings = c.whole(obj.get("servings"), &field(path, "servings"), 1);

    let ingredients_path = field(path, "ingredients");
    let ingredients = c.array(obj.get("ingredients"), &ingredients_path).and_then(|items| {
        let parsed: Vec<Option<Ingredient>> = items
            .iter()
            .enumerate()
            .map(|(i, v)| ingredient(c, v, &index(&ingredients_path, i)))
            .collect();
        parsed.into_iter().collect::<Option<Vec<_>>>()
    });

    let instructions_path = field(path, "instructions");
    let instructions = c.strings(obj.get("instructions"), &instructions_path);
    if instructions.as_ref().is_some_and(Vec::is_empty) {
        c.fail(&instructions_path, "at least one instruction step is required");
    }

    let nutrition = nutrition(c, obj.get("nutrition"), &field(path, "nutrition"));

    let tips_path = field(path, "tips");
    let tips = match present(obj.get("tips")) {
        None => Some(Vec::new()),
        Some(v) => c.strings(Some(v), &tips_path),
    };

    Some(Meal {
        name: name?,
        description: description?,
        prep_time: prep_time?,
        cooking_time: cooking_time?,
        servings: servings?,
        ingredients: ingredients?,
        instructions: instructions.filter(|steps| !steps.is_empty())?,
        nutrition: nutrition?,
        tips: tips?,
    })
}

fn ingredient(c: &mut Checker, value: &Value, path: &str) -> Option<Ingredient> {
    let obj = c.object(Some(value), path)?;
    let name = c.string(obj.get("name"), &field(path, "name"));
    let amount = c.number(obj.get("amount"), &field(path, "amount"));
    let unit = c.string(obj.get("unit"), &field(path, "unit"));
    Some(Ingredient {
        name: name?,
        amount: amount?,
        unit: unit?,
    })
}

fn nutrition(c: &mut Checker, value: Option<&Value>, path: &str) -> Option<NutritionInfo> {
    let obj = c.object(value, path)?;
    let mut get = |key: &str| c.number(obj.get(key), &field(path, key));
    let calories = get("calories");
    let protein = get("protein");
    let carbs = get("carbs");
    let fat = get("fat");
    let fiber = get("fiber");
    let sugar = get("sugar");
    let sodium = get("sodium");
    Some(NutritionInfo {
        calories: calories?,
        protein: protein?,
        carbs: carbs?,
        fat: fat?,
        fiber: fiber?,
        sugar: sugar?,
        sodium: sodium?,
    })
}

fn shopping_category(c: &mut Checker, value: &Value, path: &str) -> Option<ShoppingCategory> {
    let obj = c.object(Some(value), path)?;
    let category = c.string(obj.get("category"), &field(path, "category"));

    let items_path = field(path, "items");
    let items = c.array(obj.get("items"), &items_path).and_then(|items| {
        let parsed: Vec<Option<ShoppingEntry>> = items
            .iter()
            .enumerate()
            .map(|(i, v)| shopping_entry(c, v, &index(&items_path, i)))
            .collect();
        parsed.into_iter().collect::<Option<Vec<_>>>()
    });

    Some(ShoppingCategory {
        category: category?,
        items: items?,
    })
}

fn shopping_entry(c: &mut Checker, value: &Value, path: &str) -> Option<ShoppingEntry> {
    let obj = c.object(Some(value), path)?;
    let name = c.string(obj.get("name"), &field(path, "name"));
    let quantity = c.string(obj.get("quantity"), &field(path, "quantity"));
    let notes = match present(obj.get("notes")) {
        None => Some(None),
        Some(v) => c.string(Some(v), &field(path, "notes")).map(Some),
    };
    Some(ShoppingEntry {
        name: name?,
        quantity: quantity?,
        notes: notes?,
    })
}

fn summary(c: &mut Checker, value: Option<&Value>, path: &str) -> Option<ProviderNutritionSummary> {
    let obj = c.object(value, path)?;
    let mut get = |key: &str| c.number(obj.get(key), &field(path, key));
    let calories = get("averageDailyCalories");
    let protein = get("averageDailyProtein");
    let carbs = get("averageDailyCarbs");
    let fat = get("averageDailyFat");
    let fiber = get("averageDailyFiber");
    Some(ProviderNutritionSummary {
        average_daily_calories: calories?,
        average_daily_protein: protein?,
        average_daily_carbs: carbs?,
        average_daily_fat: fat?,
        average_daily_fiber: fiber?,
    })
}

/// Optional fields: absent and explicit `null` mean the same thing.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn field(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn fail(&mut self, path: &str, reason: impl Into<String>) {
        let path = if path.is_empty() { "$" } else { path };
        self.violations.push(FieldViolation::new(path, reason));
    }

    fn expect<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Value> {
        if value.is_none() {
            self.fail(path, "required field is missing");
        }
        value
    }

    fn mismatch(&mut self, path: &str, expected: &str, got: &Value) {
        self.fail(path, format!("expected {expected}, got {}", kind(got)));
    }

    fn object<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Map<String, Value>> {
        let value = self.expect(value, path)?;
        let obj = value.as_object();
        if obj.is_none() {
            self.mismatch(path, "object", value);
        }
        obj
    }

    fn array<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Vec<Value>> {
        let value = self.expect(value, path)?;
        let arr = value.as_array();
        if arr.is_none() {
            self.mismatch(path, "array", value);
        }
        arr
    }

    fn string(&mut self, value: Option<&Value>, path: &str) -> Option<String> {
        let value = self.expect(value, path)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.mismatch(path, "string", value);
                None
            }
        }
    }

    fn strings(&mut self, value: Option<&Value>, path: &str) -> Option<Vec<String>> {
        let items = self.array(value, path)?;
        let parsed: Vec<Option<String>> = items
            .iter()
            .enumerate()
            .map(|(i, v)| self.string(Some(v), &index(path, i)))
            .collect();
        parsed.into_iter().collect()
    }

    /// A finite, non-negative number.
    fn number(&mut self, value: Option<&Value>, path: &str) -> Option<f64> {
        let value = self.expect(value, path)?;
        let Some(n) = value.as_f64() else {
            self.mismatch(path, "number", value);
            return None;
        };
        if !n.is_finite() || n < 0.0 {
            self.fail(path, format!("must be a non-negative number, got {n}"));
            return None;
        }
        Some(n)
    }

    /// A whole number no smaller than `min`.
    fn whole(&mut self, value: Option<&Value>, path: &str, min: u32) -> Option<u32> {
        let value = self.expect(value, path)?;
        let Some(n) = value.as_f64() else {
            self.mismatch(path, "number", value);
            return None;
        };
        if n.fract() != 0.0 || n < f64::from(min) || n > f64::from(u32::MAX) {
            self.fail(path, format!("must be a whole number >= {min}, got {n}"));
            return None;
        }
        Some(n as u32)
    }
}
