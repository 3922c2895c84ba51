use super::model::{Meal, NutritionInfo, NutritionSummary};
use super::validator::ValidatedDay;

/// Field-wise sum over a day's meals in slot order (breakfast, lunch, dinner,
/// snacks). No rounding is applied.
pub fn day_total(day: &ValidatedDay) -> NutritionInfo {
    slot_order(day).map(|meal| &meal.nutrition).sum()
}

fn slot_order(day: &ValidatedDay) -> impl Iterator<Item = &Meal> {
    [&day.breakfast, &day.lunch, &day.dinner]
        .into_iter()
        .chain(day.snacks.iter())
}

/// Averages of the given day totals. An empty slice yields zeros.
pub fn summarize(day_totals: &[NutritionInfo]) -> NutritionSummary {
    if day_totals.is_empty() {
        return NutritionSummary::default();
    }
    let total: NutritionInfo = day_totals.iter().sum();
    let n = day_totals.len() as f64;
    NutritionSummary {
        average_daily_calories: total.calories / n,
        average_daily_protein: total.protein / n,
        average_daily_carbs: total.carbs / n,
        average_daily_fat: total.fat / n,
        average_daily_fiber: total.fiber / n,
        average_daily_sugar: total.sugar / n,
        average_daily_sodium: total.sodium / n,
    }
}
