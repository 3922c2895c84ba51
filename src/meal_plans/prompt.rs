use std::fmt::Write as _;

use crate::llm::CompiledPrompt;
use crate::profiles::model::HealthCondition;
use crate::profiles::resolver::GenerationRequest;

/// Instruction sets available to the compiler. Conditions without a
/// dedicated set use `GeneralWellness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionTemplate {
    Diabetes,
    Hypertension,
    WeightManagement,
    HeartHealth,
    KidneyCare,
    GlutenFree,
    DigestiveComfort,
    GeneralWellness,
}

impl ConditionTemplate {
    pub fn for_condition(condition: HealthCondition) -> Self {
        match condition {
            HealthCondition::DiabetesType1
            | HealthCondition::DiabetesType2
            | HealthCondition::Prediabetes
            | HealthCondition::MetabolicSyndrome => ConditionTemplate::Diabetes,
            HealthCondition::Hypertension => ConditionTemplate::Hypertension,
            HealthCondition::Obesity => ConditionTemplate::WeightManagement,
            HealthCondition::HeartDisease | HealthCondition::HighCholesterol => {
                ConditionTemplate::HeartHealth
            }
            HealthCondition::KidneyDisease => ConditionTemplate::KidneyCare,
            HealthCondition::CeliacDisease => ConditionTemplate::GlutenFree,
            HealthCondition::Ibs => ConditionTemplate::DigestiveComfort,
            HealthCondition::Pcos
            | HealthCondition::ThyroidIssues
            | HealthCondition::Arthritis
            | HealthCondition::GeneralWellness => ConditionTemplate::GeneralWellness,
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            ConditionTemplate::Diabetes => {
                "You are a specialized nutritionist for diabetes management. Focus on:\n\
                 - Low glycemic index foods\n\
                 - Balanced carbohydrate distribution\n\
                 - High fiber content\n\
                 - Portion control\n\
                 - Blood sugar stability"
            }
            ConditionTemplate::Hypertension => {
                "You are a specialized nutritionist for hypertension management. Focus on:\n\
                 - Low sodium content (under 2000mg daily)\n\
                 - DASH diet principles\n\
                 - Potassium-rich foods\n\
                 - Magnesium and calcium sources\n\
                 - Heart-healthy fats"
            }
            ConditionTemplate::WeightManagement => {
                "You are a specialized nutritionist for healthy weight loss. Focus on:\n\
                 - Caloric deficit while maintaining nutrition\n\
                 - High protein content for satiety\n\
                 - Low calorie density foods\n\
                 - Portion control\n\
                 - Sustainable eating patterns"
            }
            ConditionTemplate::HeartHealth => {
                "You are a specialized nutritionist for heart disease management. Focus on:\n\
                 - Mediterranean diet principles\n\
                 - Omega-3 rich foods\n\
                 - Low saturated fat\n\
                 - High antioxidant foods\n\
                 - Whole grains and fiber"
            }
            ConditionTemplate::KidneyCare => {
                "You are a renal nutrition specialist. Focus on:\n\
                 - Controlled protein portions\n\
                 - Limited sodium, potassium and phosphorus\n\
                 - Fluid awareness\n\
                 - Fresh rather than processed foods"
            }
            ConditionTemplate::GlutenFree => {
                "You are a nutritionist for celiac disease. Focus on:\n\
                 - Strictly gluten-free ingredients, including hidden sources\n\
                 - Naturally gluten-free whole grains\n\
                 - Iron, calcium and B-vitamin rich foods\n\
                 - Cross-contamination aware preparation"
            }
            ConditionTemplate::DigestiveComfort => {
                "You are a nutritionist for irritable bowel syndrome. Focus on:\n\
                 - Low FODMAP ingredients\n\
                 - Gentle, regular meal sizes\n\
                 - Soluble fiber sources\n\
                 - Avoiding common trigger foods"
            }
            ConditionTemplate::GeneralWellness => {
                "You are a nutritionist focused on general wellness. Focus on:\n\
                 - Balanced macronutrients\n\
                 - Variety of colorful fruits and vegetables\n\
                 - Whole grains and lean proteins\n\
                 - Healthy fats from nuts, seeds, and fish\n\
                 - Adequate hydration\n\
                 - Minimize processed foods"
            }
        }
    }
}

const RESPONSE_CONTRACT: &str = r#"Respond with a single JSON object and nothing else, using exactly this shape:
{
  "mealPlan": [
    {
      "breakfast": MEAL,
      "lunch": MEAL,
      "dinner": MEAL,
      "snacks": [MEAL]
    }
  ],
  "shoppingList": [
    { "category": string, "items": [ { "name": string, "quantity": string, "notes": string } ] }
  ],
  "nutritionSummary": {
    "averageDailyCalories": number,
    "averageDailyProtein": number,
    "averageDailyCarbs": number,
    "averageDailyFat": number,
    "averageDailyFiber": number
  },
  "healthTips": [string]
}
where MEAL is
{
  "name": string,
  "description": string,
  "prepTime": minutes as integer,
  "cookingTime": minutes as integer,
  "servings": integer >= 1,
  "ingredients": [ { "name": string, "amount": number, "unit": string } ],
  "instructions": [string],
  "nutrition": {
    "calories": number, "protein": number, "carbs": number, "fat": number,
    "fiber": number, "sugar": number, "sodium": number
  },
  "tips": [string]
}
Nutrition values are per serving: calories in kcal, sodium in mg, everything else in grams."#;

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Renders the provider payload for a request. Pure: the same request always
/// produces the same text.
pub fn compile(request: &GenerationRequest) -> CompiledPrompt {
    let template = ConditionTemplate::for_condition(request.health_condition);
    let days = request.duration_days;
    let condition = request.health_condition.display_name();

    let secondary: Vec<String> = request
        .secondary_conditions
        .iter()
        .map(|c| c.display_name().to_string())
        .collect();
    let preferences: Vec<String> = request
        .dietary_preferences
        .iter()
        .map(|p| p.label().to_string())
        .collect();

    let mut user = String::new();
    let _ = writeln!(user, "Create a {days}-day meal plan with the following requirements:");
    let _ = writeln!(user);
    let _ = writeln!(user, "Health Condition: {condition}");
    if !secondary.is_empty() {
        let _ = writeln!(user, "Other Conditions: {}", secondary.join(", "));
    }
    let _ = writeln!(user, "Dietary Preferences: {}", join_or_none(&preferences));
    let _ = writeln!(user, "Allergies/Restrictions: {}", join_or_none(&request.allergies));
    let _ = writeln!(user, "Meals per Day: {}", request.meals_per_day);
    let _ = writeln!(user, "Cooking Time Preference: {}", request.cooking_time.label());
    let _ = writeln!(user, "Budget Level: {}", request.budget_level.label());
    if let Some(kcal) = request.calorie_target {
        let _ = writeln!(user, "Target Daily Calories: {kcal}");
    }
    if !request.cuisine_preferences.is_empty() {
        let _ = writeln!(user, "Cuisine Preferences: {}", request.cuisine_preferences.join(", "));
    }
    if let Some(notes) = &request.notes {
        let _ = writeln!(user, "Additional Notes: {notes}");
    }
    let _ = writeln!(user);
    let _ = writeln!(user, "Please provide:");
    let _ = writeln!(user, "1. Complete meal plans for exactly {days} days, one entry per day in order");
    if request.includes_snacks() {
        let _ = writeln!(user, "   including snacks for each day");
    } else {
        let _ = writeln!(user, "   with breakfast, lunch and dinner (snacks optional)");
    }
    let _ = writeln!(user, "2. A categorized shopping list for all ingredients");
    let _ = writeln!(user, "3. Nutrition summary with daily averages");
    let _ = writeln!(user, "4. 5 specific health tips for managing {condition}");
    let _ = writeln!(user);
    let _ = writeln!(user, "{RESPONSE_CONTRACT}");
    let _ = writeln!(user);
    let _ = writeln!(user, "Ensure all meals are:");
    let _ = writeln!(user, "- Nutritionally balanced for the health condition");
    let _ = writeln!(user, "- Respecting all dietary preferences and allergies");
    let _ = writeln!(user, "- Within the specified cooking time");
    let _ = write!(user, "- Budget-conscious based on the level specified");

    CompiledPrompt {
        system: template.instructions().to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::model::{BudgetLevel, CookingTime, DietaryPreference};
    use time::macros::date;

    fn request() -> GenerationRequest {
        GenerationRequest {
            health_condition: HealthCondition::Hypertension,
            secondary_conditions: vec![],
            dietary_preferences: vec![DietaryPreference::Vegetarian, DietaryPreference::DashDiet],
            allergies: vec!["shellfish".into()],
            duration_days: 5,
            start_date: date!(2025 - 04 - 01),
            meals_per_day: 3,
            cooking_time: CookingTime::Minimal,
            budget_level: BudgetLevel::Budget,
            cuisine_preferences: vec![],
            calorie_target: None,
            notes: None,
        }
    }

    #[test]
    fn every_condition_maps_to_a_template() {
        for condition in HealthCondition::ALL {
            assert!(!ConditionTemplate::for_condition(condition).instructions().is_empty());
        }
        assert_eq!(
            ConditionTemplate::for_condition(HealthCondition::DiabetesType1),
            ConditionTemplate::Diabetes
        );
    }

    #[test]
    fn default_condition_uses_general_wellness() {
        assert_eq!(
            ConditionTemplate::for_condition(HealthCondition::default()),
            ConditionTemplate::GeneralWellness
        );
        assert_eq!(
            ConditionTemplate::for_condition(HealthCondition::Hypertension),
            ConditionTemplate::Hypertension
        );
    }

    #[test]
    fn renders_request_fields() {
        let prompt = compile(&request());
        assert!(prompt.system.contains("hypertension management"));
        assert!(prompt.user.starts_with("Create a 5-day meal plan"));
        assert!(prompt.user.contains("Dietary Preferences: vegetarian, dash-diet"));
        assert!(prompt.user.contains("Allergies/Restrictions: shellfish"));
        assert!(prompt.user.contains("Cooking Time Preference: minimal"));
        assert!(prompt.user.contains("Budget Level: budget"));
        assert!(prompt.user.contains("\"mealPlan\""));
        assert!(!prompt.user.contains("Target Daily Calories"));
        assert!(!prompt.user.contains("Cuisine Preferences"));
    }

    #[test]
    fn optional_sections_appear_when_set() {
        let mut req = request();
        req.calorie_target = Some(1900);
        req.cuisine_preferences = vec!["indian".into(), "thai".into()];
        req.notes = Some("prefers one-pot dishes".into());
        req.meals_per_day = 5;
        let prompt = compile(&req);
        assert!(prompt.user.contains("Target Daily Calories: 1900"));
        assert!(prompt.user.contains("Cuisine Preferences: indian, thai"));
        assert!(prompt.user.contains("Additional Notes: prefers one-pot dishes"));
        assert!(prompt.user.contains("including snacks"));
    }

    #[test]
    fn compilation_is_deterministic() {
        assert_eq!(compile(&request()), compile(&request()));
    }
}
