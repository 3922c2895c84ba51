use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary medical or wellness focus driving nutrition constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthCondition {
    DiabetesType2,
    DiabetesType1,
    Prediabetes,
    Hypertension,
    HeartDisease,
    HighCholesterol,
    Obesity,
    Pcos,
    ThyroidIssues,
    KidneyDisease,
    Ibs,
    CeliacDisease,
    Arthritis,
    MetabolicSyndrome,
    #[default]
    GeneralWellness,
}

impl HealthCondition {
    pub const ALL: [HealthCondition; 15] = [
        HealthCondition::DiabetesType2,
        HealthCondition::DiabetesType1,
        HealthCondition::Prediabetes,
        HealthCondition::Hypertension,
        HealthCondition::HeartDisease,
        HealthCondition::HighCholesterol,
        HealthCondition::Obesity,
        HealthCondition::Pcos,
        HealthCondition::ThyroidIssues,
        HealthCondition::KidneyDisease,
        HealthCondition::Ibs,
        HealthCondition::CeliacDisease,
        HealthCondition::Arthritis,
        HealthCondition::MetabolicSyndrome,
        HealthCondition::GeneralWellness,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            HealthCondition::DiabetesType2 => "diabetes-type-2",
            HealthCondition::DiabetesType1 => "diabetes-type-1",
            HealthCondition::Prediabetes => "prediabetes",
            HealthCondition::Hypertension => "hypertension",
            HealthCondition::HeartDisease => "heart-disease",
            HealthCondition::HighCholesterol => "high-cholesterol",
            HealthCondition::Obesity => "obesity",
            HealthCondition::Pcos => "pcos",
            HealthCondition::ThyroidIssues => "thyroid-issues",
            HealthCondition::KidneyDisease => "kidney-disease",
            HealthCondition::Ibs => "ibs",
            HealthCondition::CeliacDisease => "celiac-disease",
            HealthCondition::Arthritis => "arthritis",
            HealthCondition::MetabolicSyndrome => "metabolic-syndrome",
            HealthCondition::GeneralWellness => "general-wellness",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HealthCondition::DiabetesType2 => "Type 2 Diabetes",
            HealthCondition::DiabetesType1 => "Type 1 Diabetes",
            HealthCondition::Prediabetes => "Prediabetes",
            HealthCondition::Hypertension => "Hypertension",
            HealthCondition::HeartDisease => "Heart Disease",
            HealthCondition::HighCholesterol => "High Cholesterol",
            HealthCondition::Obesity => "Obesity",
            HealthCondition::Pcos => "PCOS",
            HealthCondition::ThyroidIssues => "Thyroid Issues",
            HealthCondition::KidneyDisease => "Kidney Disease",
            HealthCondition::Ibs => "IBS",
            HealthCondition::CeliacDisease => "Celiac Disease",
            HealthCondition::Arthritis => "Arthritis",
            HealthCondition::MetabolicSyndrome => "Metabolic Syndrome",
            HealthCondition::GeneralWellness => "General Wellness",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryPreference {
    Vegetarian,
    Vegan,
    Pescatarian,
    Keto,
    Paleo,
    Mediterranean,
    LowCarb,
    LowFat,
    GlutenFree,
    DairyFree,
    Halal,
    Kosher,
    IntermittentFasting,
    DashDiet,
    AntiInflammatory,
}

impl DietaryPreference {
    pub fn label(self) -> &'static str {
        match self {
            DietaryPreference::Vegetarian => "vegetarian",
            DietaryPreference::Vegan => "vegan",
            DietaryPreference::Pescatarian => "pescatarian",
            DietaryPreference::Keto => "keto",
            DietaryPreference::Paleo => "paleo",
            DietaryPreference::Mediterranean => "mediterranean",
            DietaryPreference::LowCarb => "low-carb",
            DietaryPreference::LowFat => "low-fat",
            DietaryPreference::GlutenFree => "gluten-free",
            DietaryPreference::DairyFree => "dairy-free",
            DietaryPreference::Halal => "halal",
            DietaryPreference::Kosher => "kosher",
            DietaryPreference::IntermittentFasting => "intermittent-fasting",
            DietaryPreference::DashDiet => "dash-diet",
            DietaryPreference::AntiInflammatory => "anti-inflammatory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    WeightLoss,
    WeightGain,
    MuscleGain,
    ImproveEnergy,
    BetterSleep,
    ReduceInflammation,
    ManageBloodSugar,
    LowerBloodPressure,
    ImproveDigestion,
    HormoneBalance,
    ReduceCholesterol,
    ImproveMood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingTime {
    Minimal,
    Moderate,
    Extensive,
}

impl CookingTime {
    pub fn label(self) -> &'static str {
        match self {
            CookingTime::Minimal => "minimal",
            CookingTime::Moderate => "moderate",
            CookingTime::Extensive => "extensive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Budget,
    Moderate,
    Premium,
}

impl BudgetLevel {
    pub fn label(self) -> &'static str {
        match self {
            BudgetLevel::Budget => "budget",
            BudgetLevel::Moderate => "moderate",
            BudgetLevel::Premium => "premium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    Cm,
    Ft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lbs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Height {
    pub value: f64,
    pub unit: HeightUnit,
}

impl Height {
    pub fn in_cm(&self) -> f64 {
        match self.unit {
            HeightUnit::Cm => self.value,
            HeightUnit::Ft => self.value * 30.48,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl Weight {
    pub fn in_kg(&self) -> f64 {
        match self.unit {
            WeightUnit::Kg => self.value,
            WeightUnit::Lbs => self.value * 0.453_592,
        }
    }
}

fn default_meals_per_day() -> u8 {
    3
}

/// Stored health profile of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProfile {
    pub age: u8,
    pub gender: Gender,
    pub height: Height,
    pub weight: Weight,
    pub primary_condition: HealthCondition,
    #[serde(default)]
    pub secondary_conditions: Vec<HealthCondition>,
    #[serde(default)]
    pub dietary_preferences: Vec<DietaryPreference>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub intolerances: Vec<String>,
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub target_calories: Option<u32>,
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: u8,
    #[serde(default)]
    pub cooking_time: Option<CookingTime>,
    #[serde(default)]
    pub budget_level: Option<BudgetLevel>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

pub const MAX_NOTES_LEN: usize = 1000;

impl HealthProfile {
    /// Range checks applied before a profile is stored. Returns every problem
    /// found, empty when the profile is acceptable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(1..=120).contains(&self.age) {
            problems.push(format!("age must be between 1 and 120, got {}", self.age));
        }
        if !(self.height.value.is_finite() && self.height.value > 0.0) {
            problems.push("height must be a positive number".to_string());
        }
        if !(self.weight.value.is_finite() && self.weight.value > 0.0) {
            problems.push("weight must be a positive number".to_string());
        }
        if let Some(kcal) = self.target_calories {
            if !(1000..=5000).contains(&kcal) {
                problems.push(format!("targetCalories must be between 1000 and 5000, got {kcal}"));
            }
        }
        if !(1..=6).contains(&self.meals_per_day) {
            problems.push(format!("mealsPerDay must be between 1 and 6, got {}", self.meals_per_day));
        }
        if self.secondary_conditions.contains(&self.primary_condition) {
            problems.push("secondaryConditions must not repeat the primary condition".to_string());
        }
        if self.secondary_conditions.contains(&HealthCondition::GeneralWellness) {
            problems.push("general-wellness can only be a primary condition".to_string());
        }
        if self
            .additional_notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_LEN)
        {
            problems.push(format!("additionalNotes must be at most {MAX_NOTES_LEN} characters"));
        }
        problems
    }

    pub fn bmi(&self) -> Option<f64> {
        let meters = self.height.in_cm() / 100.0;
        let kg = self.weight.in_kg();
        if meters <= 0.0 || kg <= 0.0 {
            return None;
        }
        let bmi = kg / (meters * meters);
        Some((bmi * 10.0).round() / 10.0)
    }

    /// Daily energy estimate (Mifflin-St Jeor, activity adjusted), shifted
    /// 15% for weight-loss or weight-gain goals.
    pub fn estimated_daily_calories(&self) -> u32 {
        let kg = self.weight.in_kg();
        let cm = self.height.in_cm();
        let base = 10.0 * kg + 6.25 * cm - 5.0 * f64::from(self.age);
        let bmr = match self.gender {
            Gender::Male => base + 5.0,
            Gender::Female | Gender::Other => base - 161.0,
        };
        let mut tdee = bmr * self.activity_level.multiplier();
        if self.goals.contains(&Goal::WeightLoss) {
            tdee *= 0.85;
        } else if self.goals.contains(&Goal::WeightGain) {
            tdee *= 1.15;
        }
        tdee.round().max(0.0) as u32
    }

    /// Overwrites the top-level fields present in `patch` and re-reads the
    /// result. `null` clears an optional field; unknown keys are ignored.
    pub fn apply_patch(&self, patch: &Map<String, Value>) -> Result<HealthProfile, serde_json::Error> {
        let mut doc = match serde_json::to_value(self)? {
            Value::Object(doc) => doc,
            _ => Map::new(),
        };
        for (key, value) in patch {
            doc.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(doc))
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> HealthProfile {
    HealthProfile {
        age: 40,
        gender: Gender::Female,
        height: Height { value: 165.0, unit: HeightUnit::Cm },
        weight: Weight { value: 70.0, unit: WeightUnit::Kg },
        primary_condition: HealthCondition::DiabetesType2,
        secondary_conditions: vec![HealthCondition::Hypertension],
        dietary_preferences: vec![DietaryPreference::Mediterranean],
        allergies: vec!["peanuts".into()],
        intolerances: vec![],
        activity_level: ActivityLevel::Light,
        goals: vec![Goal::ManageBloodSugar],
        target_calories: Some(1800),
        meals_per_day: 3,
        cooking_time: Some(CookingTime::Minimal),
        budget_level: None,
        cuisine_preferences: vec!["greek".into()],
        additional_notes: None,
    }
}
