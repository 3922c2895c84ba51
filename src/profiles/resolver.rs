use time::{Date, Duration};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::model::{BudgetLevel, CookingTime, DietaryPreference, HealthCondition, HealthProfile};
use crate::{error::GenerationError, state::AppState};

pub const MAX_DURATION_DAYS: u8 = 30;
pub const DEFAULT_COOKING_TIME: CookingTime = CookingTime::Moderate;
pub const DEFAULT_BUDGET_LEVEL: BudgetLevel = BudgetLevel::Moderate;
pub const DEFAULT_MEALS_PER_DAY: u8 = 3;

/// Per-call values supplied with a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationOverrides {
    pub duration_days: u8,
    pub start_date: Option<Date>,
    pub cooking_time: Option<CookingTime>,
    pub budget_level: Option<BudgetLevel>,
    pub cuisine_preferences: Option<Vec<String>>,
    pub custom_notes: Option<String>,
}

/// Canonical, fully-defaulted input of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub health_condition: HealthCondition,
    pub secondary_conditions: Vec<HealthCondition>,
    pub dietary_preferences: Vec<DietaryPreference>,
    pub allergies: Vec<String>,
    pub duration_days: u8,
    pub start_date: Date,
    pub meals_per_day: u8,
    pub cooking_time: CookingTime,
    pub budget_level: BudgetLevel,
    pub cuisine_preferences: Vec<String>,
    pub calorie_target: Option<u32>,
    pub notes: Option<String>,
}

impl GenerationRequest {
    /// Snacks are requested once a profile asks for more than the three main meals.
    pub fn includes_snacks(&self) -> bool {
        self.meals_per_day > 3
    }

    pub fn end_date(&self) -> Option<Date> {
        self.start_date
            .checked_add(Duration::days(i64::from(self.duration_days) - 1))
    }
}

#[instrument(skip(st, overrides))]
pub async fn resolve_request(
    st: &AppState,
    user_id: Uuid,
    overrides: GenerationOverrides,
    today: Date,
) -> Result<GenerationRequest, GenerationError> {
    let profile = st
        .profiles
        .get_profile(user_id)
        .await
        .map_err(GenerationError::Internal)?
        .ok_or(GenerationError::ProfileMissing)?;

    let request = merge(&profile, overrides, today)?;
    debug!(
        condition = request.health_condition.slug(),
        days = request.duration_days,
        "generation request resolved"
    );
    Ok(request)
}

/// Applies override > profile > system default, field by field.
pub fn merge(
    profile: &HealthProfile,
    overrides: GenerationOverrides,
    today: Date,
) -> Result<GenerationRequest, GenerationError> {
    if !(1..=MAX_DURATION_DAYS).contains(&overrides.duration_days) {
        return Err(GenerationError::InvalidRequest(format!(
            "duration must be between 1 and {MAX_DURATION_DAYS} days"
        )));
    }

    let cuisine_preferences = match overrides.cuisine_preferences {
        Some(list) if !list.is_empty() => list,
        _ => profile.cuisine_preferences.clone(),
    };
    let notes = overrides
        .custom_notes
        .filter(|n| !n.trim().is_empty())
        .or_else(|| profile.additional_notes.clone().filter(|n| !n.trim().is_empty()));

    let mut allergies = profile.allergies.clone();
    for item in &profile.intolerances {
        if !allergies.iter().any(|a| a.eq_ignore_ascii_case(item)) {
            allergies.push(item.clone());
        }
    }

    let meals_per_day = if (1..=6).contains(&profile.meals_per_day) {
        profile.meals_per_day
    } else {
        DEFAULT_MEALS_PER_DAY
    };

    let request = GenerationRequest {
        health_condition: profile.primary_condition,
        secondary_conditions: profile.secondary_conditions.clone(),
        dietary_preferences: profile.dietary_preferences.clone(),
        allergies,
        duration_days: overrides.duration_days,
        start_date: overrides.start_date.unwrap_or(today),
        meals_per_day,
        cooking_time: overrides
            .cooking_time
            .or(profile.cooking_time)
            .unwrap_or(DEFAULT_COOKING_TIME),
        budget_level: overrides
            .budget_level
            .or(profile.budget_level)
            .unwrap_or(DEFAULT_BUDGET_LEVEL),
        cuisine_preferences,
        calorie_target: profile
            .target_calories
            .or_else(|| Some(profile.estimated_daily_calories()).filter(|kcal| *kcal > 0)),
        notes,
    };

    if request.end_date().is_none() {
        return Err(GenerationError::InvalidRequest(
            "start date is out of the supported range".into(),
        ));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::model::sample_profile;
    use time::macros::date;

    fn overrides(days: u8) -> GenerationOverrides {
        GenerationOverrides {
            duration_days: days,
            start_date: Some(date!(2025 - 03 - 10)),
            ..Default::default()
        }
    }

    #[test]
    fn override_wins_over_profile() {
        let profile = sample_profile();
        let req = merge(
            &profile,
            GenerationOverrides {
                cooking_time: Some(CookingTime::Extensive),
                budget_level: Some(BudgetLevel::Premium),
                cuisine_preferences: Some(vec!["thai".into()]),
                custom_notes: Some("no mushrooms".into()),
                ..overrides(7)
            },
            date!(2025 - 01 - 01),
        )
        .unwrap();

        assert_eq!(req.cooking_time, CookingTime::Extensive);
        assert_eq!(req.budget_level, BudgetLevel::Premium);
        assert_eq!(req.cuisine_preferences, vec!["thai".to_string()]);
        assert_eq!(req.notes.as_deref(), Some("no mushrooms"));
        assert_eq!(req.start_date, date!(2025 - 03 - 10));
    }

    #[test]
    fn profile_fills_missing_overrides() {
        let profile = sample_profile();
        let req = merge(&profile, overrides(3), date!(2025 - 01 - 01)).unwrap();
        assert_eq!(req.cooking_time, CookingTime::Minimal);
        assert_eq!(req.cuisine_preferences, vec!["greek".to_string()]);
        assert_eq!(req.calorie_target, Some(1800));
        assert_eq!(req.health_condition, HealthCondition::DiabetesType2);
    }

    #[test]
    fn system_defaults_apply_when_both_absent() {
        let mut profile = sample_profile();
        profile.cooking_time = None;
        profile.budget_level = None;
        profile.target_calories = None;
        let req = merge(
            &profile,
            GenerationOverrides { start_date: None, ..overrides(5) },
            date!(2025 - 06 - 01),
        )
        .unwrap();
        assert_eq!(req.cooking_time, DEFAULT_COOKING_TIME);
        assert_eq!(req.budget_level, DEFAULT_BUDGET_LEVEL);
        assert_eq!(req.start_date, date!(2025 - 06 - 01));
        assert_eq!(req.calorie_target, Some(profile.estimated_daily_calories()));
    }

    #[test]
    fn empty_override_list_falls_back_to_profile() {
        let profile = sample_profile();
        let req = merge(
            &profile,
            GenerationOverrides {
                cuisine_preferences: Some(vec![]),
                custom_notes: Some("   ".into()),
                ..overrides(2)
            },
            date!(2025 - 01 - 01),
        )
        .unwrap();
        assert_eq!(req.cuisine_preferences, vec!["greek".to_string()]);
        assert_eq!(req.notes, None);
    }

    #[test]
    fn intolerances_are_merged_into_allergies_once() {
        let mut profile = sample_profile();
        profile.intolerances = vec!["Peanuts".into(), "lactose".into()];
        let req = merge(&profile, overrides(1), date!(2025 - 01 - 01)).unwrap();
        assert_eq!(req.allergies, vec!["peanuts".to_string(), "lactose".to_string()]);
    }

    #[test]
    fn rejects_duration_outside_range() {
        let profile = sample_profile();
        for days in [0, 31] {
            let err = merge(&profile, overrides(days), date!(2025 - 01 - 01)).unwrap_err();
            assert!(matches!(err, GenerationError::InvalidRequest(_)));
        }
    }

    #[tokio::test]
    async fn missing_profile_is_reported() {
        let state = AppState::fake();
        let err = resolve_request(&state, Uuid::new_v4(), overrides(3), date!(2025 - 01 - 01))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ProfileMissing));
    }
}
