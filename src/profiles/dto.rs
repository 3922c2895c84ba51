use serde::Serialize;

use super::model::HealthProfile;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: HealthProfile,
    pub bmi: Option<f64>,
    pub estimated_daily_calories: u32,
}

impl From<HealthProfile> for ProfileResponse {
    fn from(profile: HealthProfile) -> Self {
        Self {
            success: true,
            bmi: profile.bmi(),
            estimated_daily_calories: profile.estimated_daily_calories(),
            profile,
        }
    }
}
