use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::llm::ProviderError;
use crate::meal_plans::validator::FieldViolation;

/// Terminal failure of one generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no health profile on file")]
    ProfileMissing,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("monthly limit reached for tier {tier}: {count}/{limit}")]
    QuotaExceeded { tier: String, limit: u32, count: i64 },

    #[error("generation provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    #[error("provider response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("provider response violates the meal plan schema ({} fields)", .0.len())]
    SchemaViolation(Vec<FieldViolation>),

    #[error("failed to persist meal plan: {0:#}")]
    PersistenceFailure(anyhow::Error),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::ProfileMissing => "PROFILE_MISSING",
            GenerationError::InvalidRequest(_) => "INVALID_REQUEST",
            GenerationError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            GenerationError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            GenerationError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            GenerationError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            GenerationError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            GenerationError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GenerationError::ProfileMissing | GenerationError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GenerationError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            GenerationError::ProviderUnavailable(ProviderError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GenerationError::ProviderUnavailable(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::SchemaViolation(_) => StatusCode::BAD_GATEWAY,
            GenerationError::PersistenceFailure(_) | GenerationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show an end user. Never includes provider bodies or
    /// schema field names.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::ProfileMissing => {
                "Please complete your health profile before generating a meal plan".into()
            }
            GenerationError::InvalidRequest(reason) => reason.clone(),
            GenerationError::QuotaExceeded { limit, .. } => format!(
                "You have used all {limit} meal plans included in your plan this month. Upgrade to generate more."
            ),
            GenerationError::ProviderUnavailable(_) | GenerationError::MalformedResponse(_) => {
                "The meal plan service is temporarily unavailable, please try again".into()
            }
            GenerationError::SchemaViolation(_) => {
                "Failed to generate meal plan, please try again".into()
            }
            GenerationError::PersistenceFailure(_) | GenerationError::Internal(_) => {
                "Something went wrong while saving your meal plan, please try again".into()
            }
        }
    }

    fn log(&self) {
        let code = self.code();
        match self {
            GenerationError::ProfileMissing
            | GenerationError::InvalidRequest(_)
            | GenerationError::QuotaExceeded { .. } => warn!(code, error = %self, "generation rejected"),
            GenerationError::ProviderUnavailable(e) => {
                warn!(code, error = %e, "generation provider failed")
            }
            GenerationError::MalformedResponse(reason) => warn!(
                target: "provider_quality",
                code,
                %reason,
                "provider returned unparseable output"
            ),
            GenerationError::SchemaViolation(violations) => {
                let paths: Vec<String> = violations.iter().map(ToString::to_string).collect();
                warn!(
                    target: "provider_quality",
                    code,
                    count = violations.len(),
                    paths = ?paths,
                    "provider output failed schema validation"
                )
            }
            GenerationError::PersistenceFailure(e) | GenerationError::Internal(e) => {
                error!(code, error = %format!("{e:#}"), "generation failed")
            }
        }
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        self.log();
        let mut body = json!({
            "success": false,
            "error": self.code(),
            "message": self.user_message(),
        });
        if let GenerationError::QuotaExceeded { tier, limit, count } = &self {
            body["details"] = json!({ "tier": tier, "limit": limit, "count": count });
        }
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(GenerationError::ProfileMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GenerationError::QuotaExceeded { tier: "starter".into(), limit: 3, count: 3 }.status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            GenerationError::from(ProviderError::Timeout(Duration::from_secs(5))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GenerationError::from(ProviderError::Transport("reset".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GenerationError::PersistenceFailure(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn schema_violation_message_hides_field_paths() {
        let err = GenerationError::SchemaViolation(vec![FieldViolation::new(
            "mealPlan[0].breakfast.nutrition.sodium",
            "required number is missing",
        )]);
        assert!(!err.user_message().contains("sodium"));
        assert_eq!(err.code(), "SCHEMA_VIOLATION");
    }
}
