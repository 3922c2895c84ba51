use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::warn;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::state::AppState;

/// Extracts and validates the bearer access token, returning the user ID.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let cfg = &state.config.jwt;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string())
        })?;

        if data.claims.kind != TokenKind::Access {
            return Err((StatusCode::UNAUTHORIZED, "access token required".into()));
        }

        Ok(AuthUser(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, token_of_kind, Harness};
    use axum::http::{header::AUTHORIZATION, Request};

    async fn extract(state: &AppState, header: Option<String>) -> Result<AuthUser, (StatusCode, String)> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn accepts_valid_access_token() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let AuthUser(id) = extract(&h.state, Some(bearer(&h.state, user))).await.unwrap();
        assert_eq!(id, user);
    }

    #[tokio::test]
    async fn rejects_missing_header_and_wrong_scheme() {
        let h = Harness::new();
        let (status, _) = extract(&h.state, None).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, msg) = extract(&h.state, Some("Basic abc".into())).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(msg, "invalid auth scheme");
    }

    #[tokio::test]
    async fn rejects_refresh_tokens() {
        let h = Harness::new();
        let token = token_of_kind(&h.state, Uuid::new_v4(), TokenKind::Refresh);
        let (status, msg) = extract(&h.state, Some(format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(msg, "access token required");
    }

    #[tokio::test]
    async fn rejects_tokens_signed_with_another_secret() {
        let h = Harness::new();
        let other = Harness::with_jwt_secret("someone-else");
        let header = bearer(&other.state, Uuid::new_v4());
        let (status, _) = extract(&h.state, Some(header)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
