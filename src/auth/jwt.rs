use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::{error::AppError, state::AppState};

/// Verification side of the identity provider's tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let cfg = &state.config.jwt;
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("access token required".into()));
        }
        Ok(claims)
    }
}

/// Token minting for tests; production tokens come from the identity provider.
#[cfg(test)]
pub fn sign_for_tests(state: &AppState, user_id: uuid::Uuid, kind: TokenKind) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    let cfg = &state.config.jwt;
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        iat: now.unix_timestamp() as usize,
        exp: (now + Duration::minutes(5)).unix_timestamp() as usize,
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .expect("sign token")
}

#[cfg(test)]
mod jwt_tests {
    use super::*;
    use uuid::Uuid;

    fn make_keys(state: &AppState) -> JwtKeys {
        JwtKeys::from_ref(state)
    }

    #[tokio::test]
    async fn verifies_access_token() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = sign_for_tests(&state, user_id, TokenKind::Access);
        let claims = make_keys(&state).verify_access(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn rejects_refresh_token_as_identity() {
        let state = AppState::fake();
        let token = sign_for_tests(&state, Uuid::new_v4(), TokenKind::Refresh);
        let err = make_keys(&state).verify_access(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let state = AppState::fake();
        let token = sign_for_tests(&state, Uuid::new_v4(), TokenKind::Access);
        let mut keys = make_keys(&state);
        keys.audience = "someone-else".into();
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let state = AppState::fake();
        assert!(make_keys(&state).verify("not.a.jwt").is_err());
    }
}
