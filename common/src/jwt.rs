use actix_web::{HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub exp: usize,
}

/// Generates a JWT for the given user based on JWT configuration options
pub fn generate_jwt(user_id: Uuid, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .expect("valid timestamp")
        .timestamp();

    let claims = JwtClaims {
        user_id,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Claims previously validated and stashed by the auth middleware, if any.
pub fn get_jwt_claims(req: &HttpRequest) -> Option<JwtClaims> {
    req.extensions().get::<JwtClaims>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_user_id() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        };
        let user_id = Uuid::new_v4();

        let token = generate_jwt(user_id, &config).unwrap();
        let claims = validate_jwt(&token, &config.secret).unwrap();

        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        };
        let token = generate_jwt(Uuid::new_v4(), &config).unwrap();

        assert!(validate_jwt(&token, "other-secret").is_err());
    }
}
