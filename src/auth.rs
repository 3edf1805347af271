use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    serde::{Deserialize, Serialize},
};
use tracing::warn;

use crate::config::AppConfig;
use crate::error::Result;

const BEARER: &str = "Bearer ";
const AUTHORIZATION: &str = "Authorization";

// Used when decoding a token to `AuthenticatedUser`
#[derive(Debug)]
pub enum AuthenticationError {
    Missing,
    Decoding(String),
    Expired,
    Unconfigured,
}

/// Claims carried by a bearer token. `sub` holds the user id; `exp` is checked on decode.
#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AuthenticatedUser {
    sub: String,
    exp: usize,
}

impl AuthenticatedUser {
    pub fn new(user_id: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: 0,
        }
    }

    pub fn id(&self) -> i64 {
        // Tokens are only minted by `to_token`, whose subject is always numeric.
        self.sub.parse().unwrap_or_default()
    }

    /// Create a `AuthenticatedUser` from a 'Bearer <token>' value
    fn from_authorization(value: &str, secret: &str) -> Result<Self, AuthenticationError> {
        let token = value
            .strip_prefix(BEARER)
            .ok_or(AuthenticationError::Missing)?;

        let token = decode::<AuthenticatedUser>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthenticationError::Expired,
            _ => AuthenticationError::Decoding(e.to_string()),
        })?;

        if token.claims.sub.parse::<i64>().is_err() {
            return Err(AuthenticationError::Decoding("subject is not a user id".into()));
        }

        Ok(token.claims)
    }

    /// Converts these claims into a signed token string
    pub fn to_token(mut self, config: &AppConfig) -> Result<String> {
        let expiration = Utc::now() + Duration::hours(config.token_ttl_hours);
        self.exp = expiration.timestamp() as usize;

        let token = encode(
            &Header::default(),
            &self,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthenticationError;

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = request.rocket().state::<AppConfig>() else {
            return Outcome::Error((Status::InternalServerError, AuthenticationError::Unconfigured));
        };

        match request.headers().get_one(AUTHORIZATION) {
            None => Outcome::Error((Status::Unauthorized, AuthenticationError::Missing)),
            Some(value) => match AuthenticatedUser::from_authorization(value, &config.jwt_secret) {
                Err(e) => {
                    warn!(error = ?e, "rejected bearer token");
                    Outcome::Error((Status::Unauthorized, e))
                }
                Ok(claims) => Outcome::Success(claims),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_user_id() {
        let config = AppConfig::default();
        let token = AuthenticatedUser::new(42).to_token(&config).unwrap();
        let header = format!("{BEARER}{token}");

        let user = AuthenticatedUser::from_authorization(&header, &config.jwt_secret).unwrap();
        assert_eq!(user.id(), 42);
    }

    #[test]
    fn rejects_foreign_secret_and_missing_prefix() {
        let config = AppConfig::default();
        let token = AuthenticatedUser::new(7).to_token(&config).unwrap();

        assert!(matches!(
            AuthenticatedUser::from_authorization(&token, &config.jwt_secret),
            Err(AuthenticationError::Missing)
        ));
        assert!(matches!(
            AuthenticatedUser::from_authorization(&format!("{BEARER}{token}"), "other"),
            Err(AuthenticationError::Decoding(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let config = AppConfig {
            token_ttl_hours: -2,
            ..AppConfig::default()
        };
        let token = AuthenticatedUser::new(7).to_token(&config).unwrap();

        assert!(matches!(
            AuthenticatedUser::from_authorization(&format!("{BEARER}{token}"), &config.jwt_secret),
            Err(AuthenticationError::Expired)
        ));
    }
}
