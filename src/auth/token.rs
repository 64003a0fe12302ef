use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// Session token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token generation failed: {0}")]
    Generation(String),

    #[error("Token signing secret is not configured")]
    MissingSecret,
}

/// Issues and verifies HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, validity: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validity,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, TokenError> {
        let validity = i64::try_from(config.jwt_expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| TokenError::Generation("token validity is out of range".to_string()))?;
        Self::new(&config.jwt_secret, validity)
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it were minted at `issued_at`.
    pub fn issue_at(&self, user_id: i64, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.validity)
            .ok_or_else(|| TokenError::Generation("token expiry is out of range".to_string()))?;
        let claims = Claims {
            user_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Returns the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.decode(token).map(|claims| claims.user_id)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret", Duration::hours(168)).unwrap()
    }

    #[test]
    fn verify_returns_issued_user() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token), Ok(42));

        let claims = tokens.decode(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn claims_use_user_id_wire_name() {
        let json = serde_json::to_value(Claims { user_id: 7, iat: 1, exp: 2 }).unwrap();
        assert_eq!(json["userID"], 7);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue_at(42, Utc::now() - Duration::hours(169)).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let other = TokenService::new("someone-else", Duration::hours(1)).unwrap();
        let token = other.issue(42).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_algorithms_are_invalid() {
        let claims = Claims {
            user_id: 42,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn oversized_validity_is_an_error() {
        let mut config = AppConfig::for_tests("postgres://localhost/agri").security;
        config.jwt_expiry_hours = u64::MAX;
        assert!(matches!(TokenService::from_config(&config), Err(TokenError::Generation(_))));

        config.jwt_expiry_hours = 10_000_000_000;
        let tokens = TokenService::from_config(&config).unwrap();
        assert!(matches!(tokens.issue(1), Err(TokenError::Generation(_))));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(service().verify("not.a.token"), Err(TokenError::Invalid(_))));
        assert!(matches!(service().verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            TokenService::new("", Duration::hours(1)),
            Err(TokenError::MissingSecret)
        ));
    }
}
