use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{SocialIdentityProvider, SocialLoginError, TokenError, TokenService};
use crate::database::models::user::User;
use crate::database::repository::{CredentialError, UserRepository};

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Social(#[from] SocialLoginError),
}

impl AuthError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation { field, message: message.into() }
    }
}

/// A freshly authenticated user and the token that represents them.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub is_new_user: bool,
}

/// Registration and login flows: credential checks plus token issuance.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: Arc<TokenService>,
    social: Arc<dyn SocialIdentityProvider>,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        tokens: Arc<TokenService>,
        social: Arc<dyn SocialIdentityProvider>,
    ) -> Self {
        Self { users, tokens, social }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<Session, AuthError> {
        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            validate_phone(phone)?;
        }

        let user = self.users.register(username, password, phone).await?;
        let token = self.tokens.issue(user.id)?;
        Ok(Session { token, user, is_new_user: true })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::invalid("username", "Username and password are required"));
        }

        let user = match self.users.authenticate(username, password).await {
            Ok(user) => user,
            Err(CredentialError::InvalidCredential) => {
                warn!("Rejected login for '{}'", username);
                return Err(CredentialError::InvalidCredential.into());
            }
            Err(e) => return Err(e.into()),
        };

        let token = self.tokens.issue(user.id)?;
        info!("User {} logged in", user.id);
        Ok(Session { token, user, is_new_user: false })
    }

    pub async fn wechat_login(
        &self,
        code: &str,
        nickname: Option<&str>,
        avatar_base64: Option<&str>,
    ) -> Result<Session, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::invalid("code", "WeChat login code is required"));
        }

        let identity = self.social.exchange_code(code).await?;
        let login = self
            .users
            .find_or_create_social_user(
                &identity.open_id,
                identity.union_id.as_deref(),
                nickname,
                avatar_base64,
            )
            .await?;

        let token = self.tokens.issue(login.user.id)?;
        info!("User {} logged in via WeChat (new: {})", login.user.id, login.is_new);
        Ok(Session {
            token,
            user: login.user,
            is_new_user: login.is_new,
        })
    }

    pub async fn change_password(&self, user_id: i64, old: &str, new: &str) -> Result<(), AuthError> {
        if old.is_empty() {
            return Err(AuthError::invalid("oldPassword", "Current password is required"));
        }
        validate_password(new)?;
        self.users.change_password(user_id, old, new).await?;
        Ok(())
    }

    pub async fn bind_phone(&self, user_id: i64, phone: &str) -> Result<User, AuthError> {
        let phone = phone.trim();
        validate_phone(phone)?;
        Ok(self.users.bind_phone(user_id, phone).await?)
    }
}

pub fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::invalid(
            "username",
            format!("Username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"),
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AuthError::invalid(
            "username",
            "Username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::invalid("password", "Password is required"));
    }
    if password.chars().count() > PASSWORD_MAX_LEN {
        return Err(AuthError::invalid(
            "password",
            format!("Password must be at most {PASSWORD_MAX_LEN} characters"),
        ));
    }
    Ok(())
}

/// Mainland China mobile number: 11 digits, `1[3-9]` prefix.
pub fn validate_phone(phone: &str) -> Result<(), AuthError> {
    let bytes = phone.as_bytes();
    let ok = bytes.len() == 11
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
        && bytes.iter().all(u8::is_ascii_digit);
    if !ok {
        return Err(AuthError::invalid("phone", "Invalid phone number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("farmer_01").is_ok());
        assert!(validate_username("李四").is_ok());
        assert!(validate_username("a").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("p").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn phones() {
        assert!(validate_phone("13812345678").is_ok());
        assert!(validate_phone("19912345678").is_ok());
        assert!(validate_phone("12812345678").is_err());
        assert!(validate_phone("1381234567").is_err());
        assert!(validate_phone("1381234567a").is_err());
        assert!(validate_phone("+8613812345").is_err());
    }

    #[test]
    fn validation_errors_name_the_field() {
        match validate_phone("123") {
            Err(AuthError::Validation { field, .. }) => assert_eq!(field, "phone"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
