use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{hash_password_blocking, verify_password_blocking, PasswordError};
use crate::database::manager::{is_unique_violation, Database, DatabaseError};
use crate::database::models::user::{LoginMethod, Role, User, UserRow};

const USER_COLUMNS: &str = "id, username, password_hash, phone, wechat_openid, wechat_unionid, \
    nickname, avatar_url, avatar_base64, machine_code, login_method, role, status, \
    last_login_at, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid username or password")]
    InvalidCredential,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    Conflict(String),

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for CredentialError {
    fn from(err: sqlx::Error) -> Self {
        CredentialError::Database(err.into())
    }
}

/// Storage-side answer to a social login.
#[derive(Debug, Clone)]
pub struct SocialLogin {
    pub user: User,
    pub is_new: bool,
}

/// Access to the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    async fn fetch_one_where(&self, condition: &str, value: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, CredentialError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or(CredentialError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, CredentialError> {
        Ok(self.fetch_one_where("username", username).await?)
    }

    /// Create a password account. Username and phone must both be unused.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<User, CredentialError> {
        if self.fetch_one_where("username", username).await?.is_some() {
            return Err(CredentialError::Conflict("Username already exists".to_string()));
        }
        if let Some(phone) = phone {
            if self.fetch_one_where("phone", phone).await?.is_some() {
                return Err(CredentialError::Conflict("Phone number is already registered".to_string()));
            }
        }

        let hash = hash_password_blocking(password.to_string()).await?;

        let sql = format!(
            "INSERT INTO users (username, password_hash, phone, nickname, login_method, role, status) \
             VALUES ($1, $2, $3, $1, $4, $5, 'active') RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .bind(hash)
            .bind(phone)
            .bind(LoginMethod::Password.as_str())
            .bind(Role::Ordinary.as_i16())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CredentialError::Conflict("Username or phone number already exists".to_string())
                } else {
                    e.into()
                }
            })?;

        info!("Registered user {} ({})", row.id, username);
        Ok(row.into())
    }

    /// Check a username/password pair against active accounts.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let user = self
            .fetch_one_where("username", username)
            .await?
            .filter(User::is_active)
            .ok_or(CredentialError::InvalidCredential)?;

        let Some(stored) = user.password_hash.clone() else {
            return Err(CredentialError::InvalidCredential);
        };
        match verify_password_blocking(password.to_string(), stored).await {
            Ok(true) => {}
            Ok(false) => return Err(CredentialError::InvalidCredential),
            Err(PasswordError::MalformedHash) => {
                warn!("User {} has an unreadable password hash", user.id);
                return Err(CredentialError::InvalidCredential);
            }
            Err(e) => return Err(e.into()),
        }

        self.touch_last_login(user.id).await;
        Ok(user)
    }

    /// Look up a social account (by union id when the provider supplied one,
    /// otherwise by open id) and create it on first sight.
    pub async fn find_or_create_social_user(
        &self,
        open_id: &str,
        union_id: Option<&str>,
        nickname: Option<&str>,
        avatar_base64: Option<&str>,
    ) -> Result<SocialLogin, CredentialError> {
        let existing = match union_id {
            Some(union_id) => self.fetch_one_where("wechat_unionid", union_id).await?,
            None => self.fetch_one_where("wechat_openid", open_id).await?,
        };

        if let Some(user) = existing {
            if !user.is_active() {
                return Err(CredentialError::AccountDisabled);
            }
            let user = self.refresh_social_profile(user, nickname, avatar_base64).await;
            return Ok(SocialLogin { user, is_new: false });
        }

        let sql = format!(
            "INSERT INTO users (wechat_openid, wechat_unionid, nickname, avatar_base64, \
             login_method, role, status, last_login_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'active', NOW()) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(open_id)
            .bind(union_id)
            .bind(nickname)
            .bind(avatar_base64)
            .bind(LoginMethod::Wechat.as_str())
            .bind(Role::Ordinary.as_i16())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CredentialError::Conflict("WeChat account is already registered".to_string())
                } else {
                    e.into()
                }
            })?;

        info!("Created WeChat user {}", row.id);
        Ok(SocialLogin { user: row.into(), is_new: true })
    }

    /// Best-effort nickname/avatar/login refresh; the stale record is returned on failure.
    async fn refresh_social_profile(
        &self,
        user: User,
        nickname: Option<&str>,
        avatar_base64: Option<&str>,
    ) -> User {
        let sql = format!(
            "UPDATE users SET nickname = COALESCE($2, nickname), \
             avatar_base64 = COALESCE($3, avatar_base64), \
             last_login_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        match sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(nickname.filter(|s| !s.is_empty()))
            .bind(avatar_base64.filter(|s| !s.is_empty()))
            .fetch_one(&self.pool)
            .await
        {
            Ok(row) => row.into(),
            Err(e) => {
                warn!("Failed to refresh profile for user {}: {}", user.id, e);
                user
            }
        }
    }

    /// Records a successful login. Failures are logged and ignored.
    pub async fn touch_last_login(&self, id: i64) {
        if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            warn!("Failed to update last login for user {}: {}", id, e);
        }
    }

    pub async fn bind_phone(&self, id: i64, phone: &str) -> Result<User, CredentialError> {
        if let Some(holder) = self.fetch_one_where("phone", phone).await? {
            if holder.id != id {
                return Err(CredentialError::Conflict(
                    "Phone number is bound to another account".to_string(),
                ));
            }
        }

        let sql = format!(
            "UPDATE users SET phone = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CredentialError::Conflict("Phone number is bound to another account".to_string())
                } else {
                    e.into()
                }
            })?
            .map(User::from)
            .ok_or(CredentialError::NotFound)
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(&self, id: i64, old: &str, new: &str) -> Result<(), CredentialError> {
        let user = self.find_by_id(id).await?;
        let stored = user.password_hash.ok_or(CredentialError::InvalidCredential)?;
        if !verify_password_blocking(old.to_string(), stored).await? {
            return Err(CredentialError::InvalidCredential);
        }

        let hash = hash_password_blocking(new.to_string()).await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        info!("Password changed for user {}", id);
        Ok(())
    }

    pub async fn set_role(&self, username: &str, role: Role) -> Result<User, CredentialError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE username = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .bind(role.as_i16())
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or(CredentialError::NotFound)
    }
}
