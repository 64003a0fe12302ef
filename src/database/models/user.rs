use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ordinary,
    Admin,
}

impl Role {
    pub fn as_i16(self) -> i16 {
        match self {
            Role::Ordinary => 0,
            Role::Admin => 1,
        }
    }

    /// Unknown values fall back to the least privileged role.
    pub fn from_i16(value: i16) -> Self {
        match value {
            1 => Role::Admin,
            _ => Role::Ordinary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "active" => AccountStatus::Active,
            _ => AccountStatus::Disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    Password,
    Wechat,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Password => "password",
            LoginMethod::Wechat => "wechat",
        }
    }
}

/// An account as stored in `users`. The password hash never leaves the
/// storage layer in responses; see [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub wechat_openid: Option<String>,
    pub wechat_unionid: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_base64: Option<String>,
    pub machine_code: Option<String>,
    pub login_method: String,
    pub role: Role,
    pub status: AccountStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Raw `users` row.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub wechat_openid: Option<String>,
    pub wechat_unionid: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_base64: Option<String>,
    pub machine_code: Option<String>,
    pub login_method: String,
    pub role: i16,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            phone: row.phone,
            wechat_openid: row.wechat_openid,
            wechat_unionid: row.wechat_unionid,
            nickname: row.nickname,
            avatar_url: row.avatar_url,
            avatar_base64: row.avatar_base64,
            machine_code: row.machine_code,
            login_method: row.login_method,
            role: Role::from_i16(row.role),
            status: AccountStatus::parse(&row.status),
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Public view of an account for `/user/info`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub customer_id: i64,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub machine_code: Option<String>,
    pub login_method: String,
    pub role: i16,
    pub status: AccountStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            customer_id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            phone: user.phone.clone(),
            avatar_url: user.avatar_url.clone(),
            machine_code: user.machine_code.clone(),
            login_method: user.login_method.clone(),
            role: user.role.as_i16(),
            status: user.status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}
