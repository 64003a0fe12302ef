use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::WechatConfig;

/// The identity pair a social provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialIdentity {
    pub open_id: String,
    pub union_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SocialLoginError {
    #[error("WeChat login is not configured")]
    NotConfigured,

    #[error("WeChat request failed: {0}")]
    Transport(String),

    #[error("WeChat rejected the login code ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("WeChat response did not include an openid")]
    MissingOpenId,
}

/// Exchanges a client-side login code for a verified identity.
#[async_trait]
pub trait SocialIdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<SocialIdentity, SocialLoginError>;
}

/// `jscode2session` client for WeChat mini-programs.
pub struct WechatClient {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    session_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    openid: Option<String>,
    #[serde(default)]
    unionid: Option<String>,
    #[serde(default)]
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}

impl SessionResponse {
    fn into_identity(self) -> Result<SocialIdentity, SocialLoginError> {
        if let Some(code) = self.errcode.filter(|c| *c != 0) {
            return Err(SocialLoginError::Rejected {
                code,
                message: self.errmsg.unwrap_or_default(),
            });
        }
        let open_id = self
            .openid
            .filter(|id| !id.is_empty())
            .ok_or(SocialLoginError::MissingOpenId)?;
        Ok(SocialIdentity {
            open_id,
            union_id: self.unionid.filter(|id| !id.is_empty()),
        })
    }
}

impl WechatClient {
    pub fn new(config: &WechatConfig) -> Result<Self, SocialLoginError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SocialLoginError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            session_url: config.session_url.clone(),
        })
    }

    fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.app_secret.is_empty()
    }
}

#[async_trait]
impl SocialIdentityProvider for WechatClient {
    async fn exchange_code(&self, code: &str) -> Result<SocialIdentity, SocialLoginError> {
        if !self.is_configured() {
            return Err(SocialLoginError::NotConfigured);
        }

        let response = self
            .http
            .get(&self.session_url)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| SocialLoginError::Transport(e.to_string()))?;

        // Failures arrive as HTTP 200 with an errcode, often labelled text/plain.
        let body = response
            .text()
            .await
            .map_err(|e| SocialLoginError::Transport(e.to_string()))?;
        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| SocialLoginError::Transport(format!("unexpected response: {e}")))?;

        let identity = session.into_identity();
        if let Err(e) = &identity {
            warn!("WeChat code exchange failed: {}", e);
        }
        identity
    }
}
