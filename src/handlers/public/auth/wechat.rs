// handlers/public/auth/wechat.rs - POST /wxLogin handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WxLoginRequest {
    pub code: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_base64: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WxLoginResponse {
    pub token: String,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub role: i16,
    pub customer_id: i64,
    pub is_new_user: bool,
}

/// POST /wxLogin - Exchange a mini-program login code for a session
///
/// The first login for an identity creates the account. A disabled account
/// gets 403; a failed exchange with WeChat gets 502.
pub async fn wx_login_post(
    State(auth): State<AuthService>,
    payload: Result<Json<WxLoginRequest>, JsonRejection>,
) -> ApiResult<WxLoginResponse> {
    let Json(request) = payload?;
    let session = auth
        .wechat_login(
            &request.code,
            request.nickname.as_deref(),
            request.avatar_base64.as_deref(),
        )
        .await?;
    let user = session.user;

    Ok(ApiResponse::success(WxLoginResponse {
        token: session.token,
        nickname: user.nickname,
        phone: user.phone,
        role: user.role.as_i16(),
        customer_id: user.id,
        is_new_user: session.is_new_user,
    }))
}
