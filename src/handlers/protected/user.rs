// handlers/protected/user.rs - account endpoints for the signed-in user

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::user::UserProfile;
use crate::database::repository::UserRepository;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct BindPhoneRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// GET /user/info - Profile of the caller
pub async fn info_get(
    State(users): State<UserRepository>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    let user = users.find_by_id(auth_user.user_id).await?;
    Ok(ApiResponse::success(user.profile()))
}

/// POST /user/bind-phone - Attach a phone number to the caller's account
///
/// 400 `CONFLICT` when another account already holds the number.
pub async fn bind_phone_post(
    State(auth): State<AuthService>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<BindPhoneRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Json(request) = payload?;
    let user = auth.bind_phone(auth_user.user_id, &request.phone).await?;
    Ok(ApiResponse::success(user.profile()).with_message("phone bound"))
}

/// POST /user/password - Change password after re-checking the current one
pub async fn password_post(
    State(auth): State<AuthService>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    auth.change_password(auth_user.user_id, &request.old_password, &request.new_password)
        .await?;
    Ok(ApiResponse::success(json!({ "customerId": auth_user.user_id })).with_message("password changed"))
}
