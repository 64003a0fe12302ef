// handlers/protected/machine.rs - machine code check / bind / lookup / unbind
//
// Bind, lookup and unbind act on the caller's own account; naming any other
// user id requires an active admin.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::models::machine_code::{is_well_formed, CodeStatus, MachineCode};
use crate::database::repository::{MachineCodeRepository, UserRepository};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub machine_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindRequest {
    pub machine_code: String,
    /// Defaults to the caller.
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub machine_code: String,
    pub status: CodeStatus,
    pub valid: bool,
}

fn normalize_code(raw: &str) -> Result<String, ApiError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ApiError::field_error("machineCode", "Machine code is required"));
    }
    if !is_well_formed(code) {
        return Err(ApiError::field_error(
            "machineCode",
            "Machine code must be 16 characters from 0-9 and A-Z",
        ));
    }
    Ok(code.to_string())
}

/// Allow the caller to act on `target` if it is themselves or they are an admin.
pub(crate) async fn ensure_self_or_admin(
    users: &UserRepository,
    caller: AuthUser,
    target: i64,
) -> Result<(), ApiError> {
    if caller.user_id == target {
        return Ok(());
    }
    let user = users.find_by_id(caller.user_id).await?;
    if user.is_active() && user.is_admin() {
        return Ok(());
    }
    tracing::warn!("User {} tried to manage machine code of user {}", caller.user_id, target);
    Err(ApiError::forbidden("You may only manage your own machine code"))
}

/// POST /machine/check - Report whether a code can be bound. Never mutates.
///
/// Expected Output:
/// ```json
/// { "code": 200, "message": "Machine code is valid",
///   "data": { "machineCode": "...", "status": "valid", "valid": true } }
/// ```
pub async fn check_post(
    State(codes): State<MachineCodeRepository>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<CheckResponse> {
    let Json(request) = payload?;
    let machine_code = normalize_code(&request.machine_code)?;
    let status = codes.check(&machine_code).await?;

    Ok(ApiResponse::success(CheckResponse {
        machine_code,
        status,
        valid: status == CodeStatus::Valid,
    })
    .with_message(status.message()))
}

/// POST /machine/bind - Bind an unbound, active code to a user
///
/// 403 when the code is disabled or already bound, or the user already holds
/// a code; 404 when the code does not exist.
pub async fn bind_post(
    State(codes): State<MachineCodeRepository>,
    State(users): State<UserRepository>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<BindRequest>, JsonRejection>,
) -> ApiResult<MachineCode> {
    let Json(request) = payload?;
    let machine_code = normalize_code(&request.machine_code)?;
    let target = request.user_id.unwrap_or(auth_user.user_id);
    ensure_self_or_admin(&users, auth_user, target).await?;

    let bound = codes.bind(&machine_code, target).await?;
    Ok(ApiResponse::success(bound).with_message("bound"))
}

/// GET /machine/user/:userId - The code bound to a user
pub async fn user_get(
    State(codes): State<MachineCodeRepository>,
    State(users): State<UserRepository>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<MachineCode> {
    let Path(target) = path?;
    ensure_self_or_admin(&users, auth_user, target).await?;

    let code = codes
        .find_by_user(target)
        .await?
        .ok_or_else(|| ApiError::not_found("User has no machine code bound"))?;
    Ok(ApiResponse::success(code))
}

/// DELETE /machine/user/:userId - Release the user's code
pub async fn user_delete(
    State(codes): State<MachineCodeRepository>,
    State(users): State<UserRepository>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(target) = path?;
    ensure_self_or_admin(&users, auth_user, target).await?;

    codes.unbind(target).await?;
    Ok(ApiResponse::success(json!({ "userId": target })).with_message("unbound"))
}
