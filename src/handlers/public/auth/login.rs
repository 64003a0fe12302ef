// handlers/public/auth/login.rs - POST /login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub role: i16,
    pub customer_id: i64,
}

/// POST /login - Authenticate with username and password
///
/// Expected Input:
/// ```json
/// { "username": "farmer01", "password": "secret" }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "code": 200,
///   "message": "success",
///   "data": { "token": "...", "username": "farmer01", "nickname": "farmer01",
///             "phone": null, "role": 0, "customerId": 12 }
/// }
/// ```
///
/// Unknown users, disabled accounts and wrong passwords all answer 400
/// `INVALID_CREDENTIAL`.
pub async fn login_post(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    let session = auth.login(&request.username, &request.password).await?;
    let user = session.user;

    Ok(ApiResponse::success(LoginResponse {
        token: session.token,
        username: user.username,
        nickname: user.nickname,
        phone: user.phone,
        role: user.role.as_i16(),
        customer_id: user.id,
    }))
}
