// handlers/public/auth/register.rs - POST /register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub token: String,
    pub username: String,
    pub customer_id: i64,
}

/// POST /register - Create a password account and sign it in
///
/// Expected Input:
/// ```json
/// { "username": "farmer01", "password": "secret", "phone": "13812345678" }
/// ```
///
/// Expected Output (201):
/// ```json
/// { "code": 201, "message": "registered", "data": { "token": "...", "username": "farmer01", "customerId": 12 } }
/// ```
///
/// A taken username or phone number is a 400 with error `CONFLICT`.
pub async fn register_post(
    State(auth): State<AuthService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(request) = payload?;
    let session = auth
        .register(&request.username, &request.password, request.phone.as_deref())
        .await?;

    Ok(ApiResponse::created(RegisterResponse {
        token: session.token,
        username: session.user.username.unwrap_or(request.username),
        customer_id: session.user.id,
    })
    .with_message("registered"))
}
