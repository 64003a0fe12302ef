// handlers/elevated/machine.rs - POST /machine/create handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use crate::database::models::machine_code::MachineCode;
use crate::database::repository::MachineCodeRepository;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct CreateMachineCodeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /machine/create - Mint a new active, unbound 16-character code
///
/// Expected Input (all optional):
/// ```json
/// { "name": "greenhouse-3", "description": "sensor hub" }
/// ```
pub async fn create_post(
    State(codes): State<MachineCodeRepository>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<CreateMachineCodeRequest>, JsonRejection>,
) -> ApiResult<MachineCode> {
    let Json(request) = payload?;
    let name = request.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let description = request.description.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let code = codes.create(Some(auth_user.user_id), name, description).await?;
    tracing::info!("User {} created machine code {}", auth_user.user_id, code.code);
    Ok(ApiResponse::created(code))
}
