use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::database::repository::{CredentialError, UserRepository};
use crate::error::ApiError;

/// Middleware for admin-only routes. Must run after [`super::jwt_auth_middleware`];
/// loads the caller and requires an active account with the admin role.
pub async fn require_admin(
    State(users): State<UserRepository>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = *request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before admin check"))?;

    let user = match users.find_by_id(auth_user.user_id).await {
        Ok(user) => user,
        Err(CredentialError::NotFound) => {
            tracing::warn!("Admin check failed: user {} no longer exists", auth_user.user_id);
            return Err(ApiError::forbidden("Administrator access required"));
        }
        Err(e) => return Err(e.into()),
    };

    if !user.is_active() || !user.is_admin() {
        tracing::warn!("User {} denied access to {}", user.id, request.uri().path());
        return Err(ApiError::forbidden("Administrator access required"));
    }

    Ok(next.run(request).await)
}
