pub mod admin;
pub mod auth;
pub mod response;

pub use admin::require_admin;
pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult, PagedResponse, PagedResult};
