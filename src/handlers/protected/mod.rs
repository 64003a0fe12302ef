// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route in this tier sits behind `jwt_auth_middleware`, so handlers can
// take `Extension<AuthUser>` and trust its user id.
pub mod machine;
pub mod records;
pub mod user;
