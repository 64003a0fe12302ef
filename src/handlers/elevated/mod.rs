// handlers/elevated/mod.rs - Admin-only handlers
//
// Routes here run behind both `jwt_auth_middleware` and `require_admin`.
pub mod machine;
