// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition endpoints. Everything here validates its own input since
// there is no trusted caller context.
pub mod auth;
