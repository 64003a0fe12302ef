// handlers/mod.rs - Three-tier handler layout
//
// Public (no auth) → Protected (JWT auth) → Elevated (JWT auth + admin role)
pub mod elevated;
pub mod protected;
pub mod public;
