// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and invitation redemption. Every input here is untrusted.
pub mod auth;
