// handlers/protected/mod.rs - Protected handlers (bearer authentication required)
//
// `require_principal` runs first and inserts the `Principal` extension;
// capability checks happen in the services.
pub mod auth;
pub mod inventory;
