// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer session resolved to an active Principal)
pub mod protected;
pub mod public;
