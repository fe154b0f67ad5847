// handlers/protected/auth/mod.rs - Team management for authenticated users

pub mod invite; // POST /auth/invite, GET /auth/invitations
pub mod whoami; // GET /auth/me

pub use invite::{invitations_get, invite_post};
pub use whoami::me_get;
