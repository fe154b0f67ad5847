// handlers/public/auth/mod.rs - Public authentication handlers

pub mod invitation; // GET /auth/verify-invitation, POST /auth/signup
pub mod login; // POST /auth/login

pub use invitation::{signup_post, verify_invitation_get};
pub use login::login_post;
