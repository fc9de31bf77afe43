// handlers/protected/auth/mod.rs - Session endpoints under /api

pub mod session;

pub use session::{logout_post, verify_get};
