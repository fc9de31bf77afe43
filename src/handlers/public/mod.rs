// handlers/public/mod.rs - Endpoints that need no access token

pub mod auth;
pub mod invitations;
pub mod scheme;
pub mod system;
pub mod upload;

pub use auth::*;
