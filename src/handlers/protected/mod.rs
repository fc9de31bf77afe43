// handlers/protected/mod.rs - Handlers behind JWT authentication
//
// Every route in this tier runs after `jwt_auth_middleware` (bearer token ->
// claims) and `validate_user_middleware` (claims -> active account with its
// organization and permissions). Handlers read the caller through
// `Extension<ValidatedUser>` and scope every query to `user.org_id()`.
// Permission checks (`user.require(...)`) happen inside the handlers.

pub mod auth;
pub mod invitations;
pub mod items;
pub mod organization;
pub mod profile;
pub mod requests;
pub mod roles;
pub mod scanner;
pub mod scheme;
pub mod upload;
pub mod user_scans;
pub mod users;

pub use auth::*;
