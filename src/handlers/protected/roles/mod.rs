// handlers/protected/roles/mod.rs - Roles under /roles, permission catalogue under /permissions

pub mod permissions;
pub mod role;

pub use permissions::catalogue_get as permissions_get;
pub use permissions::get as role_permissions_get;
pub use permissions::put as role_permissions_put;
pub use role::delete as role_delete;
pub use role::list as roles_get;
pub use role::post as role_post;
pub use role::put as role_put;
