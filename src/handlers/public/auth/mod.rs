// handlers/public/auth/mod.rs - Token acquisition under /api

pub mod refresh;
pub mod signin;
pub mod signup;

pub use refresh::refresh_post;
pub use signin::signin_post;
pub use signup::signup_post;
