// handlers/protected/users/mod.rs - Organization members under /user

pub mod export;
pub mod list;
pub mod record;

pub use export::get as export_get;
pub use list::get as list_get;
pub use list::search as search_get;
pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::patch as record_patch;
pub use record::post as record_post;
