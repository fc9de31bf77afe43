// handlers/protected/scanner/mod.rs - Scan lookups and borrow/return under /scanner

pub mod borrow;
pub mod history;
pub mod scan;

pub use borrow::borrow_post;
pub use borrow::return_post;
pub use history::get as history_get;
pub use history::post as history_post;
pub use scan::get as scan_get;
