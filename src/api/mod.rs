pub mod download;
pub mod extract;
pub mod format;
pub mod image;
pub mod multipart;
pub mod validate;

pub use extract::ApiJson;
pub use multipart::MultipartForm;
pub use validate::FieldErrors;
