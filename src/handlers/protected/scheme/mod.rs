// handlers/protected/scheme/mod.rs - Model-agnostic routes under /scheme

pub mod list;
pub mod postman;
pub mod record;
pub mod relax;
pub mod reports;

pub use list::fuse_search as fuse_search_get;
pub use list::list as list_get;
pub use list::list_multi as list_multi_get;
pub use postman::post as postman_post;
pub use record::get as record_get;
pub use record::patch as record_patch;
pub use record::post as record_post;
pub use record::put as record_put;
pub use relax::multi as relax_multi_put;
pub use relax::read as relax_read_get;
pub use reports::csv_generate as csv_generate_get;
pub use reports::csv_template as csv_template_get;
pub use reports::csv_upload as csv_upload_put;
pub use reports::pdf_generate as pdf_generate_get;

use crate::database::DynamicRepository;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::scheme;

/// Repository for `model`, scoped to the caller's organization
pub(crate) async fn repository(model: &str, user: &ValidatedUser) -> Result<DynamicRepository<'static>, ApiError> {
    Ok(scheme::open(model, user.org_id()).await?)
}

/// Like [`repository`], but the caller must hold the model's write permission
pub(crate) async fn writable_repository(model: &str, user: &ValidatedUser) -> Result<DynamicRepository<'static>, ApiError> {
    let schema = scheme::lookup(model)?;
    scheme::ensure_writable(schema)?;
    user.require_opt(schema.write_permission)?;
    repository(model, user).await
}
