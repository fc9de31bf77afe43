//! Router assembly: public routes, the JWT-protected tier, and the global
//! middleware stack.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn,
    routing::{delete, get, patch, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::CONFIG;
use crate::handlers::{protected, public};
use crate::mailer::{LogMailer, Mailer};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::storage::{ImageStore, PgImageStore};

/// Services shared by every handler through `Extension<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub images: Arc<dyn ImageStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            images: Arc::new(PgImageStore::new()),
            mailer: Arc::new(LogMailer),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(session_routes())
        .merge(item_routes())
        .merge(scanner_routes())
        .merge(request_routes())
        .merge(user_routes())
        .merge(role_routes())
        .merge(organization_routes())
        .merge(account_routes())
        .merge(upload_routes())
        .merge(scheme_routes())
        // jwt runs first, then the account lookup
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn(jwt_auth_middleware));

    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected)
        .layer(Extension(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(CONFIG.api.max_request_size_bytes));

    if CONFIG.security.enable_cors {
        router = router.layer(cors_layer(&CONFIG.security.cors_origins));
    }
    if CONFIG.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

/// Permissive unless specific origins are configured
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if allowed.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
    }
}

fn public_routes() -> Router {
    use public::{auth, invitations, scheme, system, upload};

    Router::new()
        .route("/", get(system::root_get))
        .route("/health", get(system::health_get))
        // Token acquisition
        .route("/api/signup", post(auth::signup_post))
        .route("/api/signin", post(auth::signin_post))
        .route("/api/refresh-token", post(auth::refresh_post))
        // Invitation acceptance
        .route("/invitations/verify", post(invitations::verify_post))
        .route("/invitations/register", post(invitations::register_post))
        .route("/upload/image/:image_id/:filename", get(upload::image_get))
        .route("/scheme", get(scheme::status_get))
}

fn session_routes() -> Router {
    use protected::auth;

    Router::new()
        .route("/api/verify", get(auth::verify_get))
        .route("/api/logout", post(auth::logout_post))
}

fn item_routes() -> Router {
    use protected::items;

    Router::new()
        .route("/items", get(items::list_get).post(items::record_post))
        .route("/items/scan/:code", get(items::scan_get))
        .route(
            "/items/:item_id",
            get(items::record_get)
                .put(items::record_put)
                .delete(items::record_delete),
        )
        .route("/items/:item_id/image", get(items::image_get))
}

fn scanner_routes() -> Router {
    use protected::scanner;

    Router::new()
        .route("/scanner/scan/:code", get(scanner::scan_get))
        .route("/scanner/borrow", post(scanner::borrow_post))
        .route("/scanner/return", post(scanner::return_post))
        .route("/scanner/history", get(scanner::history_get).post(scanner::history_post))
}

fn request_routes() -> Router {
    use protected::{requests, user_scans};

    Router::new()
        .route("/requests", get(requests::list_get).post(requests::post))
        .route("/requests/:id", patch(requests::status_patch))
        .route("/user-management", get(user_scans::list_get).post(user_scans::post))
        .route("/user-management/:id", patch(user_scans::status_patch))
}

fn user_routes() -> Router {
    use protected::{invitations, users};

    Router::new()
        .route("/user", get(users::list_get).post(users::record_post))
        .route("/user/search", get(users::search_get))
        .route("/user/export", get(users::export_get))
        .route(
            "/user/:id",
            get(users::record_get)
                .patch(users::record_patch)
                .delete(users::record_delete),
        )
        .route("/invitations", post(invitations::post))
}

fn role_routes() -> Router {
    use protected::roles;

    Router::new()
        .route("/roles", get(roles::roles_get).post(roles::role_post))
        .route("/roles/:role_id", put(roles::role_put).delete(roles::role_delete))
        .route(
            "/roles/:role_id/permissions",
            get(roles::role_permissions_get).put(roles::role_permissions_put),
        )
        .route("/permissions", get(roles::permissions_get))
}

fn organization_routes() -> Router {
    use protected::organization;

    Router::new()
        .route("/organization/:org_id", get(organization::get))
        .route("/organization/:org_id/logo", get(organization::logo_get))
        .route("/organization/upload-logo/:org_id", post(organization::logo_post))
}

fn account_routes() -> Router {
    use protected::profile;

    Router::new()
        .route("/profile", get(profile::get).put(profile::put))
        .route("/security", put(profile::security_put))
        .route(
            "/notifications",
            get(profile::notifications_get).put(profile::notifications_put),
        )
}

fn upload_routes() -> Router {
    use protected::upload;

    Router::new()
        .route("/upload/organization-photo", post(upload::organization_photo_post))
        .route("/upload/profile-picture", post(upload::profile_picture_post))
        .route("/upload/item-image", post(upload::item_image_post))
        .route("/upload/image/:image_id", delete(upload::image_delete))
}

fn scheme_routes() -> Router {
    use protected::scheme;

    Router::new()
        .route("/scheme/list-multi", get(scheme::list_multi_get))
        .route("/scheme/list/:model", get(scheme::list_get))
        .route("/scheme/fuse-search/:model", get(scheme::fuse_search_get))
        .route("/scheme/relax/read", get(scheme::relax_read_get))
        .route("/scheme/relax/multi/:model", put(scheme::relax_multi_put))
        .route("/scheme/csv/template/:model", get(scheme::csv_template_get))
        .route("/scheme/csv/generate/:model", get(scheme::csv_generate_get))
        .route("/scheme/csv/upload/:model", put(scheme::csv_upload_put))
        .route("/scheme/pdf/generate/:model", get(scheme::pdf_generate_get))
        .route("/scheme/postman/generate", post(scheme::postman_post))
        .route(
            "/scheme/:model",
            get(scheme::record_get)
                .post(scheme::record_post)
                .patch(scheme::record_patch)
                .put(scheme::record_put),
        )
}
