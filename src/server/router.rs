use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{account, files, repositories};
use crate::auth::{PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::lifecycle::Lifecycle;
use crate::storage::ObjectStore;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub lifecycle: Lifecycle,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn Store>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            lifecycle: Lifecycle::new(store.clone(), objects, config.storage.bucket_prefix.clone()),
            store,
            tokens: TokenService::new(&config.auth),
            passwords: PasswordHasher::new(),
            cookie_secure: config.auth.cookie_secure,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Pages and sessions
        .route("/", get(account::index))
        .route("/login", get(account::login_page))
        .route("/signup", get(account::signup_page))
        .route("/token", post(account::login))
        .route("/register", post(account::signup))
        .route("/logout", get(account::logout))
        // Repositories
        .route("/repository", get(repositories::list_repositories))
        .route("/repository/create", post(repositories::create_repository))
        .route("/repository/{link}", get(repositories::get_repository))
        .route(
            "/repository/delete/{name}",
            get(repositories::delete_repository).post(repositories::delete_repository),
        )
        // Files
        .route(
            "/file/add/{link}",
            post(files::add_file).layer(DefaultBodyLimit::max(files::MAX_UPLOAD_BYTES)),
        )
        .route("/file/remove", post(files::remove_file))
        .route("/file/read", get(files::read_file))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
