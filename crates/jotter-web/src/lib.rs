pub mod auth;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod posts;
pub mod state;
pub mod views;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::Key};

use jotter_db::SqliteStore;

pub use error::WebError;
pub use state::{AppState, AppStateInner};

/// How session cookies are issued.
pub struct SessionSettings {
    /// Signs the session cookie. A key generated at startup invalidates every
    /// session on restart; a configured one keeps them.
    pub key: Key,
    pub expiry: Expiry,
    /// Mark the cookie `Secure` (HTTPS only).
    pub secure: bool,
}

/// The complete blog application.
pub fn app(state: AppState, store: SqliteStore, settings: SessionSettings) -> Router {
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(settings.secure)
        .with_expiry(settings.expiry)
        .with_signed(settings.key);

    Router::new()
        .route("/", get(posts::home))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(posts::dashboard).post(posts::dashboard))
        .route("/create", get(posts::create_form).post(posts::create))
        .route("/{id}/update", get(posts::update_form).post(posts::update))
        // Deleting is never done through GET
        .route("/{id}/delete", post(posts::delete))
        .fallback(posts::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_user,
        ))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
