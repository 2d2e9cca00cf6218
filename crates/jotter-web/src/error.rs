use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::views;

/// Failures a handler can end in.
///
/// Validation problems never reach this type: they are shown on the form
/// that produced them. `LoginRequired` sends the caller to the login form,
/// `NotFound` and `Forbidden` render a short page, and the rest are logged
/// and answered with a generic 500.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("password hash error: {0}")]
    PasswordHash(argon2::password_hash::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("login required")]
    LoginRequired,

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::LoginRequired => return Redirect::to("/login").into_response(),
            WebError::NotFound => (StatusCode::NOT_FOUND, "That page does not exist."),
            WebError::Forbidden => (StatusCode::FORBIDDEN, "You can only change your own posts."),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
            }
        };

        (status, Html(views::error_page(status, message))).into_response()
    }
}
