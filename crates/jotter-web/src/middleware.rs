use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::debug;

use jotter_db::models::UserRow;
use jotter_types::session::USER_ID_KEY;

use crate::error::WebError;
use crate::state::AppState;

/// The user a request acts for, if anyone is logged in.
///
/// Inserted into request extensions by [`resolve_user`]; handlers read it
/// with `Extension<CurrentUser>`.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<UserRow>);

impl CurrentUser {
    pub fn user(&self) -> Option<&UserRow> {
        self.0.as_ref()
    }

    /// The logged-in user, or [`WebError::LoginRequired`].
    pub fn require(&self) -> Result<&UserRow, WebError> {
        self.user().ok_or(WebError::LoginRequired)
    }
}

/// Map the session's user id to a user row.
///
/// An id whose user no longer exists resolves to an anonymous request.
pub async fn resolve_user(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let user = match session.get::<i64>(USER_ID_KEY).await? {
        Some(user_id) => {
            let user = state.run_db(move |db| db.get_user_by_id(user_id)).await?;
            if user.is_none() {
                debug!(user_id, "Session refers to a missing user");
            }
            user
        }
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
