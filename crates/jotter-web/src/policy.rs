use tracing::warn;

use jotter_db::models::{PostRow, UserRow};

use crate::error::WebError;

/// Whether `user` may update or delete `post`: only its author may.
pub fn can_edit(user: Option<&UserRow>, post: &PostRow) -> bool {
    user.is_some_and(|user| user.id == post.author_id)
}

pub fn authorize_edit(user: &UserRow, post: &PostRow) -> Result<(), WebError> {
    if can_edit(Some(user), post) {
        Ok(())
    } else {
        warn!(
            user_id = user.id,
            post_id = post.id,
            author_id = post.author_id,
            "Rejected edit of another user's post"
        );
        Err(WebError::Forbidden)
    }
}
