use axum::{
    Extension, Form,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, info};

use jotter_db::models::PostRow;
use jotter_types::forms::{PostForm, is_blank};

use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::policy::authorize_edit;
use crate::state::AppState;
use crate::views::{self, render};

const MISSING_TITLE: &str = "Don't forget to add a title.";

/// Public listing of every post, newest first.
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let posts = state.run_db(|db| db.list_posts()).await?;
    let content = views::home(&posts, current.user());
    render(&session, &current, "All posts", vec![], content).await
}

/// The logged-in user's own posts.
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let author_id = current.require()?.id;
    let posts = state
        .run_db(move |db| db.list_posts_by_author(author_id))
        .await?;

    render(&session, &current, "Dashboard", vec![], views::dashboard(&posts)).await
}

pub async fn create_form(
    session: Session,
    Extension(current): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    current.require()?;
    render(&session, &current, "New post", vec![], views::create_form()).await
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    let author_id = current.require()?.id;

    if is_blank(&form.title) {
        debug!(user_id = author_id, "Post rejected without a title");
        let page = render(
            &session,
            &current,
            "New post",
            vec![MISSING_TITLE.to_string()],
            views::create_form(),
        )
        .await?;
        return Ok(page.into_response());
    }

    let post_id = state
        .run_db(move |db| db.create_post(author_id, &form.title, &form.body))
        .await?;

    info!(post_id, author_id, "Created post");
    Ok(Redirect::to("/dashboard").into_response())
}

/// The `{id}` segment of post routes. A segment that is not an `i64` names
/// no post, so it is answered like any other unknown post.
pub struct PostId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for PostId {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!(%rejection, "Unusable post id");
                WebError::NotFound
            })?;
        Ok(PostId(id))
    }
}

/// A write that touched no row means the post disappeared after it was loaded.
fn ensure_changed(changed: bool) -> Result<(), WebError> {
    if changed {
        Ok(())
    } else {
        Err(WebError::NotFound)
    }
}

/// Load a post the current user is allowed to change.
async fn editable_post(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
) -> Result<PostRow, WebError> {
    let user = current.require()?;

    let post = state
        .run_db(move |db| db.get_post(id))
        .await?
        .ok_or(WebError::NotFound)?;

    authorize_edit(user, &post)?;
    Ok(post)
}

pub async fn update_form(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    PostId(id): PostId,
) -> Result<Html<String>, WebError> {
    let post = editable_post(&state, &current, id).await?;
    render(&session, &current, "Edit post", vec![], views::update_form(&post)).await
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    PostId(id): PostId,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    let post = editable_post(&state, &current, id).await?;

    if is_blank(&form.title) {
        debug!(post_id = id, "Update rejected without a title");
        let page = render(
            &session,
            &current,
            "Edit post",
            vec![MISSING_TITLE.to_string()],
            views::update_form(&post),
        )
        .await?;
        return Ok(page.into_response());
    }

    let changed = state
        .run_db(move |db| db.update_post(id, &form.title, &form.body))
        .await?;
    ensure_changed(changed)?;

    info!(post_id = id, "Updated post");
    flash::push(&session, "Post updated.").await?;
    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    PostId(id): PostId,
) -> Result<Redirect, WebError> {
    editable_post(&state, &current, id).await?;

    let changed = state.run_db(move |db| db.delete_post(id)).await?;
    ensure_changed(changed)?;

    info!(post_id = id, "Deleted post");
    flash::push(&session, "Post deleted.").await?;
    Ok(Redirect::to("/dashboard"))
}

pub async fn not_found() -> WebError {
    WebError::NotFound
}
