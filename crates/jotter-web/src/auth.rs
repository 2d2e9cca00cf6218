use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, info};

use jotter_db::models::NewUser;
use jotter_types::forms::{LoginForm, RegisterForm, is_blank};
use jotter_types::session::USER_ID_KEY;

use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::password;
use crate::state::AppState;
use crate::views::{self, render};

pub async fn register_form(
    session: Session,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, WebError> {
    let page = render(&session, &current, "Register", vec![], views::register_form()).await?;
    Ok(page.into_response())
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    let error = if is_blank(&form.username) {
        "Username is required.".to_string()
    } else if is_blank(&form.password) {
        "Password is required.".to_string()
    } else {
        let password_hash = password::hash(&form.password)?;
        let username = form.username.clone();

        match state
            .run_db(move |db| db.create_user(&username, &password_hash))
            .await?
        {
            NewUser::Created(user_id) => {
                info!(user_id, username = %form.username, "Registered user");
                flash::push(&session, "Registration complete. Please log in.").await?;
                return Ok(Redirect::to("/login").into_response());
            }
            NewUser::UsernameTaken => format!("User {} is already registered.", form.username),
        }
    };

    debug!(%error, "Registration rejected");
    let page = render(&session, &current, "Register", vec![error], views::register_form()).await?;
    Ok(page.into_response())
}

pub async fn login_form(
    session: Session,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, WebError> {
    let page = render(&session, &current, "Log in", vec![], views::login_form()).await?;
    Ok(page.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let username = form.username.clone();
    let user = state
        .run_db(move |db| db.get_user_by_username(&username))
        .await?;

    let error = match user {
        None => "Invalid username.",
        Some(user) => {
            if password::verify(&form.password, &user.password)? {
                // Start from a clean session under a new id
                session.clear().await;
                session.cycle_id().await?;
                session.insert(USER_ID_KEY, user.id).await?;

                info!(user_id = user.id, "User logged in");
                return Ok(Redirect::to("/dashboard").into_response());
            }
            "Incorrect password."
        }
    };

    debug!(username = %form.username, error, "Login rejected");
    let page = render(
        &session,
        &current,
        "Log in",
        vec![error.to_string()],
        views::login_form(),
    )
    .await?;
    Ok(page.into_response())
}

/// Drops the whole session, logged in or not.
pub async fn logout(session: Session) -> Result<Redirect, WebError> {
    session.flush().await?;
    Ok(Redirect::to("/"))
}
