//! Server-rendered HTML.
//!
//! Pages are plain strings assembled here. Anything that came from a user
//! (usernames, titles, bodies, messages) goes through [`escape`] first.

use std::fmt::Write;

use axum::{http::StatusCode, response::Html};
use chrono::NaiveDateTime;
use tower_sessions::Session;
use tracing::warn;

use jotter_db::models::{PostRow, UserRow};

use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::policy;

/// Render a full page. Pending flash messages are consumed and shown ahead
/// of `notices`, which belong to this response only.
pub async fn render(
    session: &Session,
    current: &CurrentUser,
    title: &str,
    notices: Vec<String>,
    content: String,
) -> Result<Html<String>, WebError> {
    let mut messages = flash::take(session).await?;
    messages.extend(notices);
    Ok(Html(layout(title, current.user(), &messages, &content)))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// `YYYY-MM-DD` for a SQLite timestamp. Unparseable values are shown as stored.
pub fn display_date(created: &str) -> String {
    match NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S") {
        Ok(ts) => ts.format("%Y-%m-%d").to_string(),
        Err(e) => {
            warn!("Unparseable post timestamp '{}': {}", created, e);
            created.to_string()
        }
    }
}

pub fn layout(title: &str, user: Option<&UserRow>, messages: &[String], content: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<span class="who">{}</span>
      <a href="/dashboard">Dashboard</a>
      <a href="/create">New post</a>
      <a href="/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/register">Register</a>
      <a href="/login">Log in</a>"#
            .to_string(),
    };

    document(title, &nav, messages, content)
}

/// Page shell. `nav` is inserted after the home link.
fn document(title: &str, nav: &str, messages: &[String], content: &str) -> String {
    let mut flashes = String::new();
    for message in messages {
        let _ = write!(flashes, r#"<li class="flash">{}</li>"#, escape(message));
    }
    if !flashes.is_empty() {
        flashes = format!(r#"<ul class="flashes">{flashes}</ul>"#);
    }

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{title} - Jotter</title>
  </head>
  <body>
    <nav>
      <a href="/">Jotter</a>
      {nav}
    </nav>
    <main>
      <h1>{title}</h1>
      {flashes}
      {content}
    </main>
  </body>
</html>
"#,
        title = escape(title),
    )
}

fn post_article(post: &PostRow, controls: bool) -> String {
    let mut html = format!(
        r#"<article class="post">
  <header>
    <h2>{title}</h2>
    <p class="meta">by {author} on {date}</p>
  </header>
  <p class="body">{body}</p>"#,
        title = escape(&post.title),
        author = escape(&post.author_username),
        date = display_date(&post.created),
        body = escape(&post.body),
    );

    if controls {
        let _ = write!(
            html,
            r#"
  <a class="action" href="/{id}/update">Edit</a>
  <form method="post" action="/{id}/delete">
    <button type="submit">Delete</button>
  </form>"#,
            id = post.id
        );
    }

    html.push_str("\n</article>\n");
    html
}

pub fn home(posts: &[PostRow], user: Option<&UserRow>) -> String {
    if posts.is_empty() {
        return r#"<p class="empty">Nothing has been posted yet.</p>"#.to_string();
    }
    posts
        .iter()
        .map(|post| post_article(post, policy::can_edit(user, post)))
        .collect()
}

pub fn dashboard(posts: &[PostRow]) -> String {
    let mut html = String::from(r#"<p><a href="/create">Write a new post</a></p>"#);
    if posts.is_empty() {
        html.push_str(r#"<p class="empty">You have not written anything yet.</p>"#);
    }
    for post in posts {
        html.push_str(&post_article(post, true));
    }
    html
}

pub fn register_form() -> String {
    r#"<form method="post" action="/register">
  <label for="username">Username</label>
  <input name="username" id="username" required>
  <label for="password">Password</label>
  <input type="password" name="password" id="password" required>
  <button type="submit">Register</button>
</form>"#
        .to_string()
}

pub fn login_form() -> String {
    r#"<form method="post" action="/login">
  <label for="username">Username</label>
  <input name="username" id="username" required>
  <label for="password">Password</label>
  <input type="password" name="password" id="password" required>
  <button type="submit">Log in</button>
</form>"#
        .to_string()
}

pub fn create_form() -> String {
    post_form("/create", "", "", "Publish")
}

pub fn update_form(post: &PostRow) -> String {
    let mut html = post_form(
        &format!("/{}/update", post.id),
        &post.title,
        &post.body,
        "Save",
    );
    let _ = write!(
        html,
        r#"
<form method="post" action="/{}/delete">
  <button type="submit" class="danger">Delete</button>
</form>"#,
        post.id
    );
    html
}

fn post_form(action: &str, title: &str, body: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
  <label for="title">Title</label>
  <input name="title" id="title" value="{title}" required>
  <label for="body">Body</label>
  <textarea name="body" id="body">{body}</textarea>
  <button type="submit">{submit}</button>
</form>"#,
        title = escape(title),
        body = escape(body),
    )
}

/// Error responses are built without the request's user, so the nav holds
/// only the home link.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    document(
        title,
        "",
        &[],
        &format!(r#"<p class="error">{}</p><p><a href="/">Back to all posts</a></p>"#, escape(message)),
    )
}
