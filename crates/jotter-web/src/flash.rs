//! One-shot notices carried across a redirect in the session.

use tower_sessions::Session;

use jotter_types::session::FLASH_KEY;

use crate::error::WebError;

pub async fn push(session: &Session, message: impl Into<String>) -> Result<(), WebError> {
    let mut pending: Vec<String> = session.get(FLASH_KEY).await?.unwrap_or_default();
    pending.push(message.into());
    session.insert(FLASH_KEY, pending).await?;
    Ok(())
}

/// Remove and return every pending notice.
pub async fn take(session: &Session) -> Result<Vec<String>, WebError> {
    if session.get::<Vec<String>>(FLASH_KEY).await?.is_none() {
        return Ok(Vec::new());
    }
    Ok(session
        .remove::<Vec<String>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}
