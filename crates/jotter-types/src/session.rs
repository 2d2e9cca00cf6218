//! Keys under which request state is kept in the `tower-sessions` session.

/// Id of the authenticated user. Absent for anonymous visitors.
pub const USER_ID_KEY: &str = "user_id";

/// Pending one-shot notices, shown on the next rendered page.
pub const FLASH_KEY: &str = "_flashes";
