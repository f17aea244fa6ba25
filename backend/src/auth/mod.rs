//! Staff authentication: password hashing and the session cookie.

pub mod bootstrap;
pub mod password;
pub mod session;

pub use session::{CurrentUser, SESSION_COOKIE_NAME};
