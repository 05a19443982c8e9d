/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`session`]: HS256 session tokens and cookie helpers
/// - [`middleware`]: axum middleware resolving the session to an [`AuthContext`]
///
/// [`AuthContext`]: middleware::AuthContext

pub mod middleware;
pub mod password;
pub mod session;
