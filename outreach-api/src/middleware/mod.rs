/// Middleware for the API server
///
/// Session authentication lives in `outreach_shared::auth::middleware`.

pub mod security;
