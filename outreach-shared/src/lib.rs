//! # Outreach Shared Library
//!
//! Types and business logic shared by the outreach API server and the
//! scheduled-email worker.
//!
//! ## Module Organization
//!
//! - `models`: database models and their SQL
//! - `db`: connection pool and embedded migrations
//! - `store`: persistence trait with PostgreSQL and in-memory backends
//! - `auth`: password hashing, session tokens, session middleware
//! - `quota`: plan ceiling checks
//! - `usage_recorder`: usage counter updates
//! - `webhook`: delivery-provider webhook verification and event mapping
//! - `provider`: delivery and completion provider clients

pub mod auth;
pub mod db;
pub mod models;
pub mod provider;
pub mod quota;
pub mod store;
pub mod usage_recorder;
pub mod webhook;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
