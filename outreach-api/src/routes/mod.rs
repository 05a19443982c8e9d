/// API route handlers, one module per resource
///
/// - `health`: liveness and store connectivity
/// - `auth`: sign-up, login, logout, session
/// - `webhooks`: delivery-provider events
/// - `schedule`: scheduled emails
/// - `send`: immediate send
/// - `usage`: plan usage and quota checks
/// - `ai`: text generation proxy
/// - `templates`, `categories`: template library
/// - `history`: sent-email history and analytics

pub mod ai;
pub mod auth;
pub mod categories;
pub mod health;
pub mod history;
pub mod schedule;
pub mod send;
pub mod templates;
pub mod usage;
pub mod webhooks;
