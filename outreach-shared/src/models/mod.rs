/// Database models for the outreach backend
///
/// Each model owns its SQL and exposes associated async functions taking a
/// `&PgPool`. Handlers do not call these directly; they go through the
/// [`Store`](crate::store::Store) trait.
///
/// # Models
///
/// - `sender`: authenticated accounts
/// - `plan`: subscription tier and resource ceilings
/// - `usage`: live counters checked against the plan
/// - `scheduled_email`: future-dated sends, one row per recipient
/// - `email_record`: history of sent emails and their delivery status
/// - `template`: templates and categories

pub mod email_record;
pub mod plan;
pub mod scheduled_email;
pub mod sender;
pub mod template;
pub mod usage;
