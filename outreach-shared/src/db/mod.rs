/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a health check
/// - `migrations`: embedded migration runner
///
/// Models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
