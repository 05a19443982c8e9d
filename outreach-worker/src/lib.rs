//! # Outreach Worker Library
//!
//! Sends scheduled emails once they come due.
//!
//! ## Modules
//!
//! - `config`: configuration from the environment
//! - `dispatcher`: polling loop that claims and sends due emails

pub mod config;
pub mod dispatcher;
