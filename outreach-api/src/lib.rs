//! # Outreach API Server Library
//!
//! HTTP surface of the outreach backend: sending and scheduling email,
//! delivery webhooks, plan quotas, templates and sender sessions.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: error handling and HTTP response mapping
//! - `middleware`: response hardening
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
