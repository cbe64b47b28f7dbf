//! API endpoint handlers, one module per route group.
//!
//! Handlers stay thin: parse, hop onto the blocking pool with a fresh
//! connection, call into `crate::clinic`, serialize.

pub mod admin;
pub mod auth;
pub mod doctor;
pub mod health;
pub mod patient;
