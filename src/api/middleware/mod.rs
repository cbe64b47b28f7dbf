//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Access log: every request, with the caller once known
//! 2. Rate limiter: unauthenticated auth routes only
//! 3. Auth guard: bearer token resolved to a live user
//! 4. Role guard: patient, doctor or admin route groups

pub mod access;
pub mod auth;
pub mod rate;
pub mod role;
