//! Clinic HTTP API.
//!
//! Exposes the clinic domain logic as JSON endpoints. Routes are nested
//! under `/api/` and protected per group by: Auth → Role guard → Handler.
//!
//! The router is composable: `clinic_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::clinic_router;
pub use server::{start_server, ClinicServer, ServerError};
pub use types::ApiContext;
