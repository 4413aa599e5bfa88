//! MediBridge API - REST server for clinical records
//!
//! Cookie-session authentication, role-gated patient endpoints, sparse
//! updates through the core reconciler, and audit logging.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::create_router;
