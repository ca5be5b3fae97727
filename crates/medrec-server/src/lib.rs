//! HTTP server of the MedRec EHR backend.
//!
//! Request flow: [`middleware::request_id`] and the trace layer wrap every
//! request, [`extract`] resolves the tenant and decodes path, query and body,
//! the generic [`handlers`] call a [`service`] which validates and then hands
//! off to the PostgreSQL repositories. [`routes`] instantiates all of this
//! once per resource family.

pub mod config;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;

pub use config::{AppConfig, PostgresStorageConfig};
pub use extract::RequestSettings;
pub use server::{MedrecServer, ServerBuilder, build_app};
pub use service::{ChildService, ResourceService, ServiceError};
