//! HTTP routing service: a route table other services register handlers on.
//!
//! No listener is bound here; the table is the contract between services.

pub mod config;
pub mod module;
pub mod routes;

pub use config::HttpConfig;
pub use module::HttpServiceFactory;
pub use routes::{HttpService, Route};
