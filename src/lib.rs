#![doc = "The `kanmind` library crate."]
#![doc = ""]
#![doc = "Domain models, storage, authentication, routing configuration and error"]
#![doc = "handling for the KanMind Kanban API. The binary (`main.rs`) wires these"]
#![doc = "together into an actix-web server; the integration tests do the same"]
#![doc = "against the in-memory store."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

pub use crate::error::AppError;
