//! Shared library for the Worldkeeper calendar Lambda functions.
//!
//! This crate provides configuration, error types, database access and the
//! calendar read used by the API Gateway Lambdas.

pub mod calendars;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod params;
pub mod query;
pub mod secrets;
pub mod session;

pub use calendars::{calendar_select, fetch_calendar};
pub use client::{DataSource, ScopedClient};
pub use config::Config;
pub use db::{connect_options, create_pool, PgDataSource};
pub use error::{BackendError, Error, Result, ValidationError};
pub use models::{Calendar, CalendarEvent, Record};
pub use params::CalendarQuery;
pub use query::{FilterValue, Relation, Select, Statement};
pub use secrets::{get_database_credentials, get_secret, DatabaseCredentials};
pub use session::SessionContext;
