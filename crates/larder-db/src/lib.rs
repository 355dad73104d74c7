//! SurrealDB persistence layer for Larder.
//!
//! Provides the connection manager, schema migrations and the concrete
//! repository implementations behind the traits in `larder-core`. All
//! rows are stored with explicit UUID record ids so application-level
//! identifiers survive round-trips unchanged.

mod connection;
mod error;
mod image;
mod schema;

pub mod repository;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use image::{compress_image, decompress_image};
pub use schema::{run_migrations, schema_v1};
