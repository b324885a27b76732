//! API Module
//!
//! HTTP handlers and routing for the file cache REST API.
//!
//! # Endpoints
//! - `PUT /entries/:name` - Write an entry
//! - `GET /entries/:name` - Stream an entry's payload
//! - `GET /entries/:name/meta` - Read an entry's metadata record
//! - `GET /entries/:name/exists` - Check an entry
//! - `POST /entries/:name/reset` - Restart an entry's ttl
//! - `DELETE /entries/:name` - Delete an entry
//! - `DELETE /entries` - Clear the cache
//! - `GET /stats` - Operation timings
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
