//! Rust and Python-facing client library for the Infoblox NIOS WAPI.
//!
//! Public API layers:
//! - [`ClientConfig`]/[`Credentials`]: grid host, WAPI version, auth and TLS policy.
//! - [`WapiClient`]/[`BlockingWapiClient`]: `get`/`create`/`update`/`delete`
//!   mapped onto WAPI GET/POST/PUT/DELETE calls.
//! - [`GetOptions`]: paging and result-size controls for reads.
//! - [`ClientError`]: unified error type used by all clients.
//!
//! Objects travel as [`serde_json::Value`]; the server is the only schema.

mod blocking_client;
mod client;
mod config;
mod error;
mod query;
mod response;

/// Blocking WAPI client.
pub use blocking_client::BlockingWapiClient;
/// Async WAPI client.
pub use client::WapiClient;
pub use config::{ClientConfig, Credentials, DEFAULT_WAPI_VERSION};
/// Error type returned by all client operations.
pub use error::ClientError;
pub use query::{DEFAULT_PAGE_SIZE, GetOptions};

#[cfg(feature = "python")]
mod python;
