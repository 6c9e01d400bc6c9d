//! Client for the event ingestion API.
//!
//! Three submission modes are supported:
//!
//! - [`IngestClient::submit_batch`] sends many events at once. Rejected events
//!   are reported back by their position in the batch, as data rather than as
//!   an error.
//! - [`IngestClient::submit_one`] sends a single event.
//! - [`IngestClient::submit_to_table`] sends an arbitrary payload to a table.
//!
//! Every request is authenticated with the write token as a bearer token.
//!
//! # Example
//!
//! ```no_run
//! use ingest_client::{Event, IngestClient};
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), ingest_client::IngestError> {
//! let client = IngestClient::new("https://ingest.example.com", "write-token", "read-token", None)?;
//! let cancel = CancellationToken::new();
//!
//! let events = vec![
//!     Event::new("page_views", json!({"path": "/"}))?,
//!     Event::new("clicks", json!({"target": "signup"}))?,
//! ];
//! let failed = client.submit_batch(&events, &cancel).await?;
//! for (index, message) in &failed {
//!     println!("event {index} was rejected: {message}");
//! }
//!
//! client
//!     .submit_to_table("events_2024", &json!({"id": 1}), &cancel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod routes;
mod types;

pub use client::{IngestClient, IngestClientBuilder};
pub use config::{CredentialLocation, IngestClientConfig, RoutesConfig};
pub use error::IngestError;
pub use routes::{
    DEFAULT_BATCH_ROUTE, DEFAULT_SINGLE_ROUTE, DEFAULT_TABLE_ROUTE, Routes, TABLE_SLOT,
};
pub use types::{ErrorIndex, Event};

// Re-exported so callers don't need to depend on these crates directly
pub use secrecy::SecretString;
pub use tokio_util::sync::CancellationToken;
