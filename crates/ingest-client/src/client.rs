//! Ingest API client implementation.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::IngestError;
use crate::routes::Routes;
use crate::types::{BatchRequest, BatchResponse, ErrorIndex, ErrorResponse, Event};

// =============================================================================
// Client Builder
// =============================================================================

/// Builder for creating an [`IngestClient`].
#[derive(Default)]
pub struct IngestClientBuilder {
    base_url: Option<String>,
    write_token: Option<SecretString>,
    read_token: Option<SecretString>,
    routes: Option<Routes>,
    http_client: Option<reqwest::Client>,
    timeout: Option<Duration>,
}

impl IngestClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL that routes are appended to.
    ///
    /// The URL is not validated here; a malformed URL surfaces as
    /// [`IngestError::Network`] on the first request.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the token sent as `Authorization: Bearer <token>` on every request.
    pub fn write_token(mut self, token: impl Into<SecretString>) -> Self {
        self.write_token = Some(token.into());
        self
    }

    /// Sets the read token. No current operation sends it.
    pub fn read_token(mut self, token: impl Into<SecretString>) -> Self {
        self.read_token = Some(token.into());
        self
    }

    /// Overrides the route templates. Defaults to [`Routes::DEFAULT`].
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a new client will be created. Sharing one client between
    /// several [`IngestClient`]s shares its connection pool.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets a timeout for every request.
    ///
    /// Only applies when the builder creates the HTTP client itself. Without
    /// it, requests are bounded only by the caller's cancellation token.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Builds the [`IngestClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base URL or write token is not set
    /// - The HTTP client cannot be built
    pub fn build(self) -> Result<IngestClient, IngestError> {
        let base_url = self
            .base_url
            .ok_or(IngestError::MissingConfig("base_url"))?;
        let write_token = self
            .write_token
            .ok_or(IngestError::MissingConfig("write_token"))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(IngestError::Network)?
            }
        };

        Ok(IngestClient {
            http_client,
            base_url,
            write_token,
            read_token: self.read_token,
            routes: self.routes.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for submitting events to the ingestion API.
///
/// The client holds no mutable state. Clones share the same connection pool,
/// so cloning is the way to hand the client to spawned tasks. Every request
/// is authenticated with the write token.
#[derive(Clone)]
pub struct IngestClient {
    http_client: reqwest::Client,
    base_url: String,
    write_token: SecretString,
    read_token: Option<SecretString>,
    routes: Routes,
}

impl fmt::Debug for IngestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestClient")
            .field("base_url", &self.base_url)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// A fully read response.
struct RawResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl IngestClient {
    /// Creates a client with the given credentials.
    ///
    /// If `routes` is `None`, [`Routes::DEFAULT`] is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        write_token: impl Into<SecretString>,
        read_token: impl Into<SecretString>,
        routes: Option<Routes>,
    ) -> Result<Self, IngestError> {
        let mut builder = Self::builder()
            .base_url(base_url)
            .write_token(write_token)
            .read_token(read_token);
        if let Some(routes) = routes {
            builder = builder.routes(routes);
        }
        builder.build()
    }

    /// Creates a new builder for constructing an [`IngestClient`].
    pub fn builder() -> IngestClientBuilder {
        IngestClientBuilder::new()
    }

    /// Returns the base URL of the API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the route templates in use.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Returns the read token, if one was configured.
    pub fn read_token(&self) -> Option<&SecretString> {
        self.read_token.as_ref()
    }

    // -------------------------------------------------------------------------
    // Submission Endpoints
    // -------------------------------------------------------------------------

    /// Submits a batch of events.
    ///
    /// Returns the events that the server rejected, keyed by their position
    /// in `events`. An empty map means every event was accepted. The body
    /// is the source of truth here: a non-success status with a well-formed
    /// `errors` map is still returned as `Ok`.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Encoding`] if the batch cannot be serialized
    /// - [`IngestError::Network`] or [`IngestError::Cancelled`] if no response was read
    /// - [`IngestError::UnexpectedStatus`] for a non-success status without an `errors` map
    /// - [`IngestError::Decoding`] for a success status with an unparseable body
    /// - [`IngestError::ErrorIndexOutOfRange`] if the server names an index outside the batch;
    ///   the in-range failures are carried in the error
    pub async fn submit_batch<T: Serialize>(
        &self,
        events: &[Event<T>],
        cancel: &CancellationToken,
    ) -> Result<ErrorIndex, IngestError> {
        let route = self.routes.batch();
        tracing::debug!(route, events = events.len(), "Submitting event batch");

        let response = self
            .post_json(route, &BatchRequest { events }, cancel)
            .await?;

        batch_errors(&response, events.len())
    }

    /// Submits a single event.
    ///
    /// Success is determined by the status code alone; the body of a
    /// success response is ignored.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Server`] if the server rejected the event with an error message
    /// - [`IngestError::UnexpectedStatus`] for a non-success status with an unparseable body
    /// - [`IngestError::Encoding`], [`IngestError::Network`] and
    ///   [`IngestError::Cancelled`] as for [`IngestClient::submit_batch`]
    pub async fn submit_one<T: Serialize>(
        &self,
        event: &Event<T>,
        cancel: &CancellationToken,
    ) -> Result<(), IngestError> {
        let route = self.routes.single();
        tracing::debug!(route, table_name = event.table_name(), "Submitting event");

        let response = self.post_json(route, event, cancel).await?;
        check_status(&response)
    }

    /// Submits an arbitrary payload to `table_name`.
    ///
    /// The table name is substituted into the table route verbatim, so it
    /// must already be safe to use as a path segment.
    ///
    /// # Errors
    ///
    /// Same as [`IngestClient::submit_one`].
    pub async fn submit_to_table<T: Serialize + ?Sized>(
        &self,
        table_name: &str,
        payload: &T,
        cancel: &CancellationToken,
    ) -> Result<(), IngestError> {
        let route = self.routes.table(table_name);
        tracing::debug!(route = %route, table_name, "Submitting payload to table");

        let response = self.post_json(&route, payload, cancel).await?;
        check_status(&response)
    }

    // -------------------------------------------------------------------------
    // Helper Methods
    // -------------------------------------------------------------------------

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url.trim_end_matches('/'))
    }

    /// Serializes `body`, posts it to `route` and reads the whole response.
    ///
    /// The request future is dropped as soon as `cancel` fires.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, IngestError> {
        let body = serde_json::to_vec(body).map_err(IngestError::Encoding)?;

        let request = self
            .http_client
            .post(self.url(route))
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(self.write_token.expose_secret())
            .body(body);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, IngestError>(RawResponse {
                status,
                body: body.to_vec(),
            })
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(route, "Request cancelled by caller");
                Err(IngestError::Cancelled)
            }
            result = exchange => result,
        }
    }
}

fn decode_body<T: DeserializeOwned>(
    body: &[u8],
) -> Result<T, serde_path_to_error::Error<serde_json::Error>> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(&mut deserializer)
}

/// Maps a batch response to the per-event error map.
///
/// A well-formed body wins over the status, except that a failure status
/// must come with an explicit `errors` map: a body without one (such as
/// `{"error": "..."}`) is an [`IngestError::UnexpectedStatus`].
fn batch_errors(response: &RawResponse, batch_len: usize) -> Result<ErrorIndex, IngestError> {
    let status = response.status;
    let mut errors = match decode_body::<BatchResponse>(&response.body) {
        Ok(BatchResponse {
            errors: Some(errors),
        }) => errors,
        Ok(BatchResponse { errors: None }) if status.is_success() => ErrorIndex::new(),
        Err(e) if status.is_success() => return Err(IngestError::Decoding(e)),
        Ok(_) | Err(_) => {
            return Err(IngestError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
    };

    let out_of_range = errors.split_off(&batch_len);
    if let Some((&index, _)) = out_of_range.first_key_value() {
        return Err(IngestError::ErrorIndexOutOfRange {
            index,
            batch_len,
            errors,
        });
    }

    if status.is_success() {
        if !errors.is_empty() {
            tracing::debug!(
                failed = errors.len(),
                events = batch_len,
                "Some events in the batch were rejected"
            );
        }
    } else {
        tracing::warn!(
            status = status.as_u16(),
            failed = errors.len(),
            events = batch_len,
            "Batch submission returned an error status with per-event errors"
        );
    }

    Ok(errors)
}

/// Maps a single-item response to a result: any success status is `Ok`, and
/// a failure body of the form `{"error": "..."}` becomes [`IngestError::Server`].
fn check_status(response: &RawResponse) -> Result<(), IngestError> {
    if response.status.is_success() {
        return Ok(());
    }

    let status = response.status.as_u16();
    match serde_json::from_slice::<ErrorResponse>(&response.body) {
        Ok(ErrorResponse { error }) => {
            tracing::warn!(status, error = %error, "Server rejected submission");
            Err(IngestError::Server {
                status,
                message: error,
            })
        }
        Err(_) => Err(IngestError::UnexpectedStatus { status }),
    }
}
