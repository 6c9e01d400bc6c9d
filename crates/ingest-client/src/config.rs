//! File-based configuration for [`IngestClient`].
//!
//! ```toml
//! base_url = "https://ingest.example.com"
//! write_token = "env::INGEST_WRITE_TOKEN"
//! read_token = "path::/run/secrets/ingest-read"
//! timeout_ms = 5000
//!
//! [routes]
//! table = "/v2/tables/%s"
//! ```

use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::client::IngestClient;
use crate::error::IngestError;
use crate::routes::{DEFAULT_BATCH_ROUTE, DEFAULT_SINGLE_ROUTE, DEFAULT_TABLE_ROUTE, Routes};

/// Where a bearer token is read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialLocation {
    /// Environment variable containing the token
    Env(String),
    /// File containing the token
    Path(String),
    #[default]
    None,
}

impl<'de> Deserialize<'de> for CredentialLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if let Some(inner) = s.strip_prefix("env::") {
            Ok(CredentialLocation::Env(inner.to_string()))
        } else if let Some(inner) = s.strip_prefix("path::") {
            Ok(CredentialLocation::Path(inner.to_string()))
        } else if s == "none" {
            Ok(CredentialLocation::None)
        } else {
            Err(serde::de::Error::custom(format!(
                "Invalid credential location `{s}`: expected `env::<VAR>`, `path::<FILE>` or `none`"
            )))
        }
    }
}

impl CredentialLocation {
    /// Reads the credential. Returns `None` for [`CredentialLocation::None`].
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if the variable is unset or the file
    /// cannot be read.
    pub fn resolve(&self) -> Result<Option<SecretString>, IngestError> {
        match self {
            CredentialLocation::Env(name) => std::env::var(name)
                .map(|value| Some(SecretString::from(value)))
                .map_err(|e| IngestError::Config {
                    message: format!("Failed to read credential from `{name}`: {e}"),
                }),
            CredentialLocation::Path(path) => std::fs::read_to_string(path)
                .map(|contents| {
                    Some(SecretString::from(
                        contents.trim_end_matches(['\r', '\n']).to_string(),
                    ))
                })
                .map_err(|e| IngestError::Config {
                    message: format!("Failed to read credential file `{path}`: {e}"),
                }),
            CredentialLocation::None => Ok(None),
        }
    }
}

/// Optional overrides for individual routes. Unset routes keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    pub batch: Option<String>,
    pub table: Option<String>,
    pub single: Option<String>,
}

impl RoutesConfig {
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidRoute`] if an override is invalid.
    pub fn to_routes(&self) -> Result<Routes, IngestError> {
        fn or_default(route: Option<&String>, default: &'static str) -> Cow<'static, str> {
            route.map_or(Cow::Borrowed(default), |r| Cow::Owned(r.clone()))
        }

        if self.batch.is_none() && self.table.is_none() && self.single.is_none() {
            return Ok(Routes::DEFAULT);
        }
        Routes::new(
            or_default(self.batch.as_ref(), DEFAULT_BATCH_ROUTE),
            or_default(self.table.as_ref(), DEFAULT_TABLE_ROUTE),
            or_default(self.single.as_ref(), DEFAULT_SINGLE_ROUTE),
        )
    }
}

/// Configuration for an [`IngestClient`], usually loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestClientConfig {
    pub base_url: String,
    pub write_token: CredentialLocation,
    #[serde(default)]
    pub read_token: CredentialLocation,
    /// Per-request timeout. Unset means no timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub routes: RoutesConfig,
}

impl IngestClientConfig {
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if `s` is not a valid configuration.
    pub fn from_toml_str(s: &str) -> Result<Self, IngestError> {
        toml::from_str(s).map_err(|e| IngestError::Config {
            message: format!("Failed to parse config: {e}"),
        })
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| IngestError::Config {
            message: format!("Failed to read config file `{}`: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolves credentials and builds a client.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential cannot be resolved, `write_token` is
    /// `none`, a route override is invalid, or the HTTP client cannot be built.
    pub fn into_client(self) -> Result<IngestClient, IngestError> {
        let write_token = self
            .write_token
            .resolve()?
            .ok_or_else(|| IngestError::Config {
                message: "`write_token` is required and cannot be `none`".to_string(),
            })?;
        let routes = self.routes.to_routes()?;

        let mut builder = IngestClient::builder()
            .base_url(self.base_url)
            .write_token(write_token)
            .routes(routes);
        if let Some(read_token) = self.read_token.resolve()? {
            builder = builder.read_token(read_token);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        builder.build()
    }
}
