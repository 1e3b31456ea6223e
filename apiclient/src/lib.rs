// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client for the server REST API

use std::{sync::Arc, time::Duration};

use ledgercommon::messages::ErrorResponse;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub mod auth_api;
pub mod ledger_api;

pub use reqwest::StatusCode;

/// The port used for localhost connections.
///
/// Also see server's listen configuration.
const LOCALHOST_PORT: u16 = 8080;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when creating an API client.
#[derive(Error, Debug)]
pub enum ApiClientInitError {
    #[error("Failed to parse URL {0}")]
    UrlParsingError(String),
    #[error("Invalid URL {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors of a single API request.
#[derive(Error, Debug)]
pub enum ApiRequestError {
    /// The server could not be reached or the connection broke.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The server answered with an error status.
    #[error("{message} ({status})")]
    Status { status: StatusCode, message: String },
    /// The server answered with a body we don't understand.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiRequestError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Whether repeating the same request later might succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Decode(_) | Self::Url(_) => false,
        }
    }

    fn from_send(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error)
        } else {
            Self::Network(error)
        }
    }
}

/// ApiClient is a thin wrapper around a [`reqwest::Client`].
///
/// It exposes a single function for each API endpoint. The session token
/// returned by the login endpoint is kept and sent with every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

#[derive(Debug)]
struct ApiClientInner {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn with_endpoint(url: &Url) -> Result<Self, ApiClientInitError> {
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ApiClientInitError::InvalidUrl(url.to_string()));
        }
        info!(%url, "Creating REST API client");
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: url.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Creates a client for the server on `domain`.
    ///
    /// `localhost` is reached over plain HTTP on the default port.
    pub fn with_domain(domain: &str) -> Result<Self, ApiClientInitError> {
        let domain_str = if domain == "localhost" {
            format!("http://localhost:{LOCALHOST_PORT}")
        } else {
            format!("https://{domain}")
        };
        let url: Url = domain_str
            .parse()
            .map_err(|_| ApiClientInitError::UrlParsingError(domain_str))?;
        Self::with_endpoint(&url)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    /// Replaces the session token, e.g. with one restored from disk.
    pub fn set_token(&self, token: Option<String>) {
        *self.inner.token.write() = token;
    }

    pub fn has_session(&self) -> bool {
        self.inner.token.read().is_some()
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiRequestError> {
        Ok(self.inner.base_url.join(path)?)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ApiRequestError> {
        let url = self.url(path)?;
        debug!(%method, %url, "Sending request");
        let request = self.inner.client.request(method, url);
        Ok(match self.inner.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Sends the request and decodes the JSON body of a successful answer.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiRequestError> {
        let response = send(request).await?;
        response.json().await.map_err(ApiRequestError::Decode)
    }

    /// Sends the request and ignores the body of a successful answer.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiRequestError> {
        send(request).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiRequestError> {
    let response = request.send().await.map_err(ApiRequestError::from_send)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_owned(),
    };
    debug!(%status, %message, "Request failed");
    Err(ApiRequestError::Status { status, message })
}
