//! Connection endpoints and per-attempt endpoint factories.
//!
//! Auth tokens can expire between attempts, so the channel asks an
//! [`EndpointFactory`] for a fresh [`ConnectionEndpoint`] before every
//! connection attempt instead of holding one URL forever.
//!
//! # Example
//!
//! ```ignore
//! use notify_channel::{ConnectionEndpoint, FnEndpoint};
//!
//! let fixed = ConnectionEndpoint::for_user("ws://127.0.0.1:8000", 7, "token")?;
//!
//! let refreshing = FnEndpoint::new(|_attempt| {
//!     ConnectionEndpoint::for_user("ws://127.0.0.1:8000", 7, load_token())
//! });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Query parameter carrying the auth token.
const TOKEN_PARAM: &str = "token";

/// Path segment preceding the user identifier.
const USER_ROUTE: &str = "ws";

// ============================================================================
// ConnectionEndpoint
// ============================================================================

/// Where to connect for one attempt.
///
/// Immutable for the lifetime of a connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionEndpoint {
    /// WebSocket URL without the auth token.
    url: Url,
    /// Auth token sent as query parameter.
    auth_token: Option<String>,
}

impl ConnectionEndpoint {
    /// Creates an endpoint from a `ws://` or `wss://` URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::InvalidEndpoint`] if the scheme is not `ws` or `wss`
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Self::validate(&url)?;

        Ok(Self {
            url,
            auth_token: None,
        })
    }

    /// Creates the per-user endpoint `<base>/ws/<user_id>?token=<token>`.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionEndpoint::new`].
    pub fn for_user(
        base: &str,
        user_id: impl fmt::Display,
        token: impl Into<String>,
    ) -> Result<Self> {
        let mut url = Url::parse(base)?;
        Self::validate(&url)?;

        let user_id = user_id.to_string();
        url.path_segments_mut()
            .map_err(|()| Error::invalid_endpoint(base, "URL cannot have a path"))?
            .pop_if_empty()
            .push(USER_ROUTE)
            .push(&user_id);

        Ok(Self {
            url,
            auth_token: None,
        }
        .with_token(token))
    }

    /// Sets the auth token.
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Returns the URL without the token.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the auth token, if any.
    #[inline]
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Returns the URL to connect to, with the token as query parameter.
    #[must_use]
    pub fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
        }
        url
    }

    /// Checks the scheme and host.
    fn validate(url: &Url) -> Result<()> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::invalid_endpoint(
                    url.as_str(),
                    format!("unsupported scheme '{other}', expected ws or wss"),
                ));
            }
        }

        if url.host_str().is_none() {
            return Err(Error::invalid_endpoint(url.as_str(), "missing host"));
        }

        Ok(())
    }
}

impl fmt::Debug for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEndpoint")
            .field("url", &self.url.as_str())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ============================================================================
// EndpointFactory
// ============================================================================

/// Produces the endpoint for each connection attempt.
///
/// `attempt` is the number of consecutive failed attempts so far (0 for the
/// first attempt after start or after a stable connection).
///
/// An error is treated like a failed connection attempt and is retried
/// according to the reconnect policy.
#[async_trait]
pub trait EndpointFactory: Send + Sync + 'static {
    /// Returns the endpoint to use for the next attempt.
    async fn endpoint(&self, attempt: u32) -> Result<ConnectionEndpoint>;
}

#[async_trait]
impl EndpointFactory for ConnectionEndpoint {
    async fn endpoint(&self, _attempt: u32) -> Result<ConnectionEndpoint> {
        Ok(self.clone())
    }
}

/// Adapts a synchronous closure into an [`EndpointFactory`].
pub struct FnEndpoint<F> {
    f: F,
}

impl<F> FnEndpoint<F>
where
    F: Fn(u32) -> Result<ConnectionEndpoint> + Send + Sync + 'static,
{
    /// Wraps `f`, which is called with the attempt number.
    #[inline]
    #[must_use]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> EndpointFactory for FnEndpoint<F>
where
    F: Fn(u32) -> Result<ConnectionEndpoint> + Send + Sync + 'static,
{
    async fn endpoint(&self, attempt: u32) -> Result<ConnectionEndpoint> {
        (self.f)(attempt)
    }
}

// ============================================================================
// Tests
// ============================================================================
