//! External IP discovery over HTTP.
//!
//! Origin-mode nodes ask a public lookup service for their own address on
//! every discovery request. The service is modeled as a trait so tests
//! can substitute a stub.

use crate::error::ResolveError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Default lookup endpoint; returns the caller's IP as plain text.
const IPIFY_URL: &str = "https://api.ipify.org";

/// Per-request deadline for the lookup call.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Collaborator reporting this node's externally visible IP address.
#[async_trait]
pub trait ExternalIp: Send + Sync {
    /// Look up the node's current public IP.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] when the service cannot be reached
    /// or answers with something that is not an IP address.
    async fn lookup(&self) -> Result<IpAddr, ResolveError>;
}

/// ipify-backed [`ExternalIp`] implementation.
pub struct Ipify {
    client: reqwest::Client,
    url: String,
}

impl Ipify {
    /// Create a client against the public ipify endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_url(IPIFY_URL)
    }

    /// Create a client against a custom lookup endpoint (mirrors, tests).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] if the HTTP client cannot be built.
    pub fn with_url(url: impl Into<String>) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ExternalIp for Ipify {
    async fn lookup(&self) -> Result<IpAddr, ResolveError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_ip(&body)
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        Self::Lookup(err.to_string())
    }
}

/// Parse a lookup service response body into an address.
fn parse_ip(body: &str) -> Result<IpAddr, ResolveError> {
    body.trim()
        .parse()
        .map_err(|_| ResolveError::Lookup(format!("unparsable lookup response: {body:?}")))
}
