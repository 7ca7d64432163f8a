use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// The default endpoint error notifications are delivered to.
pub const DEFAULT_NOTIFY_ENDPOINT: &str = "https://notify.faultline.dev";
/// The default endpoint session payloads are delivered to.
pub const DEFAULT_SESSIONS_ENDPOINT: &str = "https://sessions.faultline.dev";

/// Raised if an endpoint cannot be parsed from a string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEndpointError {
    /// Raised if the value is not a valid URL.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Raised if the URL scheme is not http or https.
    #[error("unsupported endpoint scheme `{0}`")]
    UnsupportedScheme(String),
}

/// Raised if a proxy cannot be parsed from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid proxy url: {0}")]
pub struct ParseProxyError(#[from] url::ParseError);

fn parse_endpoint(value: &str) -> Result<Url, ParseEndpointError> {
    let url = Url::parse(value)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ParseEndpointError::UnsupportedScheme(other.to_owned())),
    }
}

/// The pair of URLs that events and sessions are delivered to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    notify: Url,
    sessions: Url,
}

impl Endpoints {
    /// Creates a new endpoint pair, validating both URLs.
    ///
    /// # Examples
    ///
    /// ```
    /// let endpoints = faultline_types::Endpoints::new(
    ///     "https://notify.example.com",
    ///     "https://sessions.example.com",
    /// )
    /// .unwrap();
    /// assert_eq!(endpoints.notify().host_str(), Some("notify.example.com"));
    /// ```
    pub fn new(notify: &str, sessions: &str) -> Result<Endpoints, ParseEndpointError> {
        Ok(Endpoints {
            notify: parse_endpoint(notify)?,
            sessions: parse_endpoint(sessions)?,
        })
    }

    /// The URL error notifications are delivered to.
    pub fn notify(&self) -> &Url {
        &self.notify
    }

    /// The URL session payloads are delivered to.
    pub fn sessions(&self) -> &Url {
        &self.sessions
    }
}

impl Default for Endpoints {
    fn default() -> Endpoints {
        Endpoints {
            notify: Url::parse(DEFAULT_NOTIFY_ENDPOINT).unwrap(),
            sessions: Url::parse(DEFAULT_SESSIONS_ENDPOINT).unwrap(),
        }
    }
}

/// An HTTP(S) proxy that delivery requests should be routed through.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    url: Url,
}

impl Proxy {
    /// The full proxy URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `host:port` pair of the proxy.
    pub fn address(&self) -> String {
        match (self.url.host_str(), self.url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_owned(),
            _ => String::new(),
        }
    }
}

impl FromStr for Proxy {
    type Err = ParseProxyError;

    fn from_str(s: &str) -> Result<Proxy, ParseProxyError> {
        Ok(Proxy { url: Url::parse(s)? })
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
