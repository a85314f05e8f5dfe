//! The fixed upstream the proxy forwards to.
//!
//! # Responsibilities
//! - Parse and validate the configured base URL once at startup
//! - Pre-compute the authority and `Host` header value
//! - Join the upstream path prefix with an inbound path

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Uri};
use url::Url;

/// Error type for upstream URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid upstream URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported upstream scheme {0:?} (only http is supported)")]
    UnsupportedScheme(String),

    #[error("upstream URL has no host")]
    MissingHost,

    #[error("upstream URL must not carry a query string or fragment")]
    QueryOrFragment,

    #[error("upstream URL must not carry credentials")]
    Credentials,

    #[error("invalid upstream authority {0:?}")]
    Authority(String),
}

/// A single, immutable upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    /// The URL as configured, kept for logging.
    url: Url,
    authority: Authority,
    host_header: HeaderValue,
    /// Path prefix with any trailing `/` removed; empty when the URL has no path.
    path_prefix: String,
}

impl UpstreamTarget {
    /// Parse and validate an upstream base URL.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw)?;

        if url.scheme() != "http" {
            return Err(TargetError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(TargetError::QueryOrFragment);
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(TargetError::Credentials);
        }

        let host = url.host_str().ok_or(TargetError::MissingHost)?;
        // Url::port() is None for the scheme's default port, which is also
        // what a client would put in Host.
        let authority_str = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority: Authority = authority_str
            .parse()
            .map_err(|_| TargetError::Authority(authority_str.clone()))?;
        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|_| TargetError::Authority(authority_str.clone()))?;

        let path_prefix = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            url,
            authority,
            host_header,
            path_prefix,
        })
    }

    /// The configured URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `host[:port]` of the upstream.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Value for the outbound `Host` header.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// Upstream path prefix, without trailing slash.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Outbound path for an inbound path: the upstream prefix followed by `path`.
    pub fn join_path(&self, path: &str) -> String {
        let mut joined = String::with_capacity(self.path_prefix.len() + path.len() + 1);
        joined.push_str(&self.path_prefix);
        if !path.is_empty() && !path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
        if joined.is_empty() {
            joined.push('/');
        }
        joined
    }

    /// Absolute outbound URI for an inbound path and raw query string.
    pub fn uri_for(&self, path: &str, query: Option<&str>) -> Result<Uri, axum::http::Error> {
        let mut path_and_query = self.join_path(path);
        if let Some(query) = query {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        let path_and_query: PathAndQuery = path_and_query.parse()?;

        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?;
        Ok(uri)
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
