//! Connection descriptors
//!
//! A descriptor is a parsed `postgres://` URL. Parsing is the only place a
//! descriptor can fail: everything downstream (resolution, connecting) works
//! with an already validated value.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;
use url::Url;

/// Port used when the URL does not name one.
pub const DEFAULT_PORT: u16 = 5432;

const REDACTED: &str = "****";

/// Malformed connection descriptor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme '{0}' (expected postgres or postgresql)")]
    UnsupportedScheme(String),

    #[error("connection URL has no host")]
    MissingHost,
}

/// Discrete connection fields, as found in `DB_HOST`-style configuration.
#[derive(Debug, Clone, Default)]
pub struct DescriptorParts {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// A validated database connection target.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    url: Url,
}

impl ConnectionDescriptor {
    /// Parse a connection URL.
    ///
    /// ```
    /// use quill_core::ConnectionDescriptor;
    ///
    /// let d = ConnectionDescriptor::parse("postgres://app:pw@db.internal:6543/blog").unwrap();
    /// assert_eq!(d.host(), "db.internal");
    /// assert_eq!(d.port(), 6543);
    /// assert_eq!(d.database(), Some("blog"));
    /// assert!(ConnectionDescriptor::parse("mysql://db/blog").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, DescriptorError> {
        let url = Url::parse(input.trim()).map_err(|e| DescriptorError::InvalidUrl(e.to_string()))?;
        Self::from_url(url)
    }

    /// Build a descriptor from discrete fields.
    pub fn from_parts(parts: DescriptorParts) -> Result<Self, DescriptorError> {
        let host = parts.host.trim();
        if host.is_empty() {
            return Err(DescriptorError::MissingHost);
        }

        let authority = match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
            _ => host.to_owned(),
        };

        let mut url = Url::parse(&format!("postgres://{authority}"))
            .map_err(|e| DescriptorError::InvalidUrl(e.to_string()))?;

        let invalid = |what: &str| DescriptorError::InvalidUrl(format!("cannot set {what}"));

        url.set_port(Some(parts.port.unwrap_or(DEFAULT_PORT)))
            .map_err(|_| invalid("port"))?;
        if let Some(user) = parts.user.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user).map_err(|_| invalid("user"))?;
        }
        if let Some(password) = parts.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| invalid("password"))?;
        }
        if let Some(database) = parts.database.as_deref().filter(|d| !d.is_empty()) {
            url.set_path(&format!("/{database}"));
        }

        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self, DescriptorError> {
        match url.scheme() {
            "postgres" | "postgresql" => {}
            other => return Err(DescriptorError::UnsupportedScheme(other.to_owned())),
        }

        match url.host_str() {
            Some(h) if !h.is_empty() => Ok(Self { url }),
            _ => Err(DescriptorError::MissingHost),
        }
    }

    /// Host component as written (IPv6 literals without brackets).
    pub fn host(&self) -> &str {
        let host = self.url.host_str().unwrap_or_default();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    pub fn port(&self) -> u16 {
        self.url.port().unwrap_or(DEFAULT_PORT)
    }

    pub fn database(&self) -> Option<&str> {
        let path = self.url.path().trim_start_matches('/');
        (!path.is_empty()).then_some(path)
    }

    pub fn username(&self) -> &str {
        self.url.username()
    }

    /// Whether the host is already an IP literal (no lookup needed).
    pub fn host_is_ip(&self) -> bool {
        self.host().parse::<IpAddr>().is_ok()
    }

    /// A copy of this descriptor pointing at `ip` instead of the hostname.
    ///
    /// Port, credentials, database and query parameters are preserved.
    pub fn with_host(&self, ip: IpAddr) -> Self {
        let mut url = self.url.clone();
        // Only fails for cannot-be-a-base URLs, which parsing already excluded.
        if url.set_ip_host(ip).is_err() {
            return self.clone();
        }
        Self { url }
    }

    /// Full URL including credentials. Never log this.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// URL with the password masked, safe for logs.
    pub fn redacted(&self) -> String {
        if self.url.password().is_none() {
            return self.url.to_string();
        }
        let mut url = self.url.clone();
        let _ = url.set_password(Some(REDACTED));
        url.to_string()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}

impl std::str::FromStr for ConnectionDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
