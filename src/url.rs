//! Endpoint URLs: `scheme://host:port` for TCP/HTTP transports, or
//! `unix://path` for Unix domain sockets.
//!
//! A bare `host:port` (no `scheme://` prefix) is accepted and defaults to
//! the `tcp` scheme, so `Url::parse("*:9000")` and `Url::parse("tcp://*:9000")`
//! are equivalent.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Default scheme assumed when a URL omits one: `"tcp"`.
pub const DEFAULT_SCHEME: &str = "tcp";
/// Default bind/connect host: `"127.0.0.1"`.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port, chosen arbitrarily and shared with the original protocol.
pub const DEFAULT_PORT: u16 = 12321;

/// The resolved connection target: either a `(host, port)` pair or a
/// filesystem path to a Unix domain socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp(String, u16),
    Unix(String),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp(host, port) => write!(f, "{host}:{port}"),
            Address::Unix(path) => write!(f, "{path}"),
        }
    }
}

/// A parsed endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    address: Address,
}

impl Url {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The host:port or path portion, as it appears after `scheme://`.
    pub fn netloc(&self) -> String {
        self.address.to_string()
    }

    pub fn is_unix(&self) -> bool {
        matches!(self.address, Address::Unix(_))
    }

    pub fn parse(input: &str) -> Result<Url, Error> {
        let full;
        let raw = if input.contains("://") {
            input
        } else {
            full = format!("{DEFAULT_SCHEME}://{input}");
            full.as_str()
        };

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| Error::Parameter(format!("invalid URL: {input}")))?;

        if scheme == "unix" {
            parse_unix(scheme, rest)
        } else {
            parse_inet(scheme, rest, input)
        }
    }
}

fn parse_unix(scheme: &str, rest: &str) -> Result<Url, Error> {
    let (host_part, path_part) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let host = if host_part.is_empty() { None } else { Some(host_part.to_string()) };
    let base = host.clone().unwrap_or_else(|| "/".to_string());
    let trimmed = path_part.trim_start_matches('/');

    let mut joined = if trimmed.is_empty() {
        base
    } else if base.ends_with('/') {
        format!("{base}{trimmed}")
    } else {
        format!("{base}/{trimmed}")
    };
    while joined.len() > 1 && joined.ends_with('/') {
        joined.pop();
    }

    Ok(Url {
        scheme: scheme.to_string(),
        host,
        port: None,
        path: Some(joined.clone()),
        address: Address::Unix(joined),
    })
}

fn parse_inet(scheme: &str, rest: &str, original: &str) -> Result<Url, Error> {
    if rest.contains('/') {
        return Err(Error::Parameter(format!("invalid URL: {original}")));
    }

    let (host_str, port_str) = match rest.rsplit_once(':') {
        Some((h, p)) => (h, Some(p)),
        None => (rest, None),
    };

    let port = match port_str {
        Some(p) if !p.is_empty() => p
            .parse::<u16>()
            .map_err(|_| Error::Parameter(format!("invalid port in URL: {original}")))?,
        _ => DEFAULT_PORT,
    };

    let host = if host_str.is_empty() { DEFAULT_HOST.to_string() } else { host_str.replace('*', "0.0.0.0") };

    Ok(Url {
        scheme: scheme.to_string(),
        host: Some(host.clone()),
        port: Some(port),
        path: None,
        address: Address::Tcp(host, port),
    })
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Url, Error> {
        Url::parse(s)
    }
}

impl TryFrom<&str> for Url {
    type Error = Error;

    fn try_from(value: &str) -> Result<Url, Error> {
        Url::parse(value)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.netloc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_defaults_to_tcp() {
        let url = Url::parse("localhost:9000").unwrap();
        assert_eq!(url.scheme(), "tcp");
        assert_eq!(url.address(), &Address::Tcp("localhost".into(), 9000));
    }

    #[test]
    fn wildcard_host_becomes_any_addr() {
        let url = Url::parse("*:9000").unwrap();
        assert_eq!(url.address(), &Address::Tcp("0.0.0.0".into(), 9000));
    }

    #[test]
    fn missing_host_and_port_use_defaults() {
        let url = Url::parse("tcp://").unwrap();
        assert_eq!(url.address(), &Address::Tcp(DEFAULT_HOST.into(), DEFAULT_PORT));
    }

    #[test]
    fn inet_url_rejects_a_path() {
        assert!(Url::parse("tcp://localhost:9000/foo").is_err());
    }

    #[test]
    fn unix_url_with_absolute_path() {
        let url = Url::parse("unix:///tmp/example.sock").unwrap();
        assert_eq!(url.address(), &Address::Unix("/tmp/example.sock".into()));
    }

    #[test]
    fn unix_url_with_relative_path_joins_host_and_path() {
        let url = Url::parse("unix://var/run/example.sock").unwrap();
        assert_eq!(url.address(), &Address::Unix("var/run/example.sock".into()));
    }

    #[test]
    fn display_round_trips_netloc() {
        let url = Url::parse("tcp://127.0.0.1:1234").unwrap();
        assert_eq!(url.to_string(), "tcp://127.0.0.1:1234");
    }
}
