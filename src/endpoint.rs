//! Server endpoint URLs, parsed per [RFC 3986](https://www.rfc-editor.org/rfc/rfc3986)
//! as far as the registration interface needs them.

use std::fmt::Display;
use std::str::FromStr;

use crate::enums::TransportKind;
use crate::error::GoatM2mError;
use crate::utils::{is_pchar, is_query_char, percent_decode, percent_encode};

/// Longest scheme the parser accepts
pub const SCHEME_MAX: usize = 16;
/// Longest host, the inside of a bracketed IPv6 literal included
pub const HOST_MAX: usize = 63;
/// A port is at most this many digits
pub const PORT_MAX_DIGITS: usize = 5;

/// A parsed server endpoint. Built once by [Endpoint::parse] and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    /// Hostname, IPv4 literal, or the inside of a bracketed IPv6 literal
    pub host: String,
    /// Port exactly as it appeared in the URL, digits only
    pub port: Option<String>,
    /// Percent-decoded path segments, in order
    pub path_segments: Vec<String>,
    /// Percent-decoded query segments, in order
    pub query_segments: Vec<String>,
}

impl Endpoint {
    /// Parses `scheme://host[:port][/path][?query]`, greedily left to right.
    ///
    /// The host is either a `[...]` IPv6 literal or runs until `/`, `:` or
    /// the end of input. Path segments must be percent-encoded pchar, query
    /// segments additionally allow `/` and `?`. Anything left over after the
    /// grammar is done is an error.
    pub fn parse(input: &str) -> Result<Endpoint, GoatM2mError> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| GoatM2mError::UrlParse("missing scheme".to_string()))?;
        if scheme.is_empty() {
            return Err(GoatM2mError::UrlParse("missing scheme".to_string()));
        }
        if scheme.len() >= SCHEME_MAX {
            return Err(GoatM2mError::UrlParse(format!(
                "scheme too long: {scheme:?}"
            )));
        }

        let bytes = rest.as_bytes();
        let mut cursor: usize;

        let host = if bytes.first() == Some(&b'[') {
            let close = rest.find(']').ok_or_else(|| {
                GoatM2mError::UrlParse(format!("unclosed IPv6 literal in {rest:?}"))
            })?;
            let literal = &rest[1..close];
            if literal.is_empty() {
                return Err(GoatM2mError::UrlParse("empty host".to_string()));
            }
            if literal.len() > HOST_MAX {
                return Err(GoatM2mError::UrlParse(format!(
                    "host too long: {literal:?}"
                )));
            }
            cursor = close + 1;
            literal.to_string()
        } else {
            let end = bytes
                .iter()
                .position(|byte| matches!(byte, b'/' | b':'))
                .unwrap_or(bytes.len());
            let host = &rest[..end];
            if host.contains('@') {
                return Err(GoatM2mError::UrlParse(
                    "credentials in URLs are not supported".to_string(),
                ));
            }
            if host.is_empty() {
                return Err(GoatM2mError::UrlParse("empty host".to_string()));
            }
            if host.len() > HOST_MAX {
                return Err(GoatM2mError::UrlParse(format!("host too long: {host:?}")));
            }
            cursor = end;
            host.to_string()
        };

        let mut port = None;
        if bytes.get(cursor) == Some(&b':') {
            cursor += 1;
            let end = bytes[cursor..]
                .iter()
                .position(|byte| matches!(byte, b'/' | b'?'))
                .map(|offset| cursor + offset)
                .unwrap_or(bytes.len());
            let digits = &rest[cursor..end];
            if digits.is_empty() {
                return Err(GoatM2mError::UrlParse("empty port".to_string()));
            }
            if digits.len() > PORT_MAX_DIGITS {
                return Err(GoatM2mError::UrlParse(format!("port too long: {digits:?}")));
            }
            if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(GoatM2mError::UrlParse(format!(
                    "port is not numeric: {digits:?}"
                )));
            }
            port = Some(digits.to_string());
            cursor = end;
        }

        let mut path_segments = vec![];
        if bytes.get(cursor) == Some(&b'/') {
            cursor += 1;
            let end = bytes[cursor..]
                .iter()
                .position(|byte| *byte == b'?')
                .map(|offset| cursor + offset)
                .unwrap_or(bytes.len());
            let mut chunks: Vec<&str> = rest[cursor..end].split('/').collect();
            // a single trailing slash contributes no empty tail segment
            if chunks.last() == Some(&"") {
                chunks.pop();
            }
            for chunk in chunks {
                path_segments.push(percent_decode(chunk, is_pchar)?);
            }
            cursor = end;
        }

        let mut query_segments = vec![];
        if bytes.get(cursor) == Some(&b'?') {
            cursor += 1;
            for chunk in rest[cursor..].split('&') {
                query_segments.push(percent_decode(chunk, is_query_char)?);
            }
            cursor = bytes.len();
        }

        if cursor != bytes.len() {
            return Err(GoatM2mError::UrlParse(format!(
                "trailing characters: {:?}",
                &rest[cursor..]
            )));
        }

        Ok(Endpoint {
            scheme: scheme.to_string(),
            host,
            port,
            path_segments,
            query_segments,
        })
    }

    /// The port as a number, if the URL carried one
    pub fn port_u16(&self) -> Result<Option<u16>, GoatM2mError> {
        match &self.port {
            None => Ok(None),
            Some(digits) => digits.parse::<u16>().map(Some).map_err(|_| {
                GoatM2mError::InvalidValue(format!("port {digits:?} is out of range"))
            }),
        }
    }

    /// The transport the scheme implies, `None` for anything that isn't
    /// `coap` or `coaps`
    pub fn transport(&self) -> Option<TransportKind> {
        TransportKind::from_scheme(&self.scheme)
    }

    /// `host:port` for connecting a socket. IPv6 literals get re-bracketed
    /// and a missing port falls back to the scheme default.
    pub fn socket_target(&self, kind: TransportKind) -> Result<String, GoatM2mError> {
        let port = self.port_u16()?.unwrap_or_else(|| kind.default_port());
        match self.host.contains(':') {
            true => Ok(format!("[{}]:{port}", self.host)),
            false => Ok(format!("{}:{port}", self.host)),
        }
    }
}

impl FromStr for Endpoint {
    type Err = GoatM2mError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(input)
    }
}

/// Re-encodes the endpoint, escaping anything the path/query grammars don't
/// allow. Feeding the output back through [Endpoint::parse] yields the same
/// record.
impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://", self.scheme)?;
        match self.host.contains(':') {
            true => write!(f, "[{}]", self.host)?,
            false => f.write_str(&self.host)?,
        }
        if let Some(port) = &self.port {
            write!(f, ":{port}")?;
        }
        for segment in &self.path_segments {
            write!(f, "/{}", percent_encode(segment, is_pchar))?;
        }
        // an empty tail segment needs its own slash to survive a re-parse
        if self.path_segments.last().map(String::as_str) == Some("") {
            f.write_str("/")?;
        }
        for (index, segment) in self.query_segments.iter().enumerate() {
            let separator = match index {
                0 => '?',
                _ => '&',
            };
            write!(f, "{separator}{}", percent_encode(segment, is_query_char))?;
        }
        Ok(())
    }
}
