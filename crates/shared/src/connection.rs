//! Database connection-string normalization.
//!
//! Hosting providers hand out Postgres credentials either as a
//! `postgres://` URL or as a semicolon separated `Key=Value` list.
//! Both shapes are parsed into [`ConnectionSettings`] and rendered back
//! as a canonical URL that SeaORM accepts.

use std::iter::Peekable;
use std::str::Chars;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use url::{Host, Url};

/// Default Postgres port.
pub const DEFAULT_PORT: u16 = 5432;

/// Characters left untouched inside the userinfo part of a URL.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Errors raised while parsing a connection string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionStringError {
    /// The string was empty or whitespace.
    #[error("connection string is empty")]
    Empty,

    /// The URL scheme is not `postgres` or `postgresql`.
    #[error("unsupported connection scheme: {0}")]
    UnsupportedScheme(String),

    /// A required component is missing.
    #[error("connection string is missing the {0}")]
    Missing(&'static str),

    /// The port is not a valid number.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// A `Key=Value` segment could not be understood.
    #[error("malformed segment: {0}")]
    MalformedSegment(String),

    /// The URL form could not be parsed.
    #[error("invalid connection url: {0}")]
    InvalidUrl(String),
}

/// Normalized Postgres connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login role, if any.
    pub username: Option<String>,
    /// Password, if any.
    pub password: Option<String>,
    /// Database name.
    pub database: String,
    /// Requested SSL mode (`require`, `disable`, ...).
    pub ssl_mode: Option<String>,
}

impl ConnectionSettings {
    /// Parses either a `postgres://` URL or a `Key=Value;` list.
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        if looks_like_url(raw) {
            Self::parse_url(raw)
        } else {
            Self::parse_key_value(raw)
        }
    }

    fn parse_url(raw: &str) -> Result<Self, ConnectionStringError> {
        let url = Url::parse(raw).map_err(|e| ConnectionStringError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(ConnectionStringError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => decode(domain),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => String::new(),
        };
        let username = non_empty(decode(url.username()));
        let password = url.password().map(decode);
        let database = non_empty(decode(url.path().trim_start_matches('/')));
        let ssl_mode = url
            .query_pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case("sslmode"))
            .map(|(_, value)| value.into_owned());

        Self::finish(host, url.port(), username, password, database, ssl_mode)
    }

    fn parse_key_value(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut host = None;
        let mut port = None;
        let mut username = None;
        let mut password = None;
        let mut database = None;
        let mut ssl_mode = None;

        for (key, value) in key_value_pairs(raw)? {
            match key.to_ascii_lowercase().as_str() {
                "host" | "server" => host = non_empty(value),
                "port" => port = Some(parse_port(&value)?),
                "username" | "user id" | "userid" | "user" => username = non_empty(value),
                "password" | "pwd" => password = Some(value),
                "database" | "db" | "initial catalog" => database = non_empty(value),
                "ssl mode" | "sslmode" => ssl_mode = non_empty(value.to_ascii_lowercase()),
                // Pooling and timeout knobs are configured elsewhere.
                _ => {}
            }
        }

        Self::finish(
            host.unwrap_or_default(),
            port,
            username,
            password,
            database,
            ssl_mode,
        )
    }

    fn finish(
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<String>,
    ) -> Result<Self, ConnectionStringError> {
        if host.is_empty() {
            return Err(ConnectionStringError::Missing("host"));
        }
        let database = database.ok_or(ConnectionStringError::Missing("database"))?;

        Ok(Self {
            host,
            port: port.unwrap_or(DEFAULT_PORT),
            username,
            password,
            database,
            ssl_mode,
        })
    }

    /// Renders the settings as a `postgres://` URL.
    #[must_use]
    pub fn to_url(&self) -> String {
        let mut url = String::from("postgres://");

        if let Some(username) = &self.username {
            url.push_str(&utf8_percent_encode(username, USERINFO).to_string());
            if let Some(password) = &self.password {
                url.push(':');
                url.push_str(&utf8_percent_encode(password, USERINFO).to_string());
            }
            url.push('@');
        }

        if self.host.contains(':') {
            url.push_str(&format!("[{}]", self.host));
        } else {
            url.push_str(&self.host);
        }
        url.push_str(&format!(":{}/", self.port));
        url.push_str(&utf8_percent_encode(&self.database, USERINFO).to_string());

        if let Some(ssl_mode) = &self.ssl_mode {
            url.push_str("?sslmode=");
            url.push_str(&utf8_percent_encode(ssl_mode, USERINFO).to_string());
        }

        url
    }
}

/// A URL starts with a scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`)
/// followed by `://`. Anything else is treated as a `Key=Value` list, so a
/// password containing `://` does not flip the format.
fn looks_like_url(raw: &str) -> bool {
    raw.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Splits `Key=Value;...` into trimmed pairs.
///
/// Values may be wrapped in single or double quotes to carry `;` or
/// leading spaces; a doubled quote inside stands for one literal quote.
fn key_value_pairs(raw: &str) -> Result<Vec<(String, String)>, ConnectionStringError> {
    let mut pairs = Vec::new();
    let mut chars = raw.chars().peekable();

    while chars.peek().is_some() {
        let segment = take_until(&mut chars, |c| c == '=' || c == ';');
        let key = segment.trim();

        if chars.next_if_eq(&'=').is_none() {
            chars.next_if_eq(&';');
            if key.is_empty() {
                continue;
            }
            return Err(ConnectionStringError::MalformedSegment(key.to_string()));
        }

        skip_whitespace(&mut chars);
        let value = match chars.next_if(|&c| c == '"' || c == '\'') {
            Some(quote) => {
                let value = quoted_value(&mut chars, quote)
                    .ok_or_else(|| ConnectionStringError::MalformedSegment(key.to_string()))?;
                skip_whitespace(&mut chars);
                if chars.peek().is_some_and(|&c| c != ';') {
                    return Err(ConnectionStringError::MalformedSegment(key.to_string()));
                }
                value
            }
            None => take_until(&mut chars, |c| c == ';').trim().to_string(),
        };
        chars.next_if_eq(&';');

        pairs.push((key.to_string(), value));
    }

    Ok(pairs)
}

/// Reads up to the closing `quote`. `None` when the quote is never closed.
fn quoted_value(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut value = String::new();
    loop {
        let c = chars.next()?;
        if c != quote {
            value.push(c);
        } else if chars.next_if_eq(&quote).is_some() {
            value.push(quote);
        } else {
            return Some(value);
        }
    }
}

fn take_until(chars: &mut Peekable<Chars<'_>>, stop: impl Fn(char) -> bool) -> String {
    let mut taken = String::new();
    while let Some(c) = chars.next_if(|&c| !stop(c)) {
        taken.push(c);
    }
    taken
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn parse_port(value: &str) -> Result<u16, ConnectionStringError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConnectionStringError::InvalidPort(value.to_string()))
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
