//! Request cookie parsing.
//!
//! Only the request side (`Cookie` header) is handled; `Set-Cookie` belongs
//! to response handling, which this crate does not do.

use std::fmt;

use crate::http::error::CookieError;

pub const COOKIE: &str = "cookie";

/// A `name=value` pair carried by a `Cookie` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Every well-formed cookie across `headers`; malformed pairs are skipped.
pub fn parse_all<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<Cookie> {
    headers
        .into_iter()
        .flat_map(pairs)
        .filter_map(|pair| parse_pair(pair).ok())
        .collect()
}

/// First well-formed cookie called `name` across `headers`.
///
/// Malformed pairs with that name are passed over; `Malformed` is returned
/// only when every pair named `name` is bad, so callers can tell a bad
/// header from a miss.
pub fn lookup<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    name: &str,
) -> Result<Cookie, CookieError> {
    let mut malformed = None;
    for pair in headers.into_iter().flat_map(pairs) {
        let pair_name = pair.split_once('=').map_or(pair, |(n, _)| n).trim();
        if pair_name != name {
            continue;
        }
        match parse_pair(pair) {
            Ok(cookie) => return Ok(cookie),
            Err(err) => {
                malformed.get_or_insert(err);
            }
        }
    }
    Err(malformed.unwrap_or(CookieError::NotFound))
}

/// Append `cookie` to an existing `Cookie` header value.
///
/// The name must be a token. Value bytes outside the cookie-octet set are
/// dropped, so a value can never introduce another pair.
pub fn append(existing: Option<&str>, cookie: &Cookie) -> Result<String, CookieError> {
    if cookie.name.is_empty() || !cookie.name.bytes().all(is_token_byte) {
        return Err(CookieError::InvalidName(cookie.name.clone()));
    }

    let value: String = cookie
        .value
        .chars()
        .filter(|c| c.is_ascii() && is_cookie_octet(*c as u8))
        .collect();
    if value.len() != cookie.value.len() {
        tracing::debug!(cookie = %cookie.name, "Dropped invalid bytes from cookie value");
    }

    let pair = format!("{}={}", cookie.name, value);
    Ok(match existing {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}; {pair}"),
        _ => pair,
    })
}

fn pairs(header: &str) -> impl Iterator<Item = &str> {
    header.split(';').map(str::trim).filter(|p| !p.is_empty())
}

fn parse_pair(pair: &str) -> Result<Cookie, CookieError> {
    let Some((name, value)) = pair.split_once('=') else {
        return Err(CookieError::Malformed(format!("missing '=' in {pair:?}")));
    };

    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(CookieError::Malformed(format!("invalid cookie name {name:?}")));
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if !value.bytes().all(is_cookie_octet) {
        return Err(CookieError::Malformed(format!("invalid value for cookie {name}")));
    }

    Ok(Cookie::new(name, value))
}

// RFC 6265 section 4.1.1
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic()
        && !matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\' | b'"' | b'/' | b'['
                | b']' | b'?' | b'=' | b'{' | b'}'
        )
}

fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}
