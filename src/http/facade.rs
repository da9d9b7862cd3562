//! Request facade: a mutable view over an arriving request with live size accounting.
//!
//! # Data Flow
//! ```text
//! Request<Body> arrives
//!     → restore Host header from the URI authority if missing
//!     → HeaderView built from the header map
//!     → body wrapped in InstrumentedBody + tally hook
//!     → client IP resolved, metadata size computed
//!     → ArrivalSnapshot frozen
//! middleware reads / overrides method, host, path, query, headers, body
//! consumer reads the body through the facade (tally grows)
//!     → size() = metadata size + body bytes read
//!     → finish() releases the instrumented body
//! ```
//!
//! # Design Decisions
//! - Two halves: an immutable arrival snapshot used for accounting, and a
//!   current view used for routing and rewrites
//! - The metadata size is frozen at arrival; later overrides do not change it
//! - The tally hook rides on the decorator, so bytes of any installed body count
//! - `finish()` never drains the body and never touches the transport stream
//!   beyond dropping the facade's own handle on it

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderValue, HOST};
use axum::http::uri::{Authority, PathAndQuery};
use axum::http::{Extensions, Method, Request, Uri, Version};
use bytes::Bytes;
use http_body_util::BodyExt;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::http::body::{InstrumentedBody, ReadEvent};
use crate::http::client_ip::{peer_addr, ClientIpResolver};
use crate::http::cookie::{self, Cookie};
use crate::http::error::{ConstructionError, CookieError};
use crate::http::header::HeaderView;
use crate::net::ConnectionInfo;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Bytes kept verbatim in an escaped path; everything else is percent-encoded.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Wire name of an HTTP version, as it appears on the request line.
pub fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Read handle on a facade's size, usable after the facade is gone.
///
/// Cloning is cheap; every clone observes the same body tally.
#[derive(Debug, Clone)]
pub struct SizeMeter {
    metadata_size: u64,
    body_bytes: Arc<AtomicU64>,
}

impl SizeMeter {
    fn new(metadata_size: u64) -> Self {
        Self {
            metadata_size,
            body_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    fn record(&self, bytes: usize) {
        self.body_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Request-line plus header-block bytes, as arrived.
    pub fn metadata_size(&self) -> u64 {
        self.metadata_size
    }

    /// Body bytes read so far.
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes.load(Ordering::Relaxed)
    }

    /// Metadata size plus body bytes read so far.
    pub fn size(&self) -> u64 {
        self.metadata_size + self.body_bytes()
    }
}

/// The request as it arrived. Never changes after construction.
#[derive(Debug, Clone)]
pub struct ArrivalSnapshot {
    method: Method,
    uri: Uri,
    version: Version,
    host: String,
    request_target: String,
    metadata_size: u64,
    tls: bool,
    peer: Option<SocketAddr>,
}

impl ArrivalSnapshot {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path and query as sent on the request line.
    pub fn request_target(&self) -> &str {
        &self.request_target
    }

    pub fn metadata_size(&self) -> u64 {
        self.metadata_size
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

/// Fields middleware may override. Starts as a copy of the arrival.
#[derive(Debug, Clone)]
struct CurrentView {
    method: Method,
    host: String,
    /// Percent-encoded.
    path: String,
    query: Option<String>,
}

/// Mutable, metered view over one inbound request.
///
/// One facade per request, owned by one pipeline stage at a time.
#[derive(Debug)]
pub struct RequestFacade {
    arrival: ArrivalSnapshot,
    view: CurrentView,
    headers: HeaderView,
    extensions: Extensions,
    body: InstrumentedBody,
    meter: SizeMeter,
    client_ip: Option<IpAddr>,
}

impl RequestFacade {
    /// Wrap `request`, resolving the client IP with the default resolver.
    pub fn new(request: Request<Body>) -> Self {
        Self::with_resolver(request, &ClientIpResolver::default())
    }

    /// Wrap `request`, resolving the client IP with `resolver`.
    pub fn with_resolver(request: Request<Body>, resolver: &ClientIpResolver) -> Self {
        let (mut parts, body) = request.into_parts();

        // hyper carries the HTTP/2 :authority in the URI and sends no Host header.
        if !parts.headers.contains_key(HOST) {
            if let Some(authority) = parts.uri.authority() {
                if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                    parts.headers.insert(HOST, value);
                }
            }
        }

        let headers = HeaderView::from_map(std::mem::take(&mut parts.headers));
        let client_ip = resolver.resolve(&headers, &parts.extensions);

        let request_target = parts
            .uri
            .path_and_query()
            .map_or("/", PathAndQuery::as_str)
            .to_string();
        let proto = protocol_name(parts.version);
        let metadata_size = (parts.method.as_str().len()
            + 1
            + request_target.len()
            + 1
            + proto.len()
            + 2
            + headers.encoded_len()
            + 4) as u64;

        let meter = SizeMeter::new(metadata_size);
        let mut body = InstrumentedBody::new(body);
        let tally = meter.clone();
        body.on_after(move |event: ReadEvent| {
            tally.record(event.bytes_read());
            event.outcome
        });

        // An absolute-form target overrides any Host header (RFC 9112 3.2.2).
        let host = parts
            .uri
            .authority()
            .map(|a| a.to_string())
            .or_else(|| headers.get(HOST.as_str()).map(str::to_string))
            .unwrap_or_default();
        let tls = parts
            .extensions
            .get::<ConnectionInfo>()
            .is_some_and(|info| info.tls);

        let view = CurrentView {
            method: parts.method.clone(),
            host: host.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
        };

        tracing::trace!(
            method = %parts.method,
            target = %request_target,
            metadata_size,
            client_ip = ?client_ip,
            "Request facade created"
        );

        let arrival = ArrivalSnapshot {
            method: parts.method,
            peer: peer_addr(&parts.extensions),
            uri: parts.uri,
            version: parts.version,
            host,
            request_target,
            metadata_size,
            tls,
        };

        Self {
            arrival,
            view,
            headers,
            extensions: parts.extensions,
            body,
            meter,
            client_ip,
        }
    }

    /// The request as it arrived, before any override.
    pub fn arrival(&self) -> &ArrivalSnapshot {
        &self.arrival
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn method(&self) -> &Method {
        &self.view.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.view.method = method;
    }

    /// Resolved scheme: URI scheme, then `X-Forwarded-Proto`, then TLS state.
    pub fn scheme(&self) -> &str {
        if let Some(scheme) = self.arrival.uri.scheme_str() {
            return scheme;
        }
        if let Some(proto) = self.headers.get(X_FORWARDED_PROTO).filter(|p| !p.is_empty()) {
            return proto;
        }
        if self.arrival.tls {
            "https"
        } else {
            "http"
        }
    }

    pub fn host(&self) -> &str {
        &self.view.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.view.host = host.into();
    }

    /// Decoded path.
    ///
    /// Escapes that do not decode to valid UTF-8 come back as U+FFFD, so this
    /// can differ from [`escaped_path`](Self::escaped_path) decoded by hand.
    /// Use the escaped form when the exact bytes matter.
    pub fn path(&self) -> Cow<'_, str> {
        percent_decode_str(&self.view.path).decode_utf8_lossy()
    }

    /// Set the path from its decoded form.
    pub fn set_path(&mut self, path: &str) {
        self.view.path = utf8_percent_encode(path, PATH).to_string();
    }

    pub fn escaped_path(&self) -> &str {
        &self.view.path
    }

    /// Raw query string without the leading `?`; empty when absent.
    pub fn query(&self) -> &str {
        self.view.query.as_deref().unwrap_or("")
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.view.query = (!query.is_empty()).then_some(query);
    }

    /// Always `None` for requests read off the wire: the request target never carries one.
    pub fn fragment(&self) -> Option<&str> {
        None
    }

    /// Protocol version as written on the request line, e.g. `HTTP/1.1`.
    pub fn proto(&self) -> &'static str {
        protocol_name(self.arrival.version)
    }

    pub fn version(&self) -> Version {
        self.arrival.version
    }

    /// Current request target: escaped path plus query.
    pub fn request_uri(&self) -> String {
        let path = if self.view.path.is_empty() { "/" } else { &self.view.path };
        match &self.view.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    pub fn headers(&self) -> &HeaderView {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderView {
        &mut self.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Look up one cookie. `CookieError::NotFound` is the ordinary miss.
    pub fn cookie(&self, name: &str) -> Result<Cookie, CookieError> {
        cookie::lookup(self.headers.get_all(cookie::COOKIE), name)
    }

    /// All well-formed cookies.
    pub fn cookies(&self) -> Vec<Cookie> {
        cookie::parse_all(self.headers.get_all(cookie::COOKIE))
    }

    /// Append a cookie to the single `Cookie` header.
    ///
    /// Fails with `CookieError::InvalidName` when the name is not a token;
    /// invalid value bytes are dropped.
    pub fn add_cookie(&mut self, cookie: &Cookie) -> Result<(), CookieError> {
        let existing = self.headers.get_all(cookie::COOKIE).join("; ");
        let value = cookie::append(Some(&existing), cookie)?;
        self.headers
            .set(cookie::COOKIE, &value)
            .map_err(|e| CookieError::Malformed(e.to_string()))
    }

    /// The instrumented body; read it with `http_body_util::BodyExt`.
    pub fn body_mut(&mut self) -> &mut InstrumentedBody {
        &mut self.body
    }

    /// Next data chunk of the active body. Trailers are skipped.
    pub async fn read_chunk(&mut self) -> Option<Result<Bytes, axum::Error>> {
        loop {
            match self.body.frame().await? {
                Ok(frame) => {
                    if let Ok(data) = frame.into_data() {
                        return Some(Ok(data));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Replace the body used by future reads; see [`InstrumentedBody::set_reader`].
    pub fn set_body(&mut self, body: Body, close_previous: bool) -> Option<Body> {
        self.body.set_reader(body, close_previous)
    }

    /// Metadata size plus body bytes read so far.
    pub fn size(&self) -> u64 {
        self.meter.size()
    }

    pub fn metadata_size(&self) -> u64 {
        self.meter.metadata_size()
    }

    pub fn body_bytes_read(&self) -> u64 {
        self.meter.body_bytes()
    }

    /// A size handle that outlives the facade.
    pub fn meter(&self) -> SizeMeter {
        self.meter.clone()
    }

    /// Release the instrumented body. Remaining bytes are left unread.
    pub fn finish(&mut self) {
        if self.body.is_closed() {
            return;
        }
        self.body.close();
        tracing::debug!(
            method = %self.arrival.method,
            target = %self.arrival.request_target,
            size = self.size(),
            body_bytes = self.body_bytes_read(),
            "Request facade finished"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.body.is_closed()
    }

    /// Rebuild a transport request from the current view.
    ///
    /// The body stays instrumented, so bytes read downstream still count
    /// toward [`SizeMeter`] handles taken earlier.
    pub fn into_forward_request(self) -> Result<Request<Body>, ConstructionError> {
        let target = PathAndQuery::from_str(&self.request_uri())?;

        let mut uri_parts = axum::http::uri::Parts::default();
        let has_host = !self.view.host.is_empty();
        if let Some(scheme) = self.arrival.uri.scheme() {
            uri_parts.scheme = Some(scheme.clone());
            uri_parts.authority = Some(self.authority()?);
            uri_parts.path_and_query = Some(target);
        } else if self.arrival.uri.path_and_query().is_none() && has_host {
            // authority-form (CONNECT)
            uri_parts.authority = Some(self.authority()?);
        } else {
            uri_parts.path_and_query = Some(target);
        }
        let uri = Uri::from_parts(uri_parts)?;

        let mut headers = self.headers;
        if has_host {
            headers
                .set(HOST.as_str(), &self.view.host)
                .map_err(|_| ConstructionError::InvalidHost(self.view.host.clone()))?;
        }

        let mut request = Request::new(Body::new(self.body));
        *request.method_mut() = self.view.method;
        *request.uri_mut() = uri;
        *request.version_mut() = self.arrival.version;
        *request.headers_mut() = headers.into_map();
        *request.extensions_mut() = self.extensions;
        Ok(request)
    }

    fn authority(&self) -> Result<Authority, ConstructionError> {
        Authority::from_str(&self.view.host)
            .map_err(|_| ConstructionError::InvalidHost(self.view.host.clone()))
    }
}
