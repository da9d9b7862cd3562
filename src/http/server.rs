//! HTTP server setup and the metering endpoint.
//!
//! # Responsibilities
//! - Create Axum Router with the metering handler
//! - Tag every request with its connection info (peer, TLS)
//! - Wrap each request in a RequestFacade and read its body through it
//! - Record the metered size, finish the facade, report what was seen
//! - Serve plain HTTP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, LimitsConfig};
use crate::http::client_ip::ClientIpResolver;
use crate::http::facade::RequestFacade;
use crate::lifecycle::shutdown;
use crate::net::{ConnectionId, ConnectionInfo};
use crate::observability::metrics;

/// How long TLS connections get to finish after shutdown is triggered.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ClientIpResolver>,
    pub limits: LimitsConfig,
}

/// What the metering endpoint observed about one request.
#[derive(Debug, Clone, Serialize)]
pub struct MeterReport {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
    pub proto: String,
    pub client_ip: Option<String>,
    /// Connection the request arrived on, e.g. `conn-7`.
    pub connection: Option<String>,
    pub metadata_bytes: u64,
    pub body_bytes: u64,
    pub size: u64,
    pub truncated: bool,
    pub error: Option<String>,
}

impl MeterReport {
    fn from_facade(facade: &RequestFacade, truncated: bool, error: Option<String>) -> Self {
        Self {
            method: facade.method().to_string(),
            scheme: facade.scheme().to_string(),
            host: facade.host().to_string(),
            path: facade.path().into_owned(),
            query: facade.query().to_string(),
            proto: facade.proto().to_string(),
            client_ip: facade.client_ip().map(|ip| ip.to_string()),
            connection: facade
                .extensions()
                .get::<ConnectionInfo>()
                .map(|info| info.id.to_string()),
            metadata_bytes: facade.metadata_size(),
            body_bytes: facade.body_bytes_read(),
            size: facade.size(),
            truncated,
            error,
        }
    }
}

/// HTTP server for the metering gateway.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let state = AppState {
            resolver: Arc::new(ClientIpResolver::new(&config.client_ip)),
            limits: config.limits,
        };
        Self { state }
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self, tls: bool) -> Router {
        Router::new()
            .route("/{*path}", any(meter_handler))
            .route("/", any(meter_handler))
            .with_state(self.state.clone())
            .layer(middleware::from_fn_with_state(tls, tag_connection))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router(false)
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown).await;
            stopper.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self
            .router(true)
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Attach [`ConnectionInfo`] so the facade can see the peer and TLS state.
async fn tag_connection(State(tls): State<bool>, mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let id = ConnectionId::new();
    tracing::debug!(connection = %id, peer = ?peer, tls, "Request tagged");
    request.extensions_mut().insert(ConnectionInfo { id, peer, tls });
    next.run(request).await
}

/// Metering handler.
/// Reads the body through the facade, then reports and records its size.
async fn meter_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let mut facade = RequestFacade::with_resolver(request, &state.resolver);
    let limit = state.limits.max_body_bytes;

    let mut truncated = false;
    let mut error = None;
    while let Some(chunk) = facade.read_chunk().await {
        match chunk {
            Ok(_) if facade.body_bytes_read() > limit => {
                truncated = true;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Request body read failed");
                error = Some(e.to_string());
                break;
            }
        }
    }

    let report = MeterReport::from_facade(&facade, truncated, error);
    let meter = facade.meter();
    facade.finish();

    metrics::record_request_size(facade.arrival().method().as_str(), &meter);
    if truncated {
        metrics::record_truncated_body();
    }

    tracing::info!(
        method = %report.method,
        path = %report.path,
        client_ip = ?report.client_ip,
        connection = ?report.connection,
        metadata_bytes = report.metadata_bytes,
        body_bytes = report.body_bytes,
        size = report.size,
        "Request metered"
    );

    let status = if truncated {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if report.error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}
