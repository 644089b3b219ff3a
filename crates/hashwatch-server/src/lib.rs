//! HTTP dashboard backend.
//!
//! Every telemetry request runs a fresh poll of its device: fetch, derive,
//! publish, respond. Expected device failures answer `200 null`; only faults
//! of the serving layer itself produce a 500.
//!
//! # Endpoints
//!
//! - `GET /`, `GET /index.html`: dashboard page
//! - `GET /api/stats`: BitAxe record or `null`
//! - `GET /api/avalon/stats`: Avalon record or `null`
//! - `GET /api/snapshot`: last published records with their age, no polling
//! - `GET /images/{*path}`: image assets
//! - `OPTIONS` on any path: empty 200 (CORS preflight)

mod dashboard;
pub mod error;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;

use hashwatch_core::{
    AvalonTelemetry, AxeOsClient, BitaxeTelemetry, CgminerClient, DeviceKind, MetricsDeriver,
    MonitorConfig, Snapshot, TelemetryRecord, TelemetrySink, TelemetryStore,
};

pub use dashboard::{FALLBACK_PAGE, load_template, render, template_candidates};
pub use error::{ApiError, ServerError};

/// Everything a request handler needs, built once at startup.
pub struct AppContext {
    config: MonitorConfig,
    axeos: AxeOsClient,
    cgminer: CgminerClient,
    deriver: MetricsDeriver,
    store: TelemetryStore,
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl AppContext {
    pub fn new(config: MonitorConfig) -> Result<Self, ServerError> {
        let axeos = AxeOsClient::new(config.bitaxe_host.clone(), config.http_timeouts)?;
        let cgminer = CgminerClient::new(
            config.avalon_host.clone(),
            config.avalon_port,
            config.tcp_timeouts,
        );
        Ok(Self {
            config,
            axeos,
            cgminer,
            deriver: MetricsDeriver::new(),
            store: TelemetryStore::new(),
            sinks: Vec::new(),
        })
    }

    /// Register a sink that receives every successfully derived record.
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    /// Poll the BitAxe once. `None` when the device gave no usable data.
    pub async fn poll_bitaxe(&self) -> Option<BitaxeTelemetry> {
        match self.axeos.fetch().await {
            Ok(raw) => {
                let record = self.deriver.bitaxe(raw);
                self.publish(record.clone().into());
                Some(record)
            }
            Err(e) => {
                warn!("bitaxe poll failed ({}, {}): {e}", e.class(), e.kind());
                None
            }
        }
    }

    /// Poll the Avalon once. `None` when the primary command failed.
    pub async fn poll_avalon(&self) -> Option<AvalonTelemetry> {
        match self.cgminer.acquire().await {
            Ok(readings) => {
                let record = self.deriver.avalon(&readings);
                self.publish(record.clone().into());
                Some(record)
            }
            Err(e) => {
                debug!("avalon poll failed ({}, {}): {e}", e.class(), e.kind());
                None
            }
        }
    }

    /// Store the record, then hand a copy to each sink on a blocking task.
    fn publish(&self, record: TelemetryRecord) {
        self.store.publish(record.clone());
        if self.sinks.is_empty() {
            return;
        }
        let sinks = self.sinks.clone();
        tokio::task::spawn_blocking(move || {
            for sink in sinks {
                if let Err(e) = sink.record(&record) {
                    warn!("{} failed: {e}", sink.name());
                }
            }
        });
    }
}

/// Stamp the headers that keep browsers from caching live telemetry.
pub(crate) fn no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

async fn handle_bitaxe_stats(State(ctx): State<Arc<AppContext>>) -> Response {
    no_cache(Json(ctx.poll_bitaxe().await).into_response())
}

async fn handle_avalon_stats(State(ctx): State<Arc<AppContext>>) -> Response {
    let record = ctx.poll_avalon().await;
    let response = match serde_json::to_vec(&record) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!("could not serialize avalon record: {e}");
            Json(serde_json::json!({ "error": e.to_string() })).into_response()
        }
    };
    no_cache(response)
}

#[derive(Serialize)]
struct SnapshotEntry {
    polled_at: String,
    age_secs: f64,
    record: TelemetryRecord,
}

#[derive(Serialize)]
struct SnapshotResponse {
    as_of: String,
    bitaxe: Option<SnapshotEntry>,
    avalon: Option<SnapshotEntry>,
}

async fn handle_snapshot(State(ctx): State<Arc<AppContext>>) -> Json<SnapshotResponse> {
    let now = Utc::now();
    let entry = |kind: DeviceKind| {
        ctx.store().snapshot(kind).map(|s: Snapshot| SnapshotEntry {
            polled_at: s.polled_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            age_secs: s.age_secs(now),
            record: s.record,
        })
    };
    Json(SnapshotResponse {
        as_of: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        bitaxe: entry(DeviceKind::Bitaxe),
        avalon: entry(DeviceKind::Avalon),
    })
}

/// Answer preflight requests and stamp CORS headers on every response.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Build the axum router.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(dashboard::handle_index))
        .route("/index.html", get(dashboard::handle_index))
        .route("/api/stats", get(handle_bitaxe_stats))
        .route("/api/avalon/stats", get(handle_avalon_stats))
        .route("/api/snapshot", get(handle_snapshot))
        .route("/images/{*path}", get(dashboard::handle_image))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(middleware::from_fn(cors))
        .with_state(ctx)
}

/// Bind, serve until Ctrl+C, then drain in-flight requests.
pub async fn run_server(ctx: Arc<AppContext>) -> Result<(), ServerError> {
    let addr = ctx.config().listen_addr();
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("listening on http://{addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!("could not listen for Ctrl+C: {e}"),
    }
}
