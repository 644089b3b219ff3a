//! Startup configuration.
//!
//! Read once when the process starts and never mutated afterwards. The
//! application context owns one [`MonitorConfig`]; nothing reads device
//! addresses from globals.

use std::path::PathBuf;
use std::time::Duration;

/// Default cgminer API port on the Avalon Nano.
pub const DEFAULT_CGMINER_PORT: u16 = 4028;
/// Default dashboard port.
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// Timeouts for the AxeOS JSON client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Whole-request bound for the info GET.
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
        }
    }
}

/// Timeouts for the cgminer TCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpTimeouts {
    /// Bound on connect and on the command write.
    pub io: Duration,
    /// Overall bound on the response read loop.
    pub read_loop: Duration,
    /// Idle interval after which a non-empty response is considered complete.
    pub quiescence: Duration,
    /// Hard cap on accumulated response bytes.
    pub max_response_bytes: usize,
}

impl Default for TcpTimeouts {
    fn default() -> Self {
        Self {
            io: Duration::from_secs(5),
            read_loop: Duration::from_secs(3),
            quiescence: Duration::from_millis(50),
            max_response_bytes: 8192,
        }
    }
}

/// Everything the monitor needs to know at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// BitAxe host (optionally `host:port`).
    pub bitaxe_host: String,
    /// Avalon Nano host.
    pub avalon_host: String,
    /// cgminer API port on the Avalon host.
    pub avalon_port: u16,
    /// Poll cadence advertised to the dashboard page.
    pub refresh_interval: Duration,
    /// Listen address for the dashboard server.
    pub bind: String,
    /// Listen port for the dashboard server.
    pub port: u16,
    /// Explicit dashboard template; when `None` the default lookup is used.
    pub template: Option<PathBuf>,
    /// Directory that `/images/...` is served from.
    pub assets_dir: PathBuf,
    /// Directory for the JSONL session log; `None` disables it.
    pub session_dir: Option<PathBuf>,
    pub http_timeouts: HttpTimeouts,
    pub tcp_timeouts: TcpTimeouts,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bitaxe_host: "192.168.0.196".to_string(),
            avalon_host: "192.168.0.192".to_string(),
            avalon_port: DEFAULT_CGMINER_PORT,
            refresh_interval: Duration::from_secs(5),
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_WEB_PORT,
            template: None,
            assets_dir: PathBuf::from("."),
            session_dir: Some(PathBuf::from("sessions")),
            http_timeouts: HttpTimeouts::default(),
            tcp_timeouts: TcpTimeouts::default(),
        }
    }
}

impl MonitorConfig {
    /// `bind:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
