//! # hashwatch-core
//!
//! Telemetry acquisition and normalization for two small Bitcoin miners:
//!
//! - a **BitAxe** running AxeOS, polled over `GET /api/system/info`
//! - an **Avalon Nano**, polled over the cgminer TCP API on port 4028
//!
//! ## Quick Start
//!
//! ```no_run
//! use hashwatch_core::{CgminerClient, MetricsDeriver, TcpTimeouts, TelemetryStore};
//!
//! # async fn run() -> Result<(), hashwatch_core::FetchError> {
//! let client = CgminerClient::new("192.168.0.192", 4028, TcpTimeouts::default());
//! let deriver = MetricsDeriver::new();
//! let store = TelemetryStore::new();
//!
//! let readings = client.acquire().await?;
//! let record = deriver.avalon(&readings);
//! println!("{:.2} TH/s average", record.average_hash);
//! store.publish(record.into());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Client → (cgminer parser) → Deriver → Store
//!
//! Each layer returns values, never panics on device input. Clients report
//! failures as [`FetchError`]; the parser is total and yields partial
//! [`AvalonReadings`]; the deriver turns partial readings into the flat
//! published records, keeping the Avalon session hash-rate history.

pub mod avalon;
pub mod axeos;
pub mod bitaxe;
pub mod cgminer;
pub mod config;
pub mod derive;
pub mod device;
pub mod error;
pub mod lenient;
pub mod sink;
pub mod store;

pub use avalon::{AvalonTelemetry, InferredStatus};
pub use axeos::AxeOsClient;
pub use bitaxe::{BitaxeTelemetry, HashRateAvgSource};
pub use cgminer::{AvalonReadings, CgminerClient, Command};
pub use config::{DEFAULT_CGMINER_PORT, DEFAULT_WEB_PORT, HttpTimeouts, MonitorConfig, TcpTimeouts};
pub use derive::{MetricsDeriver, SessionHashrateHistory};
pub use device::{DeviceKind, TelemetryRecord};
pub use error::{ErrorClass, FetchError, SinkError};
pub use sink::{JsonlSessionLog, TelemetrySink};
pub use store::{Snapshot, TelemetryStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
