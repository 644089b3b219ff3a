//! The two device kinds and the record type that carries either one.

use serde::Serialize;

use crate::avalon::AvalonTelemetry;
use crate::bitaxe::BitaxeTelemetry;

/// Which of the two monitored miners a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// BitAxe running AxeOS, polled over its JSON/HTTP API.
    Bitaxe,
    /// Avalon Nano, polled over the cgminer TCP API on port 4028.
    Avalon,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Bitaxe, DeviceKind::Avalon];
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitaxe => write!(f, "bitaxe"),
            Self::Avalon => write!(f, "avalon"),
        }
    }
}

/// A normalized record of either device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryRecord {
    Bitaxe(BitaxeTelemetry),
    Avalon(AvalonTelemetry),
}

impl TelemetryRecord {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Bitaxe(_) => DeviceKind::Bitaxe,
            Self::Avalon(_) => DeviceKind::Avalon,
        }
    }
}

impl From<BitaxeTelemetry> for TelemetryRecord {
    fn from(value: BitaxeTelemetry) -> Self {
        Self::Bitaxe(value)
    }
}

impl From<AvalonTelemetry> for TelemetryRecord {
    fn from(value: AvalonTelemetry) -> Self {
        Self::Avalon(value)
    }
}
