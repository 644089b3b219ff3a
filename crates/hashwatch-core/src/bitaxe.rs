//! BitAxe (AxeOS) telemetry record.
//!
//! Output keys keep the firmware's own spellings (`temp`, `hashRateAvg`,
//! `ASICModel`, `overheat_mode`, ...) so a dashboard written against the
//! device API can consume the republished record unchanged.

use serde::{Deserialize, Serialize};

use crate::lenient::FieldKind;

/// Where `hashRateAvg` came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashRateAvgSource {
    /// Reported by the device.
    #[default]
    Device,
    /// Device average was absent or zero; `expectedHashrate` substituted.
    Expected,
}

/// Normalized BitAxe record. Every field defaults to zero or an empty string
/// when the device omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitaxeTelemetry {
    pub power: f64,
    pub voltage: f64,
    pub current: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "vrTemp")]
    pub vr_temp: f64,
    pub temp2: f64,

    #[serde(rename = "hashRate")]
    pub hash_rate: f64,
    #[serde(rename = "hashRateAvg")]
    pub hash_rate_avg: f64,
    #[serde(rename = "expectedHashrate")]
    pub expected_hashrate: f64,
    #[serde(rename = "bestDiff")]
    pub best_diff: f64,
    #[serde(rename = "bestSessionDiff")]
    pub best_session_diff: f64,

    #[serde(rename = "freeHeap")]
    pub free_heap: i64,
    #[serde(rename = "freeHeapInternal")]
    pub free_heap_internal: i64,
    #[serde(rename = "freeHeapSpiram")]
    pub free_heap_spiram: i64,

    #[serde(rename = "coreVoltage")]
    pub core_voltage: f64,
    #[serde(rename = "coreVoltageActual")]
    pub core_voltage_actual: f64,
    pub frequency: i64,

    pub ssid: String,
    #[serde(rename = "wifiStatus")]
    pub wifi_status: String,
    #[serde(rename = "wifiRSSI")]
    pub wifi_rssi: i64,

    #[serde(rename = "sharesAccepted")]
    pub shares_accepted: i64,
    #[serde(rename = "sharesRejected")]
    pub shares_rejected: i64,
    #[serde(rename = "uptimeSeconds")]
    pub uptime_seconds: i64,
    #[serde(rename = "uptimeMs")]
    pub uptime_ms: i64,

    #[serde(rename = "stratumURL")]
    pub stratum_url: String,
    #[serde(rename = "stratumPort")]
    pub stratum_port: i64,
    #[serde(rename = "stratumUser")]
    pub stratum_user: String,
    #[serde(rename = "stratumSuggestedDifficulty")]
    pub stratum_suggested_difficulty: f64,
    #[serde(rename = "fallbackStratumURL")]
    pub fallback_stratum_url: String,
    #[serde(rename = "fallbackStratumPort")]
    pub fallback_stratum_port: i64,
    #[serde(rename = "fallbackStratumUser")]
    pub fallback_stratum_user: String,
    #[serde(rename = "isUsingFallbackStratum")]
    pub is_using_fallback_stratum: i64,
    #[serde(rename = "poolDifficulty")]
    pub pool_difficulty: f64,
    #[serde(rename = "poolAddrFamily")]
    pub pool_addr_family: i64,

    pub version: String,
    #[serde(rename = "axeOSVersion")]
    pub axe_os_version: String,
    #[serde(rename = "idfVersion")]
    pub idf_version: String,
    #[serde(rename = "boardVersion")]
    pub board_version: String,
    #[serde(rename = "runningPartition")]
    pub running_partition: String,
    pub hostname: String,
    #[serde(rename = "macAddr")]
    pub mac_addr: String,
    pub ipv4: String,
    pub ipv6: String,
    #[serde(rename = "ASICModel")]
    pub asic_model: String,
    #[serde(rename = "smallCoreCount")]
    pub small_core_count: i64,

    #[serde(rename = "fanspeed")]
    pub fan_speed: i64,
    #[serde(rename = "fanrpm")]
    pub fan_rpm: i64,
    #[serde(rename = "fanperc")]
    pub fan_percentage: i64,

    #[serde(rename = "maxPower")]
    pub max_power: f64,
    #[serde(rename = "nominalVoltage")]
    pub nominal_voltage: f64,
    #[serde(rename = "errorPercentage")]
    pub error_percentage: f64,
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    #[serde(rename = "overheat_mode")]
    pub overheat_mode: i64,
    #[serde(rename = "overclockEnabled")]
    pub overclock_enabled: i64,
    pub display: String,
    #[serde(rename = "blockFound")]
    pub block_found: i64,
    #[serde(rename = "blockHeight")]
    pub block_height: i64,
    #[serde(rename = "networkDifficulty")]
    pub network_difficulty: i64,

    // Derived by the metrics deriver, never read from the device.
    /// `sharesRejected / (sharesAccepted + sharesRejected) * 100`, `null`
    /// when no shares have been submitted.
    #[serde(rename = "sharesRejectedPercentage")]
    pub shares_rejected_percentage: Option<f64>,
    #[serde(rename = "hashRateAvgSource")]
    pub hash_rate_avg_source: HashRateAvgSource,
}

/// Device-sourced fields of [`BitaxeTelemetry`] and their wire types, keyed by
/// the canonical (serialized) spelling.
pub const BITAXE_FIELDS: &[(&str, FieldKind)] = &[
    ("power", FieldKind::Float),
    ("voltage", FieldKind::Float),
    ("current", FieldKind::Float),
    ("temp", FieldKind::Float),
    ("vrTemp", FieldKind::Float),
    ("temp2", FieldKind::Float),
    ("hashRate", FieldKind::Float),
    ("hashRateAvg", FieldKind::Float),
    ("expectedHashrate", FieldKind::Float),
    ("bestDiff", FieldKind::Float),
    ("bestSessionDiff", FieldKind::Float),
    ("freeHeap", FieldKind::Int),
    ("freeHeapInternal", FieldKind::Int),
    ("freeHeapSpiram", FieldKind::Int),
    ("coreVoltage", FieldKind::Float),
    ("coreVoltageActual", FieldKind::Float),
    ("frequency", FieldKind::Int),
    ("ssid", FieldKind::Text),
    ("wifiStatus", FieldKind::Text),
    ("wifiRSSI", FieldKind::Int),
    ("sharesAccepted", FieldKind::Int),
    ("sharesRejected", FieldKind::Int),
    ("uptimeSeconds", FieldKind::Int),
    ("uptimeMs", FieldKind::Int),
    ("stratumURL", FieldKind::Text),
    ("stratumPort", FieldKind::Int),
    ("stratumUser", FieldKind::Text),
    ("stratumSuggestedDifficulty", FieldKind::Float),
    ("fallbackStratumURL", FieldKind::Text),
    ("fallbackStratumPort", FieldKind::Int),
    ("fallbackStratumUser", FieldKind::Text),
    ("isUsingFallbackStratum", FieldKind::Int),
    ("poolDifficulty", FieldKind::Float),
    ("poolAddrFamily", FieldKind::Int),
    ("version", FieldKind::Text),
    ("axeOSVersion", FieldKind::Text),
    ("idfVersion", FieldKind::Text),
    ("boardVersion", FieldKind::Text),
    ("runningPartition", FieldKind::Text),
    ("hostname", FieldKind::Text),
    ("macAddr", FieldKind::Text),
    ("ipv4", FieldKind::Text),
    ("ipv6", FieldKind::Text),
    ("ASICModel", FieldKind::Text),
    ("smallCoreCount", FieldKind::Int),
    ("fanspeed", FieldKind::Int),
    ("fanrpm", FieldKind::Int),
    ("fanperc", FieldKind::Int),
    ("maxPower", FieldKind::Float),
    ("nominalVoltage", FieldKind::Float),
    ("errorPercentage", FieldKind::Float),
    ("responseTime", FieldKind::Float),
    ("overheat_mode", FieldKind::Int),
    ("overclockEnabled", FieldKind::Int),
    ("display", FieldKind::Text),
    ("blockFound", FieldKind::Int),
    ("blockHeight", FieldKind::Int),
    ("networkDifficulty", FieldKind::Int),
];
