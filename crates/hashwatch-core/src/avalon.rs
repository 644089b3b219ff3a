//! Avalon Nano telemetry record.
//!
//! One flat object with snake_case keys. Hash rates are in TH/s unless the
//! key names another unit (`mhs_*` keep the device's MH/s). Values the device
//! never reported are zero or empty; the two ratios that would otherwise
//! fabricate a number (`rejected_percentage`, `session_average_hash`) are
//! `null` instead.

use serde::Serialize;

/// Statuses with no source in the cgminer protocol, inferred from other
/// readings. Kept under their own key so nobody mistakes them for device
/// output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InferredStatus {
    /// A temperature reading is present, or the unit draws power.
    pub working: bool,
    /// Any hash-rate reading is positive.
    pub hashing: bool,
    /// Power draw is positive.
    pub powered: bool,
    /// A pool is alive, stratum-active, or at least configured.
    pub pool_connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvalonTelemetry {
    // Identity
    pub hwtype: String,
    pub mac: String,
    pub version: String,
    pub ver: String,
    pub api: String,
    pub cgminer: String,
    pub prod: String,
    pub model: String,
    pub swtype: String,
    pub compiler: String,
    #[serde(rename = "type")]
    pub device_type: String,

    // Reply status of the summary command
    pub status: String,
    pub when: i64,
    pub code: i64,
    pub msg: String,
    pub description: String,

    // Headline figures
    pub elapsed: i64,
    pub workingmode: String,
    pub power: f64,
    pub realtime_hash: f64,
    pub average_hash: f64,
    /// `MHS av` converted to TH/s, regardless of the session average.
    pub device_average_hash: f64,
    /// Mean of every sample this process has seen, TH/s.
    pub session_average_hash: Option<f64>,
    pub session_samples: usize,
    pub accepted: i64,
    pub reject: i64,
    pub rejected_percentage: Option<f64>,

    // Raw summary counters
    pub mhs_av: f64,
    pub mhs_5s: f64,
    pub mhs_1m: f64,
    pub mhs_5m: f64,
    pub mhs_15m: f64,
    pub found_blocks: i64,
    pub getworks: i64,
    pub discarded: i64,
    pub stale: i64,
    pub get_failures: i64,
    pub local_work: i64,
    pub remote_failures: i64,
    pub network_blocks: i64,
    pub total_mh: f64,
    pub diff1_work: i64,
    pub difficulty_accepted: f64,
    pub difficulty_rejected: f64,
    pub difficulty_stale: f64,
    pub last_share_difficulty: f64,
    pub last_valid_work: i64,
    pub total_hashes: i64,
    pub diff1_shares: i64,
    pub hardware_errors: i64,
    pub utility: f64,
    pub work_utility: f64,
    pub best_share: f64,
    pub device_hardware_percentage: f64,
    pub device_rejected_percentage: f64,
    pub pool_rejected_percentage: f64,
    pub pool_stale_percentage: f64,
    pub last_getwork: i64,

    // Extended stats
    pub otemp: i64,
    pub tmax: i64,
    pub tavg: i64,
    pub fan1: i64,
    /// Fan speed in RPM (same reading as `fan1`).
    pub fan_status: i64,
    /// Fan duty in percent.
    pub fanr: i64,
    pub ping: i64,
    pub ghsspd: f64,
    pub ps: String,

    // Pools
    /// Ordinal of the pool in use, if one could be identified.
    pub current_pool: Option<usize>,
    pub address: String,
    pub worker: String,
    pub pool1: String,
    pub worker1: String,
    pub pool2: String,
    pub worker2: String,
    pub pool3: String,
    pub worker3: String,
    pub pool_url: String,
    pub pool_user: String,
    pub pool_status_detail: String,
    pub pool_priority: i64,
    pub pool_quota: i64,
    pub pool_accepted: i64,
    pub pool_rejected: i64,
    pub pool_stale: i64,
    pub pool_diff: f64,
    pub pool_last_share_time: i64,
    pub pool_get_failures: i64,
    pub pool_remote_failures: i64,
    pub pool_current_block_height: i64,
    pub pool_stratum_active: bool,

    pub inferred: InferredStatus,
}
