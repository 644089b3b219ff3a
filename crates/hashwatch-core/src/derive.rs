//! Metrics derivation: unit conversion, reject ratios, the session hash-rate
//! average, and inferred statuses.
//!
//! The free functions are pure. [`MetricsDeriver`] owns the one piece of
//! state, the Avalon session history, behind a mutex so concurrent requests
//! can derive in parallel.

use std::sync::{Mutex, PoisonError};

use crate::avalon::{AvalonTelemetry, InferredStatus};
use crate::bitaxe::{BitaxeTelemetry, HashRateAvgSource};
use crate::cgminer::readings::{AvalonReadings, EstatsReadings, SummaryReadings};

/// cgminer reports MH/s; the dashboard shows TH/s.
pub const MHS_PER_THS: f64 = 1_000_000.0;
/// `GHSspd` to MH/s.
pub const MHS_PER_GHS: f64 = 1_000.0;

/// Every positive hash-rate sample (MH/s) seen since the process started.
///
/// Never pruned: the dashboard computes the same mean from the same full
/// sequence, and a window would make the two disagree. Memory grows by one
/// `f64` per poll until restart.
#[derive(Debug, Clone, Default)]
pub struct SessionHashrateHistory {
    samples: Vec<f64>,
}

impl SessionHashrateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Non-positive or non-finite readings are ignored and
    /// `false` is returned.
    pub fn record(&mut self, mhs: f64) -> bool {
        if mhs.is_finite() && mhs > 0.0 {
            self.samples.push(mhs);
            true
        } else {
            false
        }
    }

    /// Arithmetic mean of every sample, `None` before the first one.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// `rejected / (accepted + rejected) * 100`, or `None` when nothing has been
/// submitted.
pub fn reject_percentage(accepted: i64, rejected: i64) -> Option<f64> {
    let accepted = accepted.max(0);
    let rejected = rejected.max(0);
    let total = accepted.saturating_add(rejected);
    (total > 0).then(|| rejected as f64 / total as f64 * 100.0)
}

/// Fill the derived BitAxe fields.
pub fn derive_bitaxe(mut record: BitaxeTelemetry) -> BitaxeTelemetry {
    record.shares_rejected_percentage =
        reject_percentage(record.shares_accepted, record.shares_rejected);

    if record.hash_rate_avg <= 0.0 && record.expected_hashrate > 0.0 {
        record.hash_rate_avg = record.expected_hashrate;
        record.hash_rate_avg_source = HashRateAvgSource::Expected;
    } else {
        record.hash_rate_avg_source = HashRateAvgSource::Device;
    }
    record
}

/// Sample appended to the session history for one poll, in MH/s.
pub fn session_sample(summary: &SummaryReadings, estats: &EstatsReadings) -> Option<f64> {
    let from_ghs = estats.ghs_spd.filter(|v| *v > 0.0).map(|v| v * MHS_PER_GHS);
    summary.mhs_5s.filter(|v| *v > 0.0).or(from_ghs)
}

/// Build the published Avalon record and advance the session history.
pub fn derive_avalon(
    readings: &AvalonReadings,
    history: &mut SessionHashrateHistory,
) -> AvalonTelemetry {
    let status = readings.status.clone().unwrap_or_default();
    let summary = readings.summary.clone().unwrap_or_default();
    let estats = readings.estats.clone().unwrap_or_default();
    let version = readings.version.clone().unwrap_or_default();
    let primary = readings.pool(0).cloned().unwrap_or_default();

    let power = summary
        .power
        .filter(|p| *p > 0.0)
        .or(estats.ps_power)
        .or(summary.power)
        .unwrap_or_default();

    if let Some(sample) = session_sample(&summary, &estats) {
        history.record(sample);
    }
    let session_average_hash = history.average().map(|mhs| mhs / MHS_PER_THS);
    let device_average_hash = summary.mhs_av.unwrap_or_default() / MHS_PER_THS;
    let average_hash = session_average_hash.unwrap_or(device_average_hash);
    let realtime_hash = summary.mhs_5s.unwrap_or_default() / MHS_PER_THS;

    let accepted = summary.accepted.unwrap_or_default();
    let reject = summary.rejected.unwrap_or_default();

    let current_pool = current_pool(readings);
    let any_pool_alive = (0..crate::cgminer::POOL_SLOTS)
        .filter_map(|n| readings.pool(n))
        .any(|p| p.is_alive());
    let primary_url = primary.url.clone().unwrap_or_default();

    let inferred = InferredStatus {
        working: estats.otemp.is_some_and(|t| t > 0) || power > 0.0,
        hashing: realtime_hash > 0.0
            || average_hash > 0.0
            || estats.ghs_spd.is_some_and(|g| g > 0.0),
        powered: power > 0.0,
        pool_connected: any_pool_alive
            || primary.stratum_active == Some(true)
            || !primary_url.is_empty(),
    };

    let pool_field = |n: usize, pick: fn(&crate::cgminer::PoolReadings) -> Option<String>| {
        readings.pool(n).and_then(pick).unwrap_or_default()
    };

    let prod = version.prod.clone().unwrap_or_default();
    let hwtype = if prod.is_empty() {
        version.hw_type.clone().unwrap_or_default()
    } else {
        prod.clone()
    };

    AvalonTelemetry {
        hwtype,
        mac: version.mac.unwrap_or_default(),
        version: version.version.unwrap_or_default(),
        ver: estats.ver.clone().unwrap_or_default(),
        api: version.api.unwrap_or_default(),
        cgminer: version.cgminer.unwrap_or_default(),
        prod,
        model: version.model.unwrap_or_default(),
        swtype: version.sw_type.unwrap_or_default(),
        compiler: version.compiler.unwrap_or_default(),
        device_type: version.device_type.unwrap_or_default(),

        status: status.status.unwrap_or_default(),
        when: status.when.unwrap_or_default(),
        code: status.code.unwrap_or_default(),
        msg: status.msg.unwrap_or_default(),
        description: status.description.unwrap_or_default(),

        elapsed: summary.elapsed.unwrap_or_default(),
        workingmode: estats.work_mode.map(|m| m.to_string()).unwrap_or_default(),
        power,
        realtime_hash,
        average_hash,
        device_average_hash,
        session_average_hash,
        session_samples: history.len(),
        accepted,
        reject,
        rejected_percentage: reject_percentage(accepted, reject),

        mhs_av: summary.mhs_av.unwrap_or_default(),
        mhs_5s: summary.mhs_5s.unwrap_or_default(),
        mhs_1m: summary.mhs_1m.unwrap_or_default(),
        mhs_5m: summary.mhs_5m.unwrap_or_default(),
        mhs_15m: summary.mhs_15m.unwrap_or_default(),
        found_blocks: summary.found_blocks.unwrap_or_default(),
        getworks: summary.getworks.unwrap_or_default(),
        discarded: summary.discarded.unwrap_or_default(),
        stale: summary.stale.unwrap_or_default(),
        get_failures: summary.get_failures.unwrap_or_default(),
        local_work: summary.local_work.unwrap_or_default(),
        remote_failures: summary.remote_failures.unwrap_or_default(),
        network_blocks: summary.network_blocks.unwrap_or_default(),
        total_mh: summary.total_mh.unwrap_or_default(),
        diff1_work: summary.diff1_work.unwrap_or_default(),
        difficulty_accepted: summary.difficulty_accepted.unwrap_or_default(),
        difficulty_rejected: summary.difficulty_rejected.unwrap_or_default(),
        difficulty_stale: summary.difficulty_stale.unwrap_or_default(),
        last_share_difficulty: summary.last_share_difficulty.unwrap_or_default(),
        last_valid_work: summary.last_valid_work.unwrap_or_default(),
        total_hashes: summary.total_hashes.unwrap_or_default(),
        diff1_shares: summary.diff1_shares.unwrap_or_default(),
        hardware_errors: summary.hardware_errors.unwrap_or_default(),
        utility: summary.utility.unwrap_or_default(),
        work_utility: summary.work_utility.unwrap_or_default(),
        best_share: summary.best_share.unwrap_or_default(),
        device_hardware_percentage: summary.device_hardware_pct.unwrap_or_default(),
        device_rejected_percentage: summary.device_rejected_pct.unwrap_or_default(),
        pool_rejected_percentage: summary.pool_rejected_pct.unwrap_or_default(),
        pool_stale_percentage: summary.pool_stale_pct.unwrap_or_default(),
        last_getwork: summary.last_getwork.unwrap_or_default(),

        otemp: estats.otemp.unwrap_or_default(),
        tmax: estats.tmax.unwrap_or_default(),
        tavg: estats.tavg.unwrap_or_default(),
        fan1: estats.fan1.unwrap_or_default(),
        fan_status: estats.fan1.unwrap_or_default(),
        fanr: estats.fan_r.unwrap_or_default(),
        ping: estats.ping.unwrap_or_default(),
        ghsspd: estats.ghs_spd.unwrap_or_default(),
        ps: estats.ps.unwrap_or_default(),

        current_pool,
        address: primary_url.clone(),
        worker: primary.user.clone().unwrap_or_default(),
        pool1: pool_field(0, |p| p.url.clone()),
        worker1: pool_field(0, |p| p.user.clone()),
        pool2: pool_field(1, |p| p.url.clone()),
        worker2: pool_field(1, |p| p.user.clone()),
        pool3: pool_field(2, |p| p.url.clone()),
        worker3: pool_field(2, |p| p.user.clone()),
        pool_url: primary_url,
        pool_user: primary.user.unwrap_or_default(),
        pool_status_detail: primary.status.unwrap_or_default(),
        pool_priority: primary.priority.unwrap_or_default(),
        pool_quota: primary.quota.unwrap_or_default(),
        pool_accepted: primary.accepted.unwrap_or_default(),
        pool_rejected: primary.rejected.unwrap_or_default(),
        pool_stale: primary.stale.unwrap_or_default(),
        pool_diff: primary.diff.unwrap_or_default(),
        pool_last_share_time: primary.last_share_time.unwrap_or_default(),
        pool_get_failures: primary.get_failures.unwrap_or_default(),
        pool_remote_failures: primary.remote_failures.unwrap_or_default(),
        pool_current_block_height: primary.current_block_height.unwrap_or_default(),
        pool_stratum_active: primary.stratum_active.unwrap_or_default(),

        inferred,
    }
}

/// The stratum-active pool, else the lowest alive ordinal.
fn current_pool(readings: &AvalonReadings) -> Option<usize> {
    let pools: Vec<_> = (0..crate::cgminer::POOL_SLOTS)
        .filter_map(|n| readings.pool(n).map(|p| (n, p)))
        .collect();
    pools
        .iter()
        .find(|(_, p)| p.stratum_active == Some(true))
        .or_else(|| pools.iter().find(|(_, p)| p.is_alive()))
        .map(|(n, _)| *n)
}

/// Shared deriver. Owns the Avalon session history for the process lifetime.
#[derive(Debug, Default)]
pub struct MetricsDeriver {
    history: Mutex<SessionHashrateHistory>,
}

impl MetricsDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bitaxe(&self, record: BitaxeTelemetry) -> BitaxeTelemetry {
        derive_bitaxe(record)
    }

    /// Derive an Avalon record, holding the history lock for one derivation.
    pub fn avalon(&self, readings: &AvalonReadings) -> AvalonTelemetry {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        derive_avalon(readings, &mut history)
    }

    /// Samples recorded so far.
    pub fn session_samples(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
