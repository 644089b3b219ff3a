//! Partial records produced by the line-protocol parser.
//!
//! Every field is an `Option`: `None` means the device did not send the key
//! or its value failed to coerce. The metrics deriver is the only place that
//! turns these into the absent-value defaults of the published record.

/// Number of pool ordinals the monitor keeps (0, 1, 2).
pub const POOL_SLOTS: usize = 3;

/// The leading `STATUS=...` section every cgminer reply starts with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReadings {
    pub status: Option<String>,
    pub when: Option<i64>,
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub description: Option<String>,
}

/// Counters from the `SUMMARY` section of the `summary` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReadings {
    pub elapsed: Option<i64>,
    pub mhs_av: Option<f64>,
    pub mhs_5s: Option<f64>,
    pub mhs_1m: Option<f64>,
    pub mhs_5m: Option<f64>,
    pub mhs_15m: Option<f64>,
    pub accepted: Option<i64>,
    pub rejected: Option<i64>,
    pub found_blocks: Option<i64>,
    pub getworks: Option<i64>,
    pub discarded: Option<i64>,
    pub stale: Option<i64>,
    pub get_failures: Option<i64>,
    pub local_work: Option<i64>,
    pub remote_failures: Option<i64>,
    pub network_blocks: Option<i64>,
    pub total_mh: Option<f64>,
    pub diff1_work: Option<i64>,
    pub difficulty_accepted: Option<f64>,
    pub difficulty_rejected: Option<f64>,
    pub difficulty_stale: Option<f64>,
    pub last_share_difficulty: Option<f64>,
    pub last_valid_work: Option<i64>,
    pub total_hashes: Option<i64>,
    pub diff1_shares: Option<i64>,
    pub hardware_errors: Option<i64>,
    pub utility: Option<f64>,
    pub work_utility: Option<f64>,
    pub best_share: Option<f64>,
    pub device_hardware_pct: Option<f64>,
    pub device_rejected_pct: Option<f64>,
    pub pool_rejected_pct: Option<f64>,
    pub pool_stale_pct: Option<f64>,
    pub last_getwork: Option<i64>,
    pub power: Option<f64>,
}

/// Fields from the `MM ID0=` sub-record of the extended-stats reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstatsReadings {
    pub ver: Option<String>,
    pub otemp: Option<i64>,
    pub tmax: Option<i64>,
    pub tavg: Option<i64>,
    pub fan1: Option<i64>,
    pub fan_r: Option<i64>,
    pub ping: Option<i64>,
    pub ghs_spd: Option<f64>,
    pub work_mode: Option<i64>,
    /// Raw power-supply array, e.g. `0 0 27505 4 0 3964 132`.
    pub ps: Option<String>,
    /// Watts, taken from the 7th token of `ps`.
    pub ps_power: Option<f64>,
}

/// Identity fields from the `version` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionReadings {
    pub version: Option<String>,
    pub cgminer: Option<String>,
    pub api: Option<String>,
    pub prod: Option<String>,
    pub model: Option<String>,
    pub hw_type: Option<String>,
    pub sw_type: Option<String>,
    pub mac: Option<String>,
    pub compiler: Option<String>,
    pub device_type: Option<String>,
}

/// One `POOL=n` section of the `pools` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolReadings {
    pub url: Option<String>,
    pub user: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub quota: Option<i64>,
    pub accepted: Option<i64>,
    pub rejected: Option<i64>,
    pub stale: Option<i64>,
    pub diff: Option<f64>,
    pub last_share_time: Option<i64>,
    pub get_failures: Option<i64>,
    pub remote_failures: Option<i64>,
    pub current_block_height: Option<i64>,
    pub stratum_active: Option<bool>,
}

impl PoolReadings {
    /// cgminer reports a usable pool as `Alive`; some firmware says `Enabled`.
    pub fn is_alive(&self) -> bool {
        matches!(self.status.as_deref(), Some("Alive" | "Enabled"))
    }
}

/// Best-effort partial record of one Avalon acquisition.
///
/// Each command fills exactly one group; groups stay `None` when the command
/// was not issued or its reply lacked the expected section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvalonReadings {
    pub status: Option<StatusReadings>,
    pub summary: Option<SummaryReadings>,
    pub estats: Option<EstatsReadings>,
    pub version: Option<VersionReadings>,
    pub pools: Option<[Option<PoolReadings>; POOL_SLOTS]>,
}

impl AvalonReadings {
    /// Fold the groups present in `other` into `self`.
    pub fn merge(&mut self, other: AvalonReadings) {
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.summary.is_some() {
            self.summary = other.summary;
        }
        if other.estats.is_some() {
            self.estats = other.estats;
        }
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.pools.is_some() {
            self.pools = other.pools;
        }
    }

    /// Pool at `ordinal`, if the `pools` reply listed it.
    pub fn pool(&self, ordinal: usize) -> Option<&PoolReadings> {
        self.pools.as_ref()?.get(ordinal)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_groups_the_other_side_lacks() {
        let mut base = AvalonReadings {
            summary: Some(SummaryReadings {
                accepted: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };
        base.merge(AvalonReadings {
            version: Some(VersionReadings {
                mac: Some("aa:bb".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(base.summary.unwrap().accepted, Some(10));
        assert_eq!(base.version.unwrap().mac.as_deref(), Some("aa:bb"));
    }

    #[test]
    fn pool_alive_accepts_both_spellings() {
        for (status, alive) in [("Alive", true), ("Enabled", true), ("Dead", false)] {
            let p = PoolReadings {
                status: Some(status.into()),
                ..Default::default()
            };
            assert_eq!(p.is_alive(), alive, "{status}");
        }
        assert!(!PoolReadings::default().is_alive());
    }
}
