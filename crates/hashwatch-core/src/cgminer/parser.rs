//! Decoder for cgminer API replies.
//!
//! A reply is a list of `|`-separated sections, each a list of
//! `,`-separated `KEY=VALUE` fields:
//!
//! ```text
//! STATUS=S,When=1700000000,Code=11,Msg=Summary|SUMMARY,Elapsed=120,MHS av=500000.0,...|
//! ```
//!
//! Keys are compared after upper-casing and removing whitespace, so `MHS av`
//! and `MHSAV` land on the same field. The extended-stats reply additionally
//! embeds a `MM ID0=` sub-record of `Key[Value]` tokens.
//!
//! Parsing never fails: a value that does not coerce leaves its field `None`
//! and the rest of the reply is still read.

use super::Command;
use super::readings::{
    AvalonReadings, EstatsReadings, POOL_SLOTS, PoolReadings, StatusReadings, SummaryReadings,
    VersionReadings,
};

/// Start marker of the per-module sub-record in the extended-stats reply.
const MM_MARKER: &str = "MM ID0=";
/// Position of the output-power reading (watts) in the `PS[...]` array.
const PS_POWER_INDEX: usize = 6;

/// Decode the reply to `command` into a partial record.
pub fn parse(raw: &str, command: Command) -> AvalonReadings {
    let raw = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let sections: Vec<&str> = raw.split('|').map(str::trim).collect();

    match command {
        Command::Summary => AvalonReadings {
            status: Some(parse_status(sections.first().copied().unwrap_or_default())),
            summary: parse_summary(&sections),
            ..Default::default()
        },
        Command::Estats => AvalonReadings {
            estats: parse_estats(raw),
            ..Default::default()
        },
        Command::Version => AvalonReadings {
            version: Some(parse_version(&sections)),
            ..Default::default()
        },
        Command::Pools => AvalonReadings {
            pools: Some(parse_pools(&sections)),
            ..Default::default()
        },
    }
}

/// Upper-case and drop whitespace: `"MHS av"` -> `"MHSAV"`.
fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// `(canonical key, raw value)` pairs of one section. Fields without `=` or
/// with an empty key are skipped.
fn fields(section: &str) -> impl Iterator<Item = (String, &str)> {
    section.split(',').filter_map(|field| {
        let (key, value) = field.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((canonical_key(key), value.trim()))
    })
}

/// First comma field of a section, used as its tag (`SUMMARY`, `POOL=0`, ...).
fn section_tag(section: &str) -> String {
    canonical_key(section.split(',').next().unwrap_or_default())
}

fn int(value: &str) -> Option<i64> {
    value.parse().ok()
}

fn float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "y" | "yes" | "1" => Some(true),
        "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Assign only when the value coerced; a malformed duplicate never erases a
/// good reading.
fn set<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn parse_status(section: &str) -> StatusReadings {
    let mut s = StatusReadings::default();
    for (key, value) in fields(section) {
        match key.as_str() {
            "STATUS" => set(&mut s.status, text(value)),
            "WHEN" => set(&mut s.when, int(value)),
            "CODE" => set(&mut s.code, int(value)),
            "MSG" => set(&mut s.msg, text(value)),
            "DESCRIPTION" => set(&mut s.description, text(value)),
            _ => {}
        }
    }
    s
}

fn parse_summary(sections: &[&str]) -> Option<SummaryReadings> {
    let section = sections
        .iter()
        .find(|s| section_tag(s) == "SUMMARY")
        .or_else(|| sections.get(1).filter(|s| s.contains('=')))?;

    let mut s = SummaryReadings::default();
    for (key, value) in fields(section) {
        match key.as_str() {
            "ELAPSED" => set(&mut s.elapsed, int(value)),
            "MHSAV" => set(&mut s.mhs_av, float(value)),
            "MHS5S" => set(&mut s.mhs_5s, float(value)),
            "MHS1M" => set(&mut s.mhs_1m, float(value)),
            "MHS5M" => set(&mut s.mhs_5m, float(value)),
            "MHS15M" => set(&mut s.mhs_15m, float(value)),
            "ACCEPTED" => set(&mut s.accepted, int(value)),
            "REJECTED" => set(&mut s.rejected, int(value)),
            "FOUNDBLOCKS" => set(&mut s.found_blocks, int(value)),
            "GETWORKS" => set(&mut s.getworks, int(value)),
            "DISCARDED" => set(&mut s.discarded, int(value)),
            "STALE" => set(&mut s.stale, int(value)),
            "GETFAILURES" => set(&mut s.get_failures, int(value)),
            "LOCALWORK" => set(&mut s.local_work, int(value)),
            "REMOTEFAILURES" => set(&mut s.remote_failures, int(value)),
            "NETWORKBLOCKS" => set(&mut s.network_blocks, int(value)),
            "TOTALMH" => set(&mut s.total_mh, float(value)),
            "DIFF1WORK" => set(&mut s.diff1_work, int(value)),
            "DIFFICULTYACCEPTED" => set(&mut s.difficulty_accepted, float(value)),
            "DIFFICULTYREJECTED" => set(&mut s.difficulty_rejected, float(value)),
            "DIFFICULTYSTALE" => set(&mut s.difficulty_stale, float(value)),
            "LASTSHAREDIFFICULTY" => set(&mut s.last_share_difficulty, float(value)),
            "LASTVALIDWORK" => set(&mut s.last_valid_work, int(value)),
            "TOTALHASHES" => set(&mut s.total_hashes, int(value)),
            "DIFF1SHARES" => set(&mut s.diff1_shares, int(value)),
            "HARDWAREERRORS" => set(&mut s.hardware_errors, int(value)),
            "UTILITY" => set(&mut s.utility, float(value)),
            "WORKUTILITY" => set(&mut s.work_utility, float(value)),
            "BESTSHARE" => set(&mut s.best_share, float(value)),
            "DEVICEHARDWARE%" => set(&mut s.device_hardware_pct, float(value)),
            "DEVICEREJECTED%" => set(&mut s.device_rejected_pct, float(value)),
            "POOLREJECTED%" => set(&mut s.pool_rejected_pct, float(value)),
            "POOLSTALE%" => set(&mut s.pool_stale_pct, float(value)),
            "LASTGETWORK" => set(&mut s.last_getwork, int(value)),
            "POWER" => set(&mut s.power, float(value)),
            _ => {}
        }
    }
    Some(s)
}

fn parse_version(sections: &[&str]) -> VersionReadings {
    let mut v = VersionReadings::default();
    for section in sections {
        for (key, value) in fields(section) {
            match key.as_str() {
                "LVERSION" | "VERSION" => set(&mut v.version, text(value)),
                "CGMINER" => set(&mut v.cgminer, text(value)),
                "API" => set(&mut v.api, text(value)),
                "PROD" => set(&mut v.prod, text(value)),
                "MODEL" => set(&mut v.model, text(value)),
                "HWTYPE" => set(&mut v.hw_type, text(value)),
                "SWTYPE" => set(&mut v.sw_type, text(value)),
                "MAC" => set(&mut v.mac, text(value)),
                "COMPILER" => set(&mut v.compiler, text(value)),
                "TYPE" => set(&mut v.device_type, text(value)),
                _ => {}
            }
        }
    }
    v
}

fn parse_pools(sections: &[&str]) -> [Option<PoolReadings>; POOL_SLOTS] {
    let mut pools: [Option<PoolReadings>; POOL_SLOTS] = Default::default();

    for section in sections {
        let ordinal = fields(section)
            .find(|(key, _)| key == "POOL")
            .and_then(|(_, value)| value.parse::<usize>().ok());
        let Some(ordinal) = ordinal.filter(|n| *n < POOL_SLOTS) else {
            continue;
        };

        let mut p = PoolReadings::default();
        for (key, value) in fields(section) {
            match key.as_str() {
                "URL" => set(&mut p.url, text(value)),
                "USER" => set(&mut p.user, text(value)),
                "STATUS" => set(&mut p.status, text(value)),
                "PRIORITY" => set(&mut p.priority, int(value)),
                "QUOTA" => set(&mut p.quota, int(value)),
                "ACCEPTED" => set(&mut p.accepted, int(value)),
                "REJECTED" => set(&mut p.rejected, int(value)),
                "STALE" => set(&mut p.stale, int(value)),
                "DIFF" => set(&mut p.diff, float(value)),
                "LASTSHARETIME" => set(&mut p.last_share_time, int(value)),
                "GETFAILURES" => set(&mut p.get_failures, int(value)),
                "REMOTEFAILURES" => set(&mut p.remote_failures, int(value)),
                "CURRENTBLOCKHEIGHT" => set(&mut p.current_block_height, int(value)),
                "STRATUMACTIVE" => set(&mut p.stratum_active, flag(value)),
                _ => {}
            }
        }
        pools[ordinal] = Some(p);
    }
    pools
}

fn parse_estats(raw: &str) -> Option<EstatsReadings> {
    let start = raw.find(MM_MARKER)?;
    let rest = &raw[start + MM_MARKER.len()..];
    let section = rest.split('|').next().unwrap_or_default();

    let ps = bracket_value(section, "PS").map(str::to_string);
    let ps_power = ps.as_deref().and_then(|values| {
        values
            .split_whitespace()
            .nth(PS_POWER_INDEX)
            .and_then(float)
    });

    Some(EstatsReadings {
        ver: bracket_value(section, "Ver").map(str::to_string),
        otemp: bracket_value(section, "OTemp").and_then(int),
        tmax: bracket_value(section, "TMax").and_then(int),
        tavg: bracket_value(section, "TAvg").and_then(int),
        fan1: bracket_value(section, "Fan1").and_then(int),
        fan_r: bracket_value(section, "FanR").and_then(|v| int(v.trim_end_matches('%').trim())),
        ping: bracket_value(section, "PING").and_then(int),
        ghs_spd: bracket_value(section, "GHSspd").and_then(float),
        work_mode: bracket_value(section, "WORKMODE").and_then(int),
        ps,
        ps_power,
    })
}

/// Contents of the first `key[...]` token in `section`.
///
/// The key only matches at a token boundary (start, whitespace or `=`
/// before it) so `Ver[` is not found inside `MMVer[`. Matching ignores ASCII
/// case.
fn bracket_value<'a>(section: &'a str, key: &str) -> Option<&'a str> {
    let haystack = section.to_ascii_lowercase();
    let needle = format!("{}[", key.to_ascii_lowercase());

    let mut from = 0;
    while let Some(found) = haystack[from..].find(&needle) {
        let at = from + found;
        let boundary = haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == '=');
        let open = at + needle.len();
        if boundary {
            let close = section[open..].find(']')?;
            return Some(section[open..open + close].trim());
        }
        from = open;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "STATUS=S,When=1700000000,Code=11,Msg=Summary,Description=cgminer 4.11.1|\
        SUMMARY,Elapsed=120,MHS av=500000.0,MHS 5s=480000.00,MHS 1m=490000.5,Accepted=10,\
        Rejected=5,Found Blocks=0,Best Share=123456,Hardware Errors=2,Device Rejected%=1.5,\
        Pool Stale%=0.0,Power=140|";

    const ESTATS: &str = "STATUS=S,When=1700000001,Code=70,Msg=CGMiner stats|\
        STATS=0,ID=AVA100,Elapsed=120,MM ID0=Ver[Nano3s-25021401_56abae7] DNA[0201] \
        OTemp[75] TMax[83] TAvg[80] Fan1[1040] FanR[21%] PING[18] GHSspd[5400.25] \
        WORKMODE[2] PS[0 0 27505 4 0 3964 132] MMVer[ignored],MM Count=1|";

    const VERSION: &str = "STATUS=S,When=1700000002,Code=22,Msg=CGMiner versions|\
        VERSION,CGMiner=4.11.1,API=3.7,PROD=Nano3s,MODEL=Nano3s,HWTYPE=N_MM1v1_X1,\
        SWTYPE=MM319,LVERSION=25021401_56abae7,MAC=e0e1e2e3e4e5|";

    const POOLS: &str = "STATUS=S,When=1700000003,Code=7,Msg=3 Pool(s)|\
        POOL=0,URL=stratum+tcp://pool.example:3333,Status=Alive,Priority=0,Quota=1,\
        Accepted=9,Rejected=1,Stale=0,Diff=4096,Last Share Time=1699999990,\
        Stratum Active=true,User=bc1qworker.nano,Current Block Height=820000|\
        POOL=1,URL=stratum+tcp://backup.example:3333,Status=Alive,User=bc1qbackup|\
        POOL=2,URL=stratum+tcp://third.example:3333,Status=Dead,User=bc1qthird|\
        POOL=7,URL=stratum+tcp://ignored.example:3333,Status=Alive|";

    #[test]
    fn summary_fields_parse_with_spaced_keys() {
        let r = parse(SUMMARY, Command::Summary);
        let status = r.status.unwrap();
        assert_eq!(status.status.as_deref(), Some("S"));
        assert_eq!(status.when, Some(1_700_000_000));
        assert_eq!(status.code, Some(11));

        let s = r.summary.unwrap();
        assert_eq!(s.elapsed, Some(120));
        assert_eq!(s.mhs_av, Some(500_000.0));
        assert_eq!(s.mhs_5s, Some(480_000.0));
        assert_eq!(s.mhs_1m, Some(490_000.5));
        assert_eq!(s.accepted, Some(10));
        assert_eq!(s.rejected, Some(5));
        assert_eq!(s.hardware_errors, Some(2));
        assert_eq!(s.device_rejected_pct, Some(1.5));
        assert_eq!(s.power, Some(140.0));
        assert_eq!(s.mhs_15m, None);
    }

    #[test]
    fn concatenated_keys_map_to_the_same_fields() {
        let r = parse(
            "STATUS=S|SUMMARY,MHSAV=1.5,MHS5S=2.5,FOUNDBLOCKS=1,mhs av=9",
            Command::Summary,
        );
        let s = r.summary.unwrap();
        // Later duplicate wins when it parses.
        assert_eq!(s.mhs_av, Some(9.0));
        assert_eq!(s.mhs_5s, Some(2.5));
        assert_eq!(s.found_blocks, Some(1));
    }

    #[test]
    fn corrupt_field_does_not_disturb_neighbours() {
        let r = parse(
            "STATUS=S|SUMMARY,Elapsed=abc,MHS av=500000.0,Accepted=1O,Rejected=3,Power=|",
            Command::Summary,
        );
        let s = r.summary.unwrap();
        assert_eq!(s.elapsed, None);
        assert_eq!(s.accepted, None);
        assert_eq!(s.power, None);
        assert_eq!(s.mhs_av, Some(500_000.0));
        assert_eq!(s.rejected, Some(3));
    }

    #[test]
    fn malformed_duplicate_keeps_good_value() {
        let raw = "STATUS=S|SUMMARY,Accepted=4,Accepted=four";
        let r = parse(raw, Command::Summary);
        assert_eq!(r.summary.unwrap().accepted, Some(4));
    }

    #[test]
    fn error_status_without_summary_section_has_no_summary() {
        let raw = "STATUS=E,When=1,Code=45,Msg=Access denied|";
        let r = parse(raw, Command::Summary);
        assert_eq!(r.status.unwrap().status.as_deref(), Some("E"));
        assert!(r.summary.is_none());
    }

    #[test]
    fn parse_is_deterministic() {
        let a = parse(SUMMARY, Command::Summary);
        let b = parse(SUMMARY, Command::Summary);
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_nul_is_ignored() {
        let r = parse("STATUS=S|SUMMARY,Elapsed=5|\0", Command::Summary);
        assert_eq!(r.summary.unwrap().elapsed, Some(5));
    }

    #[test]
    fn estats_sub_record_is_extracted() {
        let e = parse(ESTATS, Command::Estats).estats.unwrap();
        assert_eq!(e.ver.as_deref(), Some("Nano3s-25021401_56abae7"));
        assert_eq!(e.otemp, Some(75));
        assert_eq!(e.tmax, Some(83));
        assert_eq!(e.tavg, Some(80));
        assert_eq!(e.fan1, Some(1040));
        assert_eq!(e.fan_r, Some(21));
        assert_eq!(e.ping, Some(18));
        assert_eq!(e.ghs_spd, Some(5400.25));
        assert_eq!(e.work_mode, Some(2));
        assert_eq!(e.ps.as_deref(), Some("0 0 27505 4 0 3964 132"));
        assert_eq!(e.ps_power, Some(132.0));
    }

    #[test]
    fn estats_without_marker_is_absent() {
        let r = parse("STATUS=S|STATS=0,ID=POOL0,Elapsed=5|", Command::Estats);
        assert!(r.estats.is_none());
    }

    #[test]
    fn short_power_supply_array_leaves_power_absent() {
        let e = parse("MM ID0=OTemp[70] PS[0 0 27505]", Command::Estats)
            .estats
            .unwrap();
        assert_eq!(e.ps.as_deref(), Some("0 0 27505"));
        assert_eq!(e.ps_power, None);
        assert_eq!(e.otemp, Some(70));
        assert_eq!(e.fan1, None);
    }

    #[test]
    fn bracket_keys_respect_token_boundaries() {
        assert_eq!(bracket_value("MMVer[x] Ver[y]", "Ver"), Some("y"));
        assert_eq!(bracket_value("MMVer[x]", "Ver"), None);
        assert_eq!(bracket_value("=ver[z]", "Ver"), Some("z"));
        assert_eq!(bracket_value("Ver[unterminated", "Ver"), None);
    }

    #[test]
    fn version_fields_parse() {
        let v = parse(VERSION, Command::Version).version.unwrap();
        assert_eq!(v.version.as_deref(), Some("25021401_56abae7"));
        assert_eq!(v.cgminer.as_deref(), Some("4.11.1"));
        assert_eq!(v.api.as_deref(), Some("3.7"));
        assert_eq!(v.prod.as_deref(), Some("Nano3s"));
        assert_eq!(v.hw_type.as_deref(), Some("N_MM1v1_X1"));
        assert_eq!(v.mac.as_deref(), Some("e0e1e2e3e4e5"));
    }

    #[test]
    fn pools_are_keyed_by_ordinal() {
        let r = parse(POOLS, Command::Pools);
        let p0 = r.pool(0).unwrap();
        assert_eq!(p0.url.as_deref(), Some("stratum+tcp://pool.example:3333"));
        assert_eq!(p0.user.as_deref(), Some("bc1qworker.nano"));
        assert_eq!(p0.accepted, Some(9));
        assert_eq!(p0.diff, Some(4096.0));
        assert_eq!(p0.last_share_time, Some(1_699_999_990));
        assert_eq!(p0.stratum_active, Some(true));
        assert_eq!(p0.current_block_height, Some(820_000));
        assert!(p0.is_alive());

        assert_eq!(
            r.pool(1).unwrap().url.as_deref(),
            Some("stratum+tcp://backup.example:3333")
        );
        assert!(!r.pool(2).unwrap().is_alive());
        assert!(r.pool(3).is_none());
    }

    #[test]
    fn pools_reply_without_pools_yields_empty_slots() {
        let r = parse("STATUS=S,Msg=0 Pool(s)|", Command::Pools);
        assert!(r.pools.is_some());
        assert!(r.pool(0).is_none());
    }

    #[test]
    fn garbage_input_never_panics() {
        for raw in ["", "|||", "=,=,=", "SUMMARY", "MM ID0=", "MM ID0=PS[", "POOL=x|POOL=-1"] {
            for command in Command::ACQUISITION_ORDER {
                let _ = parse(raw, command);
            }
        }
    }
}
