//! Last-known record per device.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::device::{DeviceKind, TelemetryRecord};

/// A published record and the time its poll completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub record: TelemetryRecord,
    pub polled_at: DateTime<Utc>,
}

impl Snapshot {
    /// Seconds between the poll and `now`, never negative.
    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.polled_at).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }
}

/// At most one snapshot per [`DeviceKind`].
///
/// Failed polls never reach the store, so the previous snapshot stays
/// visible. Readers get clones.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    slots: RwLock<HashMap<DeviceKind, Snapshot>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the device's snapshot, stamped with the current time.
    pub fn publish(&self, record: TelemetryRecord) {
        self.publish_at(record, Utc::now());
    }

    pub fn publish_at(&self, record: TelemetryRecord, polled_at: DateTime<Utc>) {
        let kind = record.kind();
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(kind, Snapshot { record, polled_at });
    }

    pub fn get_latest(&self, kind: DeviceKind) -> Option<TelemetryRecord> {
        self.snapshot(kind).map(|s| s.record)
    }

    pub fn snapshot(&self, kind: DeviceKind) -> Option<Snapshot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avalon::AvalonTelemetry;
    use crate::bitaxe::BitaxeTelemetry;

    fn bitaxe(power: f64) -> TelemetryRecord {
        BitaxeTelemetry {
            power,
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn empty_store_has_nothing() {
        let store = TelemetryStore::new();
        for kind in DeviceKind::ALL {
            assert!(store.get_latest(kind).is_none());
        }
    }

    #[test]
    fn publish_replaces_per_kind() {
        let store = TelemetryStore::new();
        store.publish(bitaxe(10.0));
        store.publish(bitaxe(12.5));
        store.publish(AvalonTelemetry::default().into());

        match store.get_latest(DeviceKind::Bitaxe) {
            Some(TelemetryRecord::Bitaxe(b)) => assert_eq!(b.power, 12.5),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            store.get_latest(DeviceKind::Avalon).map(|r| r.kind()),
            Some(DeviceKind::Avalon)
        );
    }

    #[test]
    fn snapshot_reports_age() {
        let store = TelemetryStore::new();
        let polled = Utc::now() - chrono::Duration::seconds(30);
        store.publish_at(bitaxe(1.0), polled);

        let snap = store.snapshot(DeviceKind::Bitaxe).unwrap();
        assert_eq!(snap.polled_at, polled);
        let age = snap.age_secs(polled + chrono::Duration::milliseconds(1500));
        assert_eq!(age, 1.5);
        assert_eq!(snap.age_secs(polled - chrono::Duration::seconds(5)), 0.0);
    }

    #[test]
    fn concurrent_publishers_leave_one_snapshot() {
        let store = std::sync::Arc::new(TelemetryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.publish(bitaxe(i as f64)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(store.get_latest(DeviceKind::Bitaxe).is_some());
    }
}
