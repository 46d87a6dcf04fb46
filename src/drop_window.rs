use crate::config::{Config, DropPolicy, SoftDropPolicy, LIGHTWEIGHT_BATTERY_SESSION};
use crate::storage::{MetadataKey, TraceStorage};

/// The two cutoffs applied to event timestamps, resolved once from session
/// metadata when the first event arrives and frozen from then on.
///
/// Events before the hard cutoff are discarded and counted. Events between
/// the hard and soft cutoff are decoded into the raw table only, keeping the
/// timeline state machines from seeing a prefix where some cpu buffers are
/// still empty.
#[derive(Debug, Clone, Copy)]
pub struct DropWindow {
    hard: i64,
    soft: i64,
}

impl DropWindow {
    pub fn from_metadata(config: &Config, storage: &TraceStorage) -> Self {
        let hard = if config.preserve_ring_buffer {
            0
        } else {
            match config.drop_before {
                DropPolicy::NoDrop => 0,
                DropPolicy::AllDataSourcesStarted => storage
                    .metadata_int(MetadataKey::AllDataSourcesStartedNs)
                    .unwrap_or(0),
                DropPolicy::TracingStarted => storage
                    .metadata_int(MetadataKey::TracingStartedNs)
                    .unwrap_or(0),
            }
        };
        let soft = match config.soft_drop_before {
            SoftDropPolicy::NoDrop => 0,
            SoftDropPolicy::AllCpuBuffersValid => {
                let session = storage.metadata_str(MetadataKey::UniqueSessionName);
                if session == Some(LIGHTWEIGHT_BATTERY_SESSION) {
                    0
                } else {
                    storage
                        .metadata_int(MetadataKey::FtraceLatestDataStartNs)
                        .unwrap_or(0)
                }
            }
        };
        Self {
            hard,
            soft: soft.max(hard),
        }
    }

    pub fn hard_cutoff(&self) -> i64 {
        self.hard
    }

    pub fn soft_cutoff(&self) -> i64 {
        self.soft
    }

    pub fn is_hard_dropped(&self, ts: i64) -> bool {
        ts < self.hard
    }

    pub fn is_soft_dropped(&self, ts: i64) -> bool {
        ts < self.soft
    }
}

#[cfg(test)]
mod test {
    use super::DropWindow;
    use crate::config::{Config, DropPolicy, LIGHTWEIGHT_BATTERY_SESSION};
    use crate::storage::{MetadataKey, MetadataValue, TraceStorage};

    fn storage_with(key: MetadataKey, value: i64) -> TraceStorage {
        let mut storage = TraceStorage::new();
        storage.set_metadata(key, MetadataValue::Int(value));
        storage
    }

    #[test]
    fn cutoff_boundary_is_inclusive() {
        let storage = storage_with(MetadataKey::TracingStartedNs, 1000);
        let window = DropWindow::from_metadata(&Config::default(), &storage);
        assert!(window.is_hard_dropped(999));
        assert!(!window.is_hard_dropped(1000));
    }

    #[test]
    fn ring_buffer_mode_disables_hard_dropping() {
        let storage = storage_with(MetadataKey::TracingStartedNs, 1000);
        let config = Config {
            preserve_ring_buffer: true,
            ..Config::default()
        };
        let window = DropWindow::from_metadata(&config, &storage);
        assert_eq!(window.hard_cutoff(), 0);
    }

    #[test]
    fn soft_cutoff_never_precedes_hard() {
        let mut storage = storage_with(MetadataKey::TracingStartedNs, 2000);
        storage.set_metadata(MetadataKey::FtraceLatestDataStartNs, MetadataValue::Int(500));
        let window = DropWindow::from_metadata(&Config::default(), &storage);
        assert_eq!(window.soft_cutoff(), 2000);
    }

    #[test]
    fn soft_window_spans_hard_to_latest_data_start() {
        let mut storage = storage_with(MetadataKey::TracingStartedNs, 1000);
        storage.set_metadata(
            MetadataKey::FtraceLatestDataStartNs,
            MetadataValue::Int(3000),
        );
        let window = DropWindow::from_metadata(&Config::default(), &storage);
        assert!(window.is_hard_dropped(999));
        assert!(!window.is_hard_dropped(1500));
        assert!(window.is_soft_dropped(1500));
        assert!(!window.is_soft_dropped(3000));
    }

    #[test]
    fn battery_session_opts_out_of_soft_dropping() {
        let mut storage = storage_with(MetadataKey::FtraceLatestDataStartNs, 3000);
        storage.append_metadata_str(MetadataKey::UniqueSessionName, LIGHTWEIGHT_BATTERY_SESSION);
        let window = DropWindow::from_metadata(&Config::default(), &storage);
        assert_eq!(window.soft_cutoff(), 0);
    }

    #[test]
    fn alternate_hard_policy_reads_its_own_marker() {
        let mut storage = storage_with(MetadataKey::AllDataSourcesStartedNs, 700);
        storage.set_metadata(MetadataKey::TracingStartedNs, MetadataValue::Int(400));
        let config = Config {
            drop_before: DropPolicy::AllDataSourcesStarted,
            ..Config::default()
        };
        let window = DropWindow::from_metadata(&config, &storage);
        assert_eq!(window.hard_cutoff(), 700);
    }
}
