use chrono::{DateTime, Utc};
use tracing::info;

use crate::catalog::Catalog;
use crate::models::{Job, JobStatus, StatusMap, StatusRecord};
use crate::store::{Store, StoreError};

pub const RECENT_UPDATES_LIMIT: usize = 5;

/// Current status for a job; jobs never touched are `Not Applied`.
pub fn current_status(statuses: &StatusMap, job_id: &str) -> JobStatus {
    statuses
        .get(job_id)
        .map(|record| record.status)
        .unwrap_or_default()
}

pub fn status_record<'a>(statuses: &'a StatusMap, job_id: &str) -> Option<&'a StatusRecord> {
    statuses.get(job_id)
}

/// Overwrites the job's record. The new stamp never precedes the old one.
pub fn apply_status(
    statuses: &mut StatusMap,
    job_id: &str,
    status: JobStatus,
    now: DateTime<Utc>,
) -> StatusRecord {
    let date = match statuses.get(job_id) {
        Some(previous) if previous.date > now => previous.date,
        _ => now,
    };
    let record = StatusRecord { status, date };
    statuses.insert(job_id.to_string(), record);
    record
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate<'a> {
    pub job: &'a Job,
    pub status: JobStatus,
    pub date: DateTime<Utc>,
}

/// Jobs with a status record, most recently changed first. Records for jobs
/// that are no longer in the catalog are skipped.
pub fn recent_updates<'a>(
    catalog: &'a Catalog,
    statuses: &StatusMap,
    limit: usize,
) -> Vec<StatusUpdate<'a>> {
    let mut updates: Vec<StatusUpdate<'a>> = statuses
        .iter()
        .filter_map(|(job_id, record)| {
            catalog.get(job_id).map(|job| StatusUpdate {
                job,
                status: record.status,
                date: record.date,
            })
        })
        .collect();

    updates.sort_by(|a, b| b.date.cmp(&a.date));
    updates.truncate(limit);
    updates
}

/// Applies status changes against a store, one whole-map write per change.
pub struct StatusTracker<'s, S: Store + ?Sized> {
    store: &'s S,
}

impl<'s, S: Store + ?Sized> StatusTracker<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn statuses(&self) -> StatusMap {
        self.store.load_status_map()
    }

    pub fn get(&self, job_id: &str) -> JobStatus {
        current_status(&self.statuses(), job_id)
    }

    pub fn update(&self, job_id: &str, status: JobStatus) -> Result<StatusRecord, StoreError> {
        let mut statuses = self.store.try_load_status_map()?;
        let record = apply_status(&mut statuses, job_id, status, Utc::now());
        self.store.save_status_map(&statuses)?;
        info!(job_id, status = %status, "status updated");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_untouched_job_is_not_applied() {
        let statuses = StatusMap::new();
        assert_eq!(current_status(&statuses, "4"), JobStatus::NotApplied);
        assert!(status_record(&statuses, "4").is_none());
    }

    #[test]
    fn test_update_round_trip() {
        let store = MemoryStore::new();
        let tracker = StatusTracker::new(&store);

        let before = Utc::now();
        let record = tracker.update("1", JobStatus::Applied).unwrap();
        assert_eq!(record.status, JobStatus::Applied);
        assert!(record.date >= before);

        assert_eq!(tracker.get("1"), JobStatus::Applied);
        assert_eq!(tracker.get("2"), JobStatus::NotApplied);
        let statuses = tracker.statuses();
        assert_eq!(status_record(&statuses, "1"), Some(&record));
    }

    #[test]
    fn test_any_transition_allowed_and_overwrites() {
        let mut statuses = StatusMap::new();
        for (i, status) in [
            JobStatus::Selected,
            JobStatus::Selected,
            JobStatus::NotApplied,
            JobStatus::Rejected,
            JobStatus::Applied,
        ]
        .into_iter()
        .enumerate()
        {
            let record = apply_status(&mut statuses, "9", status, at(1, i as u32));
            assert_eq!(current_status(&statuses, "9"), status);
            assert_eq!(record.date, at(1, i as u32));
        }
        assert_eq!(statuses.len(), 1);
    }

    #[test]
    fn test_stamp_never_moves_backwards() {
        let mut statuses = StatusMap::new();
        apply_status(&mut statuses, "1", JobStatus::Applied, at(10, 12));
        let earlier = at(10, 12) - Duration::hours(3);
        let record = apply_status(&mut statuses, "1", JobStatus::Rejected, earlier);
        assert_eq!(record.status, JobStatus::Rejected);
        assert_eq!(record.date, at(10, 12));
    }

    #[test]
    fn test_recent_updates_sorted_newest_first() {
        let catalog = Catalog::builtin().unwrap();
        let mut statuses = StatusMap::new();
        apply_status(&mut statuses, "1", JobStatus::Applied, at(27, 10));
        apply_status(&mut statuses, "2", JobStatus::Rejected, at(26, 10));
        apply_status(&mut statuses, "3", JobStatus::Selected, at(28, 10));
        apply_status(&mut statuses, "gone", JobStatus::Applied, at(29, 10));

        let updates = recent_updates(&catalog, &statuses, RECENT_UPDATES_LIMIT);
        let order: Vec<&str> = updates.iter().map(|u| u.job.id.as_str()).collect();
        assert_eq!(order, vec!["3", "1", "2"]);
        assert_eq!(updates[0].status, JobStatus::Selected);
    }

    #[test]
    fn test_recent_updates_truncated() {
        let catalog = Catalog::builtin().unwrap();
        let mut statuses = StatusMap::new();
        for (hour, job) in catalog.jobs().iter().take(8).enumerate() {
            apply_status(&mut statuses, &job.id, JobStatus::Applied, at(1, hour as u32));
        }
        let updates = recent_updates(&catalog, &statuses, RECENT_UPDATES_LIMIT);
        assert_eq!(updates.len(), 5);
        assert_eq!(updates[0].date, at(1, 7));
        assert_eq!(updates[4].date, at(1, 3));
    }

    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: Cell<bool>,
    }

    impl Store for FlakyStore {
        fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_reads.get() {
                return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.get_raw(key)
        }
        fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.put_raw(key, value)
        }
        fn delete_raw(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete_raw(key)
        }
    }

    #[test]
    fn test_update_does_not_clobber_on_read_failure() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            fail_reads: Cell::new(false),
        };
        let tracker = StatusTracker::new(&store);
        tracker.update("1", JobStatus::Applied).unwrap();
        tracker.update("2", JobStatus::Selected).unwrap();

        store.fail_reads.set(true);
        assert!(tracker.update("3", JobStatus::Rejected).is_err());

        store.fail_reads.set(false);
        let statuses = tracker.statuses();
        assert_eq!(current_status(&statuses, "1"), JobStatus::Applied);
        assert_eq!(current_status(&statuses, "2"), JobStatus::Selected);
        assert!(status_record(&statuses, "3").is_none());
    }
}
