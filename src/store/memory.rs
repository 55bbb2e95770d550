//! In-memory [`AttendanceStore`] used by the engine and handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::{AttendanceStore, StoreError};
use crate::model::{
    attendance::{AttendanceRecord, CheckOut, NewAttendance},
    face::FaceSample,
    placement::UserIdentity,
    site_location::SiteLocation,
};

#[derive(Default)]
struct Tables {
    identities: Vec<UserIdentity>,
    sites: Vec<SiteLocation>,
    faces: Vec<FaceSample>,
    attendances: Vec<AttendanceRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Every read/write call, for asserting the store was (not) touched.
    calls: Mutex<usize>,
    fail: Mutex<bool>,
    stale_reads: Mutex<bool>,
}

impl MemoryStore {
    pub fn with_identity(self, identity: UserIdentity) -> Self {
        self.tables.lock().unwrap().identities.push(identity);
        self
    }

    pub fn with_site(self, site: SiteLocation) -> Self {
        self.tables.lock().unwrap().sites.push(site);
        self
    }

    pub fn with_face(self, placement_id: u64, embedding: &str) -> Self {
        {
            let mut tables = self.tables.lock().unwrap();
            let id = tables.faces.len() as u64 + 1;
            tables.faces.push(FaceSample {
                id,
                placement_id,
                name: "tester".into(),
                embedding: embedding.into(),
                created_at: registered_at(),
            });
        }
        self
    }

    pub fn with_attendance(self, record: AttendanceRecord) -> Self {
        self.tables.lock().unwrap().attendances.push(record);
        self
    }

    /// Makes every subsequent call fail like a dropped connection.
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Makes `find_attendance` miss, like a read racing a concurrent insert.
    pub fn hide_attendance_reads(&self) {
        *self.stale_reads.lock().unwrap() = true;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn attendances(&self) -> Vec<AttendanceRecord> {
        self.tables.lock().unwrap().attendances.clone()
    }

    fn enter(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        *self.calls.lock().unwrap() += 1;
        if *self.fail.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables.lock().unwrap())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_identity(&self, placement_id: u64) -> Result<Option<UserIdentity>, StoreError> {
        let tables = self.enter()?;
        Ok(tables.identities.iter().find(|i| i.id == placement_id).cloned())
    }

    async fn find_site_by_qr(
        &self,
        qr_code: &str,
        placement_id: u64,
    ) -> Result<Option<SiteLocation>, StoreError> {
        let tables = self.enter()?;
        Ok(tables
            .sites
            .iter()
            .find(|s| s.qr_code == qr_code && s.placement_id == placement_id)
            .cloned())
    }

    async fn find_site(&self, site_id: u64) -> Result<Option<SiteLocation>, StoreError> {
        let tables = self.enter()?;
        Ok(tables.sites.iter().find(|s| s.id == site_id).cloned())
    }

    async fn face_samples(&self, placement_id: u64) -> Result<Vec<FaceSample>, StoreError> {
        let tables = self.enter()?;
        Ok(tables
            .faces
            .iter()
            .filter(|f| f.placement_id == placement_id)
            .cloned()
            .collect())
    }

    async fn count_face_samples(&self, placement_id: u64) -> Result<i64, StoreError> {
        let tables = self.enter()?;
        Ok(tables
            .faces
            .iter()
            .filter(|f| f.placement_id == placement_id)
            .count() as i64)
    }

    async fn add_face_sample(
        &self,
        placement_id: u64,
        name: &str,
        embedding_json: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.enter()?;
        let id = tables.faces.len() as u64 + 1;
        tables.faces.push(FaceSample {
            id,
            placement_id,
            name: name.into(),
            embedding: embedding_json.into(),
            created_at: registered_at(),
        });
        Ok(())
    }

    async fn find_attendance(
        &self,
        placement_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let tables = self.enter()?;
        if *self.stale_reads.lock().unwrap() {
            return Ok(None);
        }
        Ok(tables
            .attendances
            .iter()
            .find(|a| a.placement_id == placement_id && a.check_in_date == date)
            .cloned())
    }

    async fn create_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.enter()?;
        let duplicate = tables
            .attendances
            .iter()
            .any(|a| a.placement_id == new.placement_id && a.check_in_date == new.check_in_date);
        if duplicate {
            return Err(StoreError::Duplicate);
        }

        let record = new.into_record(tables.attendances.len() as u64 + 1);
        tables.attendances.push(record.clone());
        Ok(record)
    }

    async fn record_check_out(
        &self,
        record_id: u64,
        check_out: &CheckOut,
        last_activity: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.enter()?;
        match tables
            .attendances
            .iter_mut()
            .find(|a| a.id == record_id && a.check_out.is_none())
        {
            Some(record) => {
                record.check_out = Some(check_out.clone());
                record.last_activity = last_activity.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn attendance_history(
        &self,
        placement_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let tables = self.enter()?;
        let mut rows: Vec<_> = tables
            .attendances
            .iter()
            .filter(|a| a.placement_id == placement_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (b.check_in_date, &b.check_in_time).cmp(&(a.check_in_date, &a.check_in_time))
        });
        Ok(rows)
    }
}

fn registered_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}
