//! Persistence seam for the attendance engine.
//!
//! The engine only talks to [`AttendanceStore`]; the MySQL implementation is
//! wired in by `main`, tests use an in-memory one.

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

use crate::model::{
    attendance::{AttendanceRecord, CheckOut, NewAttendance},
    face::FaceSample,
    placement::UserIdentity,
    site_location::SiteLocation,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    /// Unique key violated, e.g. a second check-in for the same day.
    #[display(fmt = "duplicate row")]
    Duplicate,
    /// A stored row breaks a record invariant.
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // MySQL reports duplicate keys as SQLSTATE 23000
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(e)
    }
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_identity(&self, placement_id: u64) -> Result<Option<UserIdentity>, StoreError>;

    /// Site whose QR code matches and which is assigned to the placement.
    async fn find_site_by_qr(
        &self,
        qr_code: &str,
        placement_id: u64,
    ) -> Result<Option<SiteLocation>, StoreError>;

    async fn find_site(&self, site_id: u64) -> Result<Option<SiteLocation>, StoreError>;

    /// All face samples of a placement, in storage order.
    async fn face_samples(&self, placement_id: u64) -> Result<Vec<FaceSample>, StoreError>;

    async fn count_face_samples(&self, placement_id: u64) -> Result<i64, StoreError>;

    async fn add_face_sample(
        &self,
        placement_id: u64,
        name: &str,
        embedding_json: &str,
    ) -> Result<(), StoreError>;

    async fn find_attendance(
        &self,
        placement_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the placement already has a
    /// record for `check_in_date`.
    async fn create_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Sets the check-out fields of a still-open record.
    ///
    /// Returns `false` when the record was already closed (or is gone), so a
    /// concurrent second check-out never overwrites the first.
    async fn record_check_out(
        &self,
        record_id: u64,
        check_out: &CheckOut,
        last_activity: &str,
    ) -> Result<bool, StoreError>;

    /// Newest first.
    async fn attendance_history(
        &self,
        placement_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}
