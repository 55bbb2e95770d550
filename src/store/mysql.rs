use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};

use super::{AttendanceStore, StoreError};
use crate::model::{
    attendance::{AttendanceRecord, CheckOut, NewAttendance},
    face::FaceSample,
    placement::UserIdentity,
    site_location::SiteLocation,
};

const ATTENDANCE_COLUMNS: &str = r#"
    id, placement_id, contract_id, branch_id, site_id, job_title_id,
    check_in_date, check_in_time, check_in_coordinates, check_in_device_id, method,
    check_out_date, check_out_time, check_out_coordinates, check_out_device_id,
    last_activity, created_at
"#;

/// Flat row as it comes out of `attendances`.
#[derive(Debug, FromRow)]
struct AttendanceRow {
    id: u64,
    placement_id: u64,
    contract_id: u64,
    branch_id: u64,
    site_id: u64,
    job_title_id: u64,
    check_in_date: NaiveDate,
    check_in_time: String,
    check_in_coordinates: String,
    check_in_device_id: String,
    method: Option<String>,
    check_out_date: Option<NaiveDate>,
    check_out_time: Option<String>,
    check_out_coordinates: Option<String>,
    check_out_device_id: Option<String>,
    last_activity: String,
    created_at: NaiveDateTime,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(r: AttendanceRow) -> Result<Self, Self::Error> {
        let check_out = match (
            r.check_out_date,
            r.check_out_time,
            r.check_out_coordinates,
            r.check_out_device_id,
        ) {
            (None, None, None, None) => None,
            (Some(date), Some(time), Some(coordinates), Some(device_id)) => Some(CheckOut {
                date,
                time,
                coordinates,
                device_id,
            }),
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "attendance {} has partially set check-out fields",
                    r.id
                )));
            }
        };

        Ok(AttendanceRecord {
            id: r.id,
            placement_id: r.placement_id,
            contract_id: r.contract_id,
            branch_id: r.branch_id,
            site_id: r.site_id,
            job_title_id: r.job_title_id,
            check_in_date: r.check_in_date,
            check_in_time: r.check_in_time,
            check_in_coordinates: r.check_in_coordinates,
            check_in_device_id: r.check_in_device_id,
            method: r.method,
            check_out,
            last_activity: r.last_activity,
            created_at: r.created_at,
        })
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_identity(&self, placement_id: u64) -> Result<Option<UserIdentity>, StoreError> {
        let identity = sqlx::query_as::<_, UserIdentity>(
            r#"
            SELECT id, name, contract_id, branch_id, site_id, job_title_id
            FROM placements
            WHERE id = ?
            "#,
        )
        .bind(placement_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn find_site_by_qr(
        &self,
        qr_code: &str,
        placement_id: u64,
    ) -> Result<Option<SiteLocation>, StoreError> {
        let site = sqlx::query_as::<_, SiteLocation>(
            r#"
            SELECT id, placement_id, qr_code, latitude, longitude
            FROM site_locations
            WHERE qr_code = ? AND placement_id = ?
            LIMIT 1
            "#,
        )
        .bind(qr_code)
        .bind(placement_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn find_site(&self, site_id: u64) -> Result<Option<SiteLocation>, StoreError> {
        let site = sqlx::query_as::<_, SiteLocation>(
            r#"
            SELECT id, placement_id, qr_code, latitude, longitude
            FROM site_locations
            WHERE id = ?
            "#,
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn face_samples(&self, placement_id: u64) -> Result<Vec<FaceSample>, StoreError> {
        // JSON columns do not decode into String directly
        let samples = sqlx::query_as::<_, FaceSample>(
            r#"
            SELECT id, placement_id, name, CAST(embedding AS CHAR) AS embedding, created_at
            FROM user_faces
            WHERE placement_id = ?
            ORDER BY id
            "#,
        )
        .bind(placement_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    async fn count_face_samples(&self, placement_id: u64) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_faces WHERE placement_id = ?")
                .bind(placement_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn add_face_sample(
        &self,
        placement_id: u64,
        name: &str,
        embedding_json: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_faces (placement_id, name, embedding, created_at)
            VALUES (?, ?, CAST(? AS JSON), NOW())
            "#,
        )
        .bind(placement_id)
        .bind(name)
        .bind(embedding_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_attendance(
        &self,
        placement_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE placement_id = ? AND check_in_date = ?"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(placement_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn create_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendances
            (placement_id, contract_id, branch_id, site_id, job_title_id,
             check_in_date, check_in_time, check_in_coordinates, check_in_device_id, method,
             last_activity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.placement_id)
        .bind(new.contract_id)
        .bind(new.branch_id)
        .bind(new.site_id)
        .bind(new.job_title_id)
        .bind(new.check_in_date)
        .bind(&new.check_in_time)
        .bind(&new.check_in_coordinates)
        .bind(&new.check_in_device_id)
        .bind(&new.method)
        .bind(&new.last_activity)
        .bind(new.created_at)
        .execute(&self.pool)
        .await?;

        Ok(new.into_record(result.last_insert_id()))
    }

    async fn record_check_out(
        &self,
        record_id: u64,
        check_out: &CheckOut,
        last_activity: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendances
            SET check_out_date = ?, check_out_time = ?, check_out_coordinates = ?,
                check_out_device_id = ?, last_activity = ?
            WHERE id = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(check_out.date)
        .bind(&check_out.time)
        .bind(&check_out.coordinates)
        .bind(&check_out.device_id)
        .bind(last_activity)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn attendance_history(
        &self,
        placement_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE placement_id = ? \
             ORDER BY check_in_date DESC, check_in_time DESC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(placement_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }
}
