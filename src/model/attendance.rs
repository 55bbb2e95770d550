use chrono::{NaiveDate, NaiveDateTime};

/// Check-out half of a session. The four fields only ever exist together.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOut {
    pub date: NaiveDate,
    pub time: String,
    pub coordinates: String,
    pub device_id: String,
}

/// One row per (placement, check-in date).
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: u64,
    pub placement_id: u64,
    pub contract_id: u64,
    pub branch_id: u64,
    pub site_id: u64,
    pub job_title_id: u64,
    pub check_in_date: NaiveDate,
    /// `HH:MM:SS`, local time.
    pub check_in_time: String,
    pub check_in_coordinates: String,
    pub check_in_device_id: String,
    /// Label of the identity proof used at check-in ("QR Code" / "Face Recog").
    pub method: Option<String>,
    pub check_out: Option<CheckOut>,
    /// `YYYY-MM-DD HH:MM:SS` of the latest check-in or check-out.
    pub last_activity: String,
    pub created_at: NaiveDateTime,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

/// Insert payload for a fresh check-in.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub placement_id: u64,
    pub contract_id: u64,
    pub branch_id: u64,
    pub site_id: u64,
    pub job_title_id: u64,
    pub check_in_date: NaiveDate,
    pub check_in_time: String,
    pub check_in_coordinates: String,
    pub check_in_device_id: String,
    pub method: String,
    pub last_activity: String,
    pub created_at: NaiveDateTime,
}

impl NewAttendance {
    /// Materialises the stored row once the store has assigned an id.
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            placement_id: self.placement_id,
            contract_id: self.contract_id,
            branch_id: self.branch_id,
            site_id: self.site_id,
            job_title_id: self.job_title_id,
            check_in_date: self.check_in_date,
            check_in_time: self.check_in_time,
            check_in_coordinates: self.check_in_coordinates,
            check_in_device_id: self.check_in_device_id,
            method: Some(self.method),
            check_out: None,
            last_activity: self.last_activity,
            created_at: self.created_at,
        }
    }
}

/// Formats coordinates the way the mobile client has always stored them.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.6}, {:.6}", latitude, longitude)
}
