//! Attendance decision engine.
//!
//! A scan runs verification, then the geofence check, then the session
//! transition. The checkout predictor is a separate read-only path.

pub mod clock;
pub mod error;
pub mod geofence;
pub mod predictor;
pub mod session;
pub mod verification;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{info, warn};

use crate::model::{
    attendance::{AttendanceRecord, CheckOut, NewAttendance, format_coordinates},
    placement::UserIdentity,
};
use crate::store::{AttendanceStore, StoreError};

pub use clock::{Clock, LocalClock};
pub use error::AttendanceError;
use error::internal;
use predictor::Prediction;
use session::Transition;
pub use verification::{Credential, VerificationMethod};

/// Tunables of the decision engine. `Default` is the production policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    pub geofence_radius_m: f64,
    pub face_match_threshold: f64,
    pub embedding_dim: usize,
    pub max_session_hours: i64,
    /// Check-outs before this local hour belong to the previous day.
    pub overnight_cutoff_hour: u32,
    pub min_prediction_history: usize,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            geofence_radius_m: 300.0,
            face_match_threshold: 0.80,
            embedding_dim: 192,
            max_session_hours: 12,
            overnight_cutoff_hour: 6,
            min_prediction_history: 3,
        }
    }
}

/// Width of the `*_device_id` columns.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// One scan submitted from a device.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub credential: Credential,
    pub latitude: f64,
    pub longitude: f64,
    pub device_id: String,
}

impl ScanEvent {
    fn validate(&self) -> Result<(), AttendanceError> {
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(AttendanceError::InvalidInput("Latitude is out of range".into()));
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(AttendanceError::InvalidInput("Longitude is out of range".into()));
        }
        if self.device_id.trim().is_empty() {
            return Err(AttendanceError::InvalidInput("Device id must not be empty".into()));
        }
        if self.device_id.chars().count() > MAX_DEVICE_ID_LEN {
            return Err(AttendanceError::InvalidInput(format!(
                "Device id must be at most {MAX_DEVICE_ID_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub kind: ScanKind,
    pub method: VerificationMethod,
    /// Booked calendar day; for an overnight check-out, the shift's start day.
    pub date: NaiveDate,
    pub time: String,
    pub distance_m: f64,
}

impl ScanOutcome {
    pub fn message(&self) -> String {
        let action = match self.kind {
            ScanKind::CheckIn => "Check-in",
            ScanKind::CheckOut => "Check-out",
        };
        format!("{} successful ({}) at {}", action, self.method, self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceStatus {
    pub is_registered: bool,
    pub face_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPrediction {
    pub check_in: String,
    pub prediction: Prediction,
}

pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

fn time_of_day(at: NaiveDateTime) -> String {
    at.format(predictor::TIME_FORMAT).to_string()
}

fn activity_stamp(date: NaiveDate, time: &str) -> String {
    format!("{} {}", date.format("%Y-%m-%d"), time)
}

impl AttendanceEngine {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, policy: AttendancePolicy) -> Self {
        Self { store, clock, policy }
    }

    /// Resolves the placement behind an authenticated token.
    pub async fn identity(&self, placement_id: u64) -> Result<UserIdentity, AttendanceError> {
        self.store
            .find_identity(placement_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| AttendanceError::Unauthorized("Invalid user session".into()))
    }

    /// Verify, geofence, then move today's session one step forward.
    pub async fn scan(&self, user: &UserIdentity, event: ScanEvent) -> Result<ScanOutcome, AttendanceError> {
        event.validate()?;

        let verification = event
            .credential
            .verify(self.store.as_ref(), user, &self.policy)
            .await?;
        let method = verification.method;
        let site = verification.site;

        let (distance_m, inside) = geofence::within_radius(
            event.latitude,
            event.longitude,
            site.latitude,
            site.longitude,
            self.policy.geofence_radius_m,
        );
        if !inside {
            warn!(placement_id = user.id, site_id = site.id, distance_m, "scan outside geofence");
            return Err(AttendanceError::OutsideGeofence { distance_m });
        }

        let now = self.clock.now();
        let current = self.current_session(user.id, now).await?;

        match session::decide(current.as_ref(), now, &self.policy)? {
            Transition::CheckIn => self.check_in(user, &event, method, now, distance_m).await,
            Transition::CheckOut {
                record_id,
                check_out_date,
            } => {
                let check_out = CheckOut {
                    date: check_out_date,
                    time: time_of_day(now),
                    coordinates: format_coordinates(event.latitude, event.longitude),
                    device_id: event.device_id.clone(),
                };
                self.check_out(user, record_id, check_out, method, distance_m)
                    .await
            }
        }
    }

    /// Today's record, or during the overnight window yesterday's record when
    /// it is still open and within the session cap.
    async fn current_session(
        &self,
        placement_id: u64,
        now: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let today = now.date();
        if let Some(record) = self
            .store
            .find_attendance(placement_id, today)
            .await
            .map_err(internal)?
        {
            return Ok(Some(record));
        }

        if now.hour() >= self.policy.overnight_cutoff_hour {
            return Ok(None);
        }
        let Some(yesterday) = today.pred_opt() else {
            return Ok(None);
        };

        let previous = self
            .store
            .find_attendance(placement_id, yesterday)
            .await
            .map_err(internal)?;
        Ok(previous.filter(|r| r.is_open() && !session::exceeds_cap(r, now, &self.policy)))
    }

    async fn check_in(
        &self,
        user: &UserIdentity,
        event: &ScanEvent,
        method: VerificationMethod,
        now: NaiveDateTime,
        distance_m: f64,
    ) -> Result<ScanOutcome, AttendanceError> {
        let date = now.date();
        let time = time_of_day(now);

        let new = NewAttendance {
            placement_id: user.id,
            contract_id: user.contract_id,
            branch_id: user.branch_id,
            site_id: user.site_id,
            job_title_id: user.job_title_id,
            check_in_date: date,
            check_in_time: time.clone(),
            check_in_coordinates: format_coordinates(event.latitude, event.longitude),
            check_in_device_id: event.device_id.clone(),
            method: method.to_string(),
            last_activity: activity_stamp(date, &time),
            created_at: now,
        };

        match self.store.create_attendance(new).await {
            Ok(record) => {
                info!(placement_id = user.id, record_id = record.id, %method, "checked in");
            }
            // lost the race against a concurrent first scan
            Err(StoreError::Duplicate) => {
                return Err(AttendanceError::Conflict(
                    "You have already checked in today".into(),
                ));
            }
            Err(e) => return Err(internal(e)),
        }

        Ok(ScanOutcome {
            kind: ScanKind::CheckIn,
            method,
            date,
            time,
            distance_m,
        })
    }

    async fn check_out(
        &self,
        user: &UserIdentity,
        record_id: u64,
        check_out: CheckOut,
        method: VerificationMethod,
        distance_m: f64,
    ) -> Result<ScanOutcome, AttendanceError> {
        let last_activity = activity_stamp(check_out.date, &check_out.time);
        let updated = self
            .store
            .record_check_out(record_id, &check_out, &last_activity)
            .await
            .map_err(internal)?;
        if !updated {
            return Err(AttendanceError::Conflict(
                "You have already checked out today".into(),
            ));
        }
        info!(placement_id = user.id, record_id, %method, date = %check_out.date, "checked out");

        Ok(ScanOutcome {
            kind: ScanKind::CheckOut,
            method,
            date: check_out.date,
            time: check_out.time,
            distance_m,
        })
    }

    /// Appends one more face angle for `user`.
    pub async fn register_face(&self, user: &UserIdentity, embedding: &[f64]) -> Result<(), AttendanceError> {
        verification::check_embedding(embedding, &self.policy)?;

        let json = serde_json::to_string(embedding).map_err(|e| {
            tracing::error!(error = %e, "failed to encode face embedding");
            AttendanceError::Internal
        })?;
        self.store
            .add_face_sample(user.id, &user.name, &json)
            .await
            .map_err(internal)?;

        info!(placement_id = user.id, "face sample registered");
        Ok(())
    }

    pub async fn face_status(&self, user: &UserIdentity) -> Result<FaceStatus, AttendanceError> {
        let face_count = self
            .store
            .count_face_samples(user.id)
            .await
            .map_err(internal)?;
        Ok(FaceStatus {
            is_registered: face_count > 0,
            face_count,
        })
    }

    pub async fn history(&self, user: &UserIdentity) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.store
            .attendance_history(user.id)
            .await
            .map_err(internal)
    }

    /// Predicts when the current open session will end. After midnight that
    /// can still be yesterday's session.
    pub async fn predict_checkout(&self, user: &UserIdentity) -> Result<CheckoutPrediction, AttendanceError> {
        let now = self.clock.now();
        let record = self
            .current_session(user.id, now)
            .await?
            .ok_or(AttendanceError::NotCheckedIn)?;

        if let Some(check_out) = &record.check_out {
            return Err(AttendanceError::AlreadyCheckedOut {
                check_out_time: check_out.time.clone(),
            });
        }

        let history = self.history(user).await?;
        let pairs = history
            .iter()
            .filter(|r| r.id != record.id)
            .map(|r| {
                (
                    r.check_in_time.as_str(),
                    r.check_out.as_ref().map(|c| c.time.as_str()),
                )
            });

        let prediction = predictor::predict(
            pairs,
            &record.check_in_time,
            self.policy.min_prediction_history,
        )
        .map_err(|e| {
            tracing::error!(error = %e, placement_id = user.id, "checkout prediction failed");
            AttendanceError::Internal
        })?;

        Ok(CheckoutPrediction {
            check_in: record.check_in_time,
            prediction,
        })
    }
}
