//! Per-day session state machine: `NoSession -> CheckedIn -> CheckedOut`.
//!
//! Everything here is a pure decision over the record found for the day;
//! the engine performs the resulting write.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use super::{AttendancePolicy, error::AttendanceError};
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    CheckedIn,
    CheckedOut,
}

impl SessionState {
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => SessionState::NoSession,
            Some(r) if r.is_open() => SessionState::CheckedIn,
            Some(_) => SessionState::CheckedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CheckIn,
    CheckOut {
        record_id: u64,
        check_out_date: NaiveDate,
    },
}

/// Whether `record` was opened more than the allowed session length ago.
pub fn exceeds_cap(record: &AttendanceRecord, now: NaiveDateTime, policy: &AttendancePolicy) -> bool {
    now - record.created_at > Duration::hours(policy.max_session_hours)
}

/// Calendar day a check-out made at `now` is booked on. Before the cutoff
/// hour it belongs to the previous day's shift.
pub fn check_out_date(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = now.date();
    if now.hour() < cutoff_hour {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    }
}

pub fn decide(
    record: Option<&AttendanceRecord>,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> Result<Transition, AttendanceError> {
    match (SessionState::of(record), record) {
        (SessionState::NoSession, _) => Ok(Transition::CheckIn),
        (SessionState::CheckedOut, _) => Err(AttendanceError::Conflict(
            "You have already checked out today".into(),
        )),
        (SessionState::CheckedIn, Some(open)) => {
            // left open on purpose; an admin closes expired sessions
            if exceeds_cap(open, now, policy) {
                return Err(AttendanceError::SessionExpired {
                    max_hours: policy.max_session_hours,
                });
            }
            Ok(Transition::CheckOut {
                record_id: open.id,
                check_out_date: check_out_date(now, policy.overnight_cutoff_hour),
            })
        }
        (SessionState::CheckedIn, None) => Ok(Transition::CheckIn),
    }
}
