use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Every way a scan, registration or prediction request can fail.
///
/// `Display` is the log line; [`AttendanceError::user_message`] is what the
/// mobile client shows.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum AttendanceError {
    #[display(fmt = "invalid input: {}", _0)]
    InvalidInput(String),

    #[display(fmt = "unauthorized: {}", _0)]
    Unauthorized(String),

    #[display(fmt = "forbidden: {}", _0)]
    Forbidden(String),

    #[display(fmt = "outside geofence: {} m", distance_m)]
    OutsideGeofence { distance_m: f64 },

    #[display(fmt = "no face samples registered")]
    NotRegistered,

    #[display(fmt = "face mismatch: best similarity {}", best_score)]
    FaceMismatch { best_score: f64, threshold: f64 },

    #[display(fmt = "conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "session older than {} hours", max_hours)]
    SessionExpired { max_hours: i64 },

    #[display(fmt = "not checked in today")]
    NotCheckedIn,

    #[display(fmt = "already checked out at {}", check_out_time)]
    AlreadyCheckedOut { check_out_time: String },

    #[display(fmt = "internal error")]
    Internal,
}

impl std::error::Error for AttendanceError {}

impl AttendanceError {
    pub fn user_message(&self) -> String {
        match self {
            AttendanceError::InvalidInput(msg)
            | AttendanceError::Unauthorized(msg)
            | AttendanceError::Forbidden(msg)
            | AttendanceError::Conflict(msg) => msg.clone(),
            AttendanceError::OutsideGeofence { distance_m } => format!(
                "You are outside the allowed area (distance: {:.0} meters)",
                distance_m
            ),
            AttendanceError::NotRegistered => {
                "Your face is not registered yet. Please register your face first.".to_string()
            }
            AttendanceError::FaceMismatch {
                best_score,
                threshold,
            } => format!(
                "Face not recognised (highest score: {:.1}% - need {:.0}%)",
                best_score * 100.0,
                threshold * 100.0
            ),
            AttendanceError::SessionExpired { max_hours } => format!(
                "Work session exceeds {} hours. Please contact admin.",
                max_hours
            ),
            AttendanceError::NotCheckedIn => "You have not checked in today".to_string(),
            AttendanceError::AlreadyCheckedOut { .. } => {
                "You have already checked out today".to_string()
            }
            AttendanceError::Internal => "Internal Server Error".to_string(),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttendanceError::OutsideGeofence { .. } => StatusCode::FORBIDDEN,
            AttendanceError::NotRegistered => StatusCode::NOT_FOUND,
            AttendanceError::FaceMismatch { .. } => StatusCode::UNAUTHORIZED,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::SessionExpired { .. } => StatusCode::FORBIDDEN,
            AttendanceError::NotCheckedIn => StatusCode::NOT_FOUND,
            AttendanceError::AlreadyCheckedOut { .. } => StatusCode::BAD_REQUEST,
            AttendanceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AttendanceError::AlreadyCheckedOut { check_out_time } => json!({
                "error": self.user_message(),
                "check_out_time": check_out_time,
            }),
            _ => json!({ "error": self.user_message() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Logs a store fault and hides it behind [`AttendanceError::Internal`].
pub(crate) fn internal(e: StoreError) -> AttendanceError {
    tracing::error!(error = %e, "attendance store failure");
    AttendanceError::Internal
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn face_mismatch_message_shows_percentages() {
        let err = AttendanceError::FaceMismatch {
            best_score: 0.63,
            threshold: 0.8,
        };
        assert_eq!(
            err.user_message(),
            "Face not recognised (highest score: 63.0% - need 80%)"
        );
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn geofence_message_rounds_distance() {
        let err = AttendanceError::OutsideGeofence { distance_m: 412.0 };
        assert!(err.user_message().contains("412 meters"));
    }

    #[test]
    fn internal_hides_detail() {
        let err = internal(StoreError::Corrupt("row 9 is broken".into()));
        assert_eq!(err, AttendanceError::Internal);
        assert!(!err.user_message().contains("row 9"));
    }

    #[actix_web::test]
    async fn already_checked_out_body_carries_time() {
        let err = AttendanceError::AlreadyCheckedOut {
            check_out_time: "17:05:00".into(),
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["check_out_time"], "17:05:00");
    }
}
