use crate::{
    auth::auth::AuthUser,
    engine::{
        AttendanceEngine, AttendanceError, CheckoutPrediction, Credential, ScanEvent, ScanKind,
        ScanOutcome, VerificationMethod, predictor::{Prediction, TIME_FORMAT},
    },
    model::attendance::AttendanceRecord,
};
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanPayload {
    /// `QR` or `FACE`, case-insensitive. Defaults to `QR`.
    #[serde(default, alias = "metode")]
    #[schema(example = "QR")]
    pub method: Option<String>,
    #[serde(default, alias = "kodeqr")]
    #[schema(example = "SITE-A-7731")]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub face_embedding: Option<Vec<f64>>,
    #[schema(example = json!(-6.2))]
    pub latitude: f64,
    #[schema(example = 106.816666)]
    pub longitude: f64,
    #[serde(default, alias = "android_id")]
    #[schema(example = "a1b2c3d4e5f60708")]
    pub device_id: Option<String>,
}

impl ScanPayload {
    fn into_event(self) -> Result<ScanEvent, AttendanceError> {
        let method = match self.method.as_deref().map(str::trim) {
            None | Some("") => VerificationMethod::Qr,
            Some(tag) => tag.parse::<VerificationMethod>().map_err(|_| {
                AttendanceError::InvalidInput(format!("Unknown verification method {tag:?}"))
            })?,
        };

        let credential = match method {
            VerificationMethod::Qr => Credential::Qr(self.qr_code.unwrap_or_default()),
            VerificationMethod::Face => Credential::Face(self.face_embedding.ok_or_else(|| {
                AttendanceError::InvalidInput("Face embedding is required".into())
            })?),
        };

        Ok(ScanEvent {
            credential,
            latitude: self.latitude,
            longitude: self.longitude,
            device_id: self.device_id.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    #[schema(example = "Check-in successful (QR Code) at 08:00:00")]
    pub message: String,
    #[serde(rename = "type")]
    #[schema(example = "check_in")]
    pub kind: String,
    #[schema(example = "QR Code")]
    pub method: String,
    #[schema(example = "2026-05-04", format = "date", value_type = String)]
    pub date: String,
    #[schema(example = "08:00:00")]
    pub time: String,
    #[schema(example = 42.0)]
    pub distance_m: f64,
}

impl From<&ScanOutcome> for ScanResponse {
    fn from(outcome: &ScanOutcome) -> Self {
        let kind = match outcome.kind {
            ScanKind::CheckIn => "check_in",
            ScanKind::CheckOut => "check_out",
        };
        Self {
            message: outcome.message(),
            kind: kind.to_string(),
            method: outcome.method.to_string(),
            date: outcome.date.format("%Y-%m-%d").to_string(),
            time: outcome.time.clone(),
            distance_m: outcome.distance_m,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceView {
    pub id: u64,
    #[schema(example = "2026-05-04", format = "date", value_type = String)]
    pub check_in_date: String,
    #[schema(example = "08:00:00")]
    pub check_in_time: String,
    #[schema(example = "-6.200000, 106.816666")]
    pub check_in_coordinates: String,
    pub check_in_device_id: String,
    #[schema(example = "QR Code")]
    pub method: Option<String>,
    #[schema(example = "2026-05-04", format = "date", value_type = String)]
    pub check_out_date: Option<String>,
    #[schema(example = "17:00:00")]
    pub check_out_time: Option<String>,
    pub check_out_coordinates: Option<String>,
    pub check_out_device_id: Option<String>,
    #[schema(example = "2026-05-04 17:00:00")]
    pub last_activity: String,
}

impl From<&AttendanceRecord> for AttendanceView {
    fn from(record: &AttendanceRecord) -> Self {
        let check_out = record.check_out.as_ref();
        Self {
            id: record.id,
            check_in_date: record.check_in_date.format("%Y-%m-%d").to_string(),
            check_in_time: record.check_in_time.clone(),
            check_in_coordinates: record.check_in_coordinates.clone(),
            check_in_device_id: record.check_in_device_id.clone(),
            method: record.method.clone(),
            check_out_date: check_out.map(|c| c.date.format("%Y-%m-%d").to_string()),
            check_out_time: check_out.map(|c| c.time.clone()),
            check_out_coordinates: check_out.map(|c| c.coordinates.clone()),
            check_out_device_id: check_out.map(|c| c.device_id.clone()),
            last_activity: record.last_activity.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub data: Vec<AttendanceView>,
    #[schema(example = 20)]
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionResponse {
    pub prediction_available: bool,
    #[schema(example = "08:00:00")]
    pub check_in_time: String,
    #[schema(example = "16:30:00")]
    pub predicted_check_out: Option<String>,
    #[schema(example = 510)]
    pub typical_duration_minutes: Option<i64>,
    /// Complete past sessions the estimate is based on.
    #[schema(example = 14)]
    pub historical_sessions: usize,
    pub message: String,
}

impl From<CheckoutPrediction> for PredictionResponse {
    fn from(p: CheckoutPrediction) -> Self {
        match p.prediction {
            Prediction::InsufficientData { complete_sessions } => Self {
                prediction_available: false,
                check_in_time: p.check_in,
                predicted_check_out: None,
                typical_duration_minutes: None,
                historical_sessions: complete_sessions,
                message: format!(
                    "Not enough attendance history to predict (have {complete_sessions} complete sessions)"
                ),
            },
            Prediction::Estimated {
                check_out,
                typical_duration,
                complete_sessions,
            } => {
                let predicted = check_out.format(TIME_FORMAT).to_string();
                Self {
                    prediction_available: true,
                    message: format!("Predicted check-out at {predicted}"),
                    check_in_time: p.check_in,
                    predicted_check_out: Some(predicted),
                    typical_duration_minutes: Some(typical_duration.num_minutes()),
                    historical_sessions: complete_sessions,
                }
            }
        }
    }
}

/// Check in or check out with a QR code or a face embedding
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanPayload,
    responses(
        (status = 201, description = "Checked in", body = ScanResponse),
        (status = 200, description = "Checked out", body = ScanResponse),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "error": "Latitude is out of range"
        })),
        (status = 401, description = "Wrong QR code, face not recognised or invalid session"),
        (status = 403, description = "Outside the geofence or session expired", body = Object, example = json!({
            "error": "You are outside the allowed area (distance: 412 meters)"
        })),
        (status = 404, description = "Face not registered"),
        (status = 409, description = "Already checked out today", body = Object, example = json!({
            "error": "You have already checked out today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(
    name = "attendance_scan",
    skip(auth, engine, payload),
    fields(placement_id = auth.placement_id, username = %auth.username)
)]
pub async fn scan(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<ScanPayload>,
) -> Result<HttpResponse, AttendanceError> {
    let user = engine.identity(auth.placement_id).await?;
    let event = payload.into_inner().into_event()?;
    debug!(method = %event.credential.method(), "scan received");

    let outcome = engine.scan(&user, event).await?;
    let status = match outcome.kind {
        ScanKind::CheckIn => StatusCode::CREATED,
        ScanKind::CheckOut => StatusCode::OK,
    };
    Ok(HttpResponse::build(status).json(ScanResponse::from(&outcome)))
}

/// Caller's attendance records, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    responses(
        (status = 200, description = "Attendance history", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_history", skip(auth, engine), fields(placement_id = auth.placement_id))]
pub async fn history(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, AttendanceError> {
    let user = engine.identity(auth.placement_id).await?;
    let records = engine.history(&user).await?;

    let data: Vec<AttendanceView> = records.iter().map(AttendanceView::from).collect();
    Ok(HttpResponse::Ok().json(HistoryResponse {
        total: data.len(),
        data,
    }))
}

/// Estimated check-out time for today's open session
#[utoipa::path(
    get,
    path = "/api/attendance/checkout-prediction",
    responses(
        (status = 200, description = "Prediction, or why none is available", body = PredictionResponse),
        (status = 400, description = "Already checked out today", body = Object, example = json!({
            "error": "You have already checked out today",
            "check_out_time": "17:00:00"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not checked in today", body = Object, example = json!({
            "error": "You have not checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "checkout_prediction", skip(auth, engine), fields(placement_id = auth.placement_id))]
pub async fn checkout_prediction(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, AttendanceError> {
    let user = engine.identity(auth.placement_id).await?;
    let prediction = engine.predict_checkout(&user).await?;
    Ok(HttpResponse::Ok().json(PredictionResponse::from(prediction)))
}
