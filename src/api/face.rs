use crate::{
    auth::auth::AuthUser,
    engine::{AttendanceEngine, AttendanceError, FaceStatus},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterFace {
    /// 192 floats produced by the on-device face model.
    #[serde(alias = "embedding")]
    pub face_embedding: Vec<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FaceStatusResponse {
    pub is_registered: bool,
    #[schema(example = 3)]
    pub face_count: i64,
}

impl From<FaceStatus> for FaceStatusResponse {
    fn from(status: FaceStatus) -> Self {
        Self {
            is_registered: status.is_registered,
            face_count: status.face_count,
        }
    }
}

/// Register one more face sample for the caller
#[utoipa::path(
    post,
    path = "/api/face",
    request_body = RegisterFace,
    responses(
        (status = 201, description = "Face sample stored", body = Object, example = json!({
            "message": "Face registered successfully"
        })),
        (status = 400, description = "Embedding has the wrong size", body = Object, example = json!({
            "error": "Face data is damaged or incomplete (must have 192 dimensions)"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Face"
)]
#[instrument(name = "face_register", skip(auth, engine, payload), fields(placement_id = auth.placement_id))]
pub async fn register_face(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<RegisterFace>,
) -> Result<HttpResponse, AttendanceError> {
    let user = engine.identity(auth.placement_id).await?;
    engine.register_face(&user, &payload.face_embedding).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Face registered successfully"
    })))
}

/// Whether the caller has any face samples on file
#[utoipa::path(
    get,
    path = "/api/face/status",
    responses(
        (status = 200, description = "Registration status", body = FaceStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Face"
)]
#[instrument(name = "face_status", skip(auth, engine), fields(placement_id = auth.placement_id))]
pub async fn face_status(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, AttendanceError> {
    let user = engine.identity(auth.placement_id).await?;
    let status = engine.face_status(&user).await?;
    Ok(HttpResponse::Ok().json(FaceStatusResponse::from(status)))
}
