use crate::api::attendance::{
    AttendanceView, HistoryResponse, PredictionResponse, ScanPayload, ScanResponse,
};
use crate::api::face::{FaceStatusResponse, RegisterFace};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Site Attendance API",
        version = "1.0.0",
        description = r#"
## Site Attendance Service

Backend for the mobile attendance app used by placed workers.

### 🔹 Key Features
- **Scan** a site QR code or a face embedding to check in or check out
- **Geofence**: scans are only accepted within the configured radius of the assigned site
- **Face registration**: several samples (angles) per worker
- **History** and **checkout prediction** from past sessions

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer** token issued by the login service.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::scan,
        crate::api::attendance::history,
        crate::api::attendance::checkout_prediction,

        crate::api::face::register_face,
        crate::api::face::face_status
    ),
    components(
        schemas(
            ScanPayload,
            ScanResponse,
            AttendanceView,
            HistoryResponse,
            PredictionResponse,
            RegisterFace,
            FaceStatusResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and history APIs"),
        (name = "Face", description = "Face sample registration APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
