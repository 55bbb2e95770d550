use crate::{
    api::{attendance, face},
    auth::middleware::auth_middleware,
    config::Config,
    engine::AttendanceError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, middleware::from_fn, web};
use serde_json::json;
use tracing::debug;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter state, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    scan: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            scan: build_limiter(config.rate_scan_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let per_ms = (60_000 / requests_per_min.max(1) as u64).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} requests per minute"))
}

/// Malformed or incomplete JSON bodies are the caller's fault, not ours.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            debug!(error = %err, "rejected request body");
            AttendanceError::InvalidInput(format!("Invalid request body: {err}")).into()
        })
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.service(health);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .app_data(json_config())
            .service(
                web::scope("/attendance")
                    // /attendance/scan
                    .service(
                        web::resource("/scan")
                            .wrap(Governor::new(&limits.scan))
                            .route(web::post().to(attendance::scan)),
                    )
                    // /attendance/history
                    .service(
                        web::resource("/history").route(web::get().to(attendance::history)),
                    )
                    // /attendance/checkout-prediction
                    .service(
                        web::resource("/checkout-prediction")
                            .route(web::get().to(attendance::checkout_prediction)),
                    ),
            )
            .service(
                web::scope("/face")
                    // /face
                    .service(web::resource("").route(web::post().to(face::register_face)))
                    // /face/status
                    .service(web::resource("/status").route(web::get().to(face::face_status))),
            ),
    );
}
