use std::env;
use std::str::FromStr;

use anyhow::Context;
use dotenvy::dotenv;

use crate::engine::AttendancePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    pub policy: AttendancePolicy,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let defaults = AttendancePolicy::default();
        let policy = AttendancePolicy {
            geofence_radius_m: optional("GEOFENCE_RADIUS_METERS", defaults.geofence_radius_m)?,
            face_match_threshold: optional("FACE_MATCH_THRESHOLD", defaults.face_match_threshold)?,
            embedding_dim: optional("FACE_EMBEDDING_DIM", defaults.embedding_dim)?,
            max_session_hours: optional("MAX_SESSION_HOURS", defaults.max_session_hours)?,
            overnight_cutoff_hour: optional("OVERNIGHT_CUTOFF_HOUR", defaults.overnight_cutoff_hour)?,
            min_prediction_history: optional(
                "MIN_PREDICTION_HISTORY",
                defaults.min_prediction_history,
            )?,
        };
        if policy.overnight_cutoff_hour > 23 {
            anyhow::bail!("OVERNIGHT_CUTOFF_HOUR must be between 0 and 23");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            rate_scan_per_min: optional("RATE_SCAN_PER_MIN", 30)?,
            rate_protected_per_min: optional("RATE_PROTECTED_PER_MIN", 1000)?,

            policy,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            rate_scan_per_min: 1000,
            rate_protected_per_min: 1000,
            policy: AttendancePolicy::default(),
        }
    }
}
