//! Identity proof: a site QR code or a face embedding.

use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

use super::{AttendancePolicy, error::{AttendanceError, internal}};
use crate::model::{face::FaceSample, placement::UserIdentity, site_location::SiteLocation};
use crate::store::AttendanceStore;

/// Which proof satisfied verification. `Display` is the label written on the
/// record and echoed in responses; parsing accepts the wire tags too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum VerificationMethod {
    #[strum(to_string = "QR Code", serialize = "QR")]
    Qr,
    #[strum(to_string = "Face Recog", serialize = "FACE")]
    Face,
}

/// The submitted proof, tagged by method.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    Qr(String),
    Face(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub site: SiteLocation,
    pub method: VerificationMethod,
}

impl Credential {
    pub fn method(&self) -> VerificationMethod {
        match self {
            Credential::Qr(_) => VerificationMethod::Qr,
            Credential::Face(_) => VerificationMethod::Face,
        }
    }

    /// Proves `user` is who they claim and resolves the site they scan against.
    pub async fn verify(
        &self,
        store: &dyn AttendanceStore,
        user: &UserIdentity,
        policy: &AttendancePolicy,
    ) -> Result<Verification, AttendanceError> {
        let site = match self {
            Credential::Qr(code) => verify_qr(store, user, code).await?,
            Credential::Face(candidate) => verify_face(store, user, candidate, policy).await?,
        };

        Ok(Verification {
            site,
            method: self.method(),
        })
    }
}

async fn verify_qr(
    store: &dyn AttendanceStore,
    user: &UserIdentity,
    code: &str,
) -> Result<SiteLocation, AttendanceError> {
    if code.trim().is_empty() {
        return Err(AttendanceError::InvalidInput(
            "QR code must not be empty".into(),
        ));
    }

    // a wrong code and a site the user is not assigned to look the same
    store
        .find_site_by_qr(code, user.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AttendanceError::Unauthorized(
                "QR code is wrong or you are not registered at this location".into(),
            )
        })
}

async fn verify_face(
    store: &dyn AttendanceStore,
    user: &UserIdentity,
    candidate: &[f64],
    policy: &AttendancePolicy,
) -> Result<SiteLocation, AttendanceError> {
    check_embedding(candidate, policy)?;

    let samples = store.face_samples(user.id).await.map_err(internal)?;
    if samples.is_empty() {
        return Err(AttendanceError::NotRegistered);
    }

    match best_face_match(candidate, &samples, policy.face_match_threshold) {
        FaceMatch::Accepted { sample_id, score } => {
            debug!(placement_id = user.id, sample_id, score, "face accepted");
        }
        FaceMatch::Rejected { best_score } => {
            return Err(AttendanceError::FaceMismatch {
                best_score,
                threshold: policy.face_match_threshold,
            });
        }
    }

    // the face proves identity, the assignment supplies the location
    match store.find_site(user.site_id).await {
        Ok(Some(site)) => Ok(site),
        Ok(None) => Err(AttendanceError::Forbidden(
            "Your office location was not found in the system".into(),
        )),
        Err(e) => {
            warn!(error = %e, placement_id = user.id, "assigned site lookup failed");
            Err(AttendanceError::Forbidden(
                "Your office location was not found in the system".into(),
            ))
        }
    }
}

/// Rejects embeddings that do not have the model's dimensionality.
pub fn check_embedding(embedding: &[f64], policy: &AttendancePolicy) -> Result<(), AttendanceError> {
    if embedding.len() != policy.embedding_dim {
        return Err(AttendanceError::InvalidInput(format!(
            "Face data is damaged or incomplete (must have {} dimensions)",
            policy.embedding_dim
        )));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(AttendanceError::InvalidInput(
            "Face data contains non-numeric values".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceMatch {
    Accepted { sample_id: u64, score: f64 },
    Rejected { best_score: f64 },
}

/// Scans samples in storage order and stops at the first one reaching
/// `threshold`. Samples that fail to decode, or have a different length than
/// the candidate, are skipped: one corrupt angle must not lock the user out.
pub fn best_face_match(candidate: &[f64], samples: &[FaceSample], threshold: f64) -> FaceMatch {
    let mut best_score = 0.0_f64;

    for sample in samples {
        let stored: Vec<f64> = match serde_json::from_str(&sample.embedding) {
            Ok(v) => v,
            Err(e) => {
                warn!(sample_id = sample.id, error = %e, "skipping undecodable face sample");
                continue;
            }
        };
        if stored.len() != candidate.len() {
            warn!(
                sample_id = sample.id,
                len = stored.len(),
                "skipping face sample with wrong dimension"
            );
            continue;
        }

        let score = cosine_similarity(candidate, &stored);
        best_score = best_score.max(score);

        if score >= threshold {
            return FaceMatch::Accepted {
                sample_id: sample.id,
                score,
            };
        }
    }

    FaceMatch::Rejected { best_score }
}

/// `dot(a, b) / (|a| * |b|)`; a zero vector scores 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}
