use chrono::NaiveDateTime;

/// One registered face angle. `embedding` is the raw JSON array as stored;
/// decoding is left to the verifier so a corrupt row can be skipped.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FaceSample {
    pub id: u64,
    pub placement_id: u64,
    pub name: String,
    pub embedding: String,
    pub created_at: NaiveDateTime,
}
