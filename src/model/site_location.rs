#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SiteLocation {
    pub id: u64,
    pub placement_id: u64,
    pub qr_code: String,
    pub latitude: f64,
    pub longitude: f64,
}
