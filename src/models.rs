use serde::{Deserialize, Serialize};

/// JWT claims issued by the login service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username, for logs only.
    pub sub: String,
    pub placement_id: u64,
    pub exp: usize,
}
