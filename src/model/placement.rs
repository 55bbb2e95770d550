/// The worker identity attached to an authenticated request.
///
/// A placement ties one person to one work contract, branch, job title and
/// assigned site; attendance records copy these attributes at check-in.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserIdentity {
    pub id: u64,
    pub name: String,
    pub contract_id: u64,
    pub branch_id: u64,
    pub site_id: u64,
    pub job_title_id: u64,
}
