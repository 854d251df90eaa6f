/// Engine-wide error taxonomy.
///
/// A denied entitlement check is NOT an error: `can()` returns
/// `EntitlementResult { allowed: false, .. }` and callers branch on the
/// boolean. Errors here are store failures, bad arguments, or references
/// to catalog entries that do not exist.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

// Helper type for results
pub type Result<T> = std::result::Result<T, EngineError>;
