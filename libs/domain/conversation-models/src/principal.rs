use serde::{Deserialize, Serialize};

/// Verified identity resolved from a bearer token. Created per-request,
/// never persisted (§3 Principal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub subject_id: String,
    pub display_name: String,
    pub customer_id: String,
}
