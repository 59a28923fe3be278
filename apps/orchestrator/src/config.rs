use std::env;

use tracing::info;

/// Startup configuration assembled from environment variables (§6.5).
/// Read once in `main`, defaulted where the spec gives a default, and
/// logged at `info` with secrets redacted.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_root: String,
    pub audit_root: String,
    pub customer_directory_path: String,
    pub agent_catalog_path: String,
    pub idp_jwks_url: String,
    pub idp_expected_issuer: String,
    pub idp_expected_audience: String,
    pub llm_classifier_url: String,
    pub llm_classifier_key: String,
    pub listen_addr: String,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let config = Self {
            cache_root: env::var("CACHE_ROOT").unwrap_or_else(|_| "./state/cache".to_string()),
            audit_root: env::var("AUDIT_ROOT").unwrap_or_else(|_| "./state/audit".to_string()),
            customer_directory_path: env::var("CUSTOMER_DIRECTORY")
                .unwrap_or_else(|_| "./config/customers.json".to_string()),
            agent_catalog_path: env::var("AGENT_CATALOG")
                .unwrap_or_else(|_| "./config/agents.json".to_string()),
            idp_jwks_url: env::var("IDP_JWKS_URL").unwrap_or_default(),
            idp_expected_issuer: env::var("IDP_EXPECTED_ISSUER").unwrap_or_default(),
            idp_expected_audience: env::var("IDP_EXPECTED_AUDIENCE").unwrap_or_default(),
            llm_classifier_url: env::var("LLM_CLASSIFIER_URL").unwrap_or_default(),
            llm_classifier_key: env::var("LLM_CLASSIFIER_KEY").unwrap_or_default(),
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        };

        info!(
            cache_root = %config.cache_root,
            audit_root = %config.audit_root,
            customer_directory_path = %config.customer_directory_path,
            agent_catalog_path = %config.agent_catalog_path,
            idp_jwks_url = %config.idp_jwks_url,
            listen_addr = %config.listen_addr,
            llm_classifier_key = "***redacted***",
            "orchestrator configuration loaded"
        );

        config
    }
}
