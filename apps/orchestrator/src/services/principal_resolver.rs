use std::sync::Arc;

use orchestrator_downstream::IdentityProviderClient;
use orchestrator_models::{CustomerDirectory, OrchestratorError, Principal};
use tracing::{info, instrument};

use crate::services::cache_store::CacheStore;

/// Verifies bearer tokens and maps the resulting identity to a
/// `customer_id` (C1, §4.1). On success, fires a best-effort cache
/// warmup that must never block the caller.
pub struct PrincipalResolver {
    identity_provider: Arc<IdentityProviderClient>,
    customer_directory: Arc<CustomerDirectory>,
    cache: Arc<CacheStore>,
}

impl PrincipalResolver {
    pub fn new(
        identity_provider: Arc<IdentityProviderClient>,
        customer_directory: Arc<CustomerDirectory>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self { identity_provider, customer_directory, cache }
    }

    #[instrument(skip(self, bearer_token))]
    pub async fn resolve(&self, bearer_token: &str) -> Result<Principal, OrchestratorError> {
        let claims = self
            .identity_provider
            .verify(bearer_token)
            .await
            .map_err(|err| OrchestratorError::Unauthenticated(err.to_string()))?;

        let record = self
            .customer_directory
            .lookup(&claims.email)
            .ok_or(OrchestratorError::UnknownCustomer)?;

        let principal = Principal {
            email: claims.email,
            subject_id: claims.subject_id,
            display_name: claims.display_name,
            customer_id: record.customer_id.clone(),
        };

        self.spawn_warmup(principal.clone());

        Ok(principal)
    }

    fn spawn_warmup(&self, principal: Principal) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let customer_id = principal.customer_id.clone();
            cache.ensure_populated(&customer_id, principal).await;
            info!(customer_id = %customer_id, "cache warmup triggered");
        });
    }
}
