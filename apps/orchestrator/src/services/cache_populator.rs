use chrono::Utc;
use orchestrator_downstream::DataServiceClient;
use orchestrator_models::{CacheBundle, CacheData, Principal};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::services::audit_log::AuditLog;
use crate::services::cache_store::DEFAULT_BUNDLE_TTL_SECONDS;

#[derive(Debug, Error)]
pub enum PopulateError {
    #[error("accounts service returned no accounts for this customer")]
    NoAccounts,
    #[error("accounts service call failed: {0}")]
    AccountsUnavailable(String),
}

/// Fills a [`CacheBundle`] from the data services (C3, §4.2 populate
/// algorithm). Phase A (accounts) is serial and required; phase B
/// (transactions/beneficiaries/limits) runs concurrently and is
/// best-effort per dependency.
pub struct CachePopulator {
    data_services: DataServiceClient,
    audit: AuditLog,
}

impl CachePopulator {
    pub fn new(data_services: DataServiceClient, audit: AuditLog) -> Self {
        Self { data_services, audit }
    }

    #[instrument(skip(self, principal), fields(customer_id = %customer_id))]
    pub async fn populate(
        &self,
        customer_id: &str,
        principal: &Principal,
    ) -> Result<CacheBundle, PopulateError> {
        let accounts = self
            .data_services
            .fetch_accounts(&principal.email)
            .await
            .map_err(|err| PopulateError::AccountsUnavailable(err.to_string()))?;

        if accounts.is_empty() {
            return Err(PopulateError::NoAccounts);
        }

        let primary_account_id = accounts[0].id.clone();
        let primary_balance = accounts[0].balance.clone();

        let (transactions, beneficiaries, limits) = tokio::join!(
            self.fetch_transactions_best_effort(customer_id, &primary_account_id),
            self.fetch_beneficiaries_best_effort(customer_id, &primary_account_id),
            self.fetch_limits_best_effort(customer_id, &primary_account_id),
        );

        self.audit.record(orchestrator_models::AuditRecord::new(
            customer_id,
            "",
            orchestrator_models::EventType::CachePopulateOk,
            serde_json::json!({ "account_count": accounts.len() }),
        ));

        Ok(CacheBundle {
            customer_id: customer_id.to_string(),
            created_at: Utc::now(),
            ttl_seconds: DEFAULT_BUNDLE_TTL_SECONDS,
            data: CacheData {
                accounts,
                primary_balance: Some(primary_balance),
                last_n_transactions: transactions,
                beneficiaries,
                limits,
            },
        })
    }

    async fn fetch_transactions_best_effort(
        &self,
        customer_id: &str,
        primary_account_id: &str,
    ) -> Vec<orchestrator_models::Transaction> {
        match self.data_services.fetch_recent_transactions(primary_account_id).await {
            Ok(transactions) => transactions,
            Err(err) => {
                self.audit_sub_failure(customer_id, "transactions", &err);
                Vec::new()
            }
        }
    }

    async fn fetch_beneficiaries_best_effort(
        &self,
        customer_id: &str,
        primary_account_id: &str,
    ) -> Vec<orchestrator_models::Beneficiary> {
        match self.data_services.fetch_beneficiaries(primary_account_id).await {
            Ok(beneficiaries) => beneficiaries,
            Err(err) => {
                self.audit_sub_failure(customer_id, "beneficiaries", &err);
                Vec::new()
            }
        }
    }

    async fn fetch_limits_best_effort(
        &self,
        customer_id: &str,
        primary_account_id: &str,
    ) -> Option<orchestrator_models::LimitInfo> {
        match self.data_services.fetch_limits(primary_account_id).await {
            Ok(limits) => Some(limits),
            Err(err) => {
                self.audit_sub_failure(customer_id, "limits", &err);
                None
            }
        }
    }

    fn audit_sub_failure(&self, customer_id: &str, dependency: &str, err: &dyn std::error::Error) {
        warn!(customer_id = %customer_id, dependency = %dependency, error = %err, "cache populate sub-fetch failed");
        self.audit.record(orchestrator_models::AuditRecord::new(
            customer_id,
            "",
            orchestrator_models::EventType::CachePopulateFail,
            serde_json::json!({ "dependency": dependency, "reason": err.to_string() }),
        ));
    }
}
