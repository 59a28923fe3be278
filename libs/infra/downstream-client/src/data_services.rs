use std::time::Duration;

use orchestrator_models::{Account, Beneficiary, LimitInfo, Transaction};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::errors::DownstreamError;

/// Per-dependency deadline for a data-service tool call (§5 timeouts).
const DATA_SERVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Recent-transactions window size (§3 CacheBundle: "N is fixed, e.g. 5").
pub const RECENT_TRANSACTIONS_WINDOW: usize = 5;

/// Thin adapter over the accounts/transactions/contacts/limits data
/// services. Each service exposes named tool calls over HTTP with
/// typed bodies (§6.4); the core treats every call as opaque
/// `name + JSON args -> JSON result`.
#[derive(Clone)]
pub struct DataServiceClient {
    http: Client,
    accounts_base_url: String,
    transactions_base_url: String,
    contacts_base_url: String,
    limits_base_url: String,
}

impl DataServiceClient {
    pub fn new(
        accounts_base_url: impl Into<String>,
        transactions_base_url: impl Into<String>,
        contacts_base_url: impl Into<String>,
        limits_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::builder()
                .timeout(DATA_SERVICE_TIMEOUT)
                .build()
                .expect("reqwest client configuration is valid"),
            accounts_base_url: accounts_base_url.into(),
            transactions_base_url: transactions_base_url.into(),
            contacts_base_url: contacts_base_url.into(),
            limits_base_url: limits_base_url.into(),
        }
    }

    #[instrument(skip(self), fields(email = %email))]
    pub async fn fetch_accounts(&self, email: &str) -> Result<Vec<Account>, DownstreamError> {
        let body: AccountsResponse = self
            .call_tool(&self.accounts_base_url, "list_accounts", json!({ "email": email }))
            .await?;
        Ok(body.accounts)
    }

    #[instrument(skip(self))]
    pub async fn fetch_recent_transactions(
        &self,
        primary_account_id: &str,
    ) -> Result<Vec<Transaction>, DownstreamError> {
        let body: TransactionsResponse = self
            .call_tool(
                &self.transactions_base_url,
                "list_recent_transactions",
                json!({ "account_id": primary_account_id, "limit": RECENT_TRANSACTIONS_WINDOW }),
            )
            .await?;
        Ok(body.transactions)
    }

    #[instrument(skip(self))]
    pub async fn fetch_beneficiaries(
        &self,
        primary_account_id: &str,
    ) -> Result<Vec<Beneficiary>, DownstreamError> {
        let body: BeneficiariesResponse = self
            .call_tool(
                &self.contacts_base_url,
                "list_beneficiaries",
                json!({ "account_id": primary_account_id }),
            )
            .await?;
        Ok(body.beneficiaries)
    }

    #[instrument(skip(self))]
    pub async fn fetch_limits(&self, primary_account_id: &str) -> Result<LimitInfo, DownstreamError> {
        let body: LimitsResponse = self
            .call_tool(&self.limits_base_url, "get_limits", json!({ "account_id": primary_account_id }))
            .await?;
        Ok(body.limits)
    }

    async fn call_tool<T: DeserializeOwned>(
        &self,
        base_url: &str,
        tool_name: &str,
        args: Value,
    ) -> Result<T, DownstreamError> {
        let url = format!("{}/tools/{tool_name}", base_url.trim_end_matches('/'));
        let response = self.http.post(&url).json(&args).send().await.map_err(|err| {
            if err.is_timeout() {
                DownstreamError::Timeout(url.clone())
            } else {
                warn!(error = %err, url = %url, "data service call failed");
                DownstreamError::Unreachable(url.clone(), err.to_string())
            }
        })?;

        response
            .json::<T>()
            .await
            .map_err(|err| DownstreamError::MalformedResponse(url, err.to_string()))
    }
}

#[derive(serde::Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(serde::Deserialize)]
struct TransactionsResponse {
    transactions: Vec<Transaction>,
}

#[derive(serde::Deserialize)]
struct BeneficiariesResponse {
    beneficiaries: Vec<Beneficiary>,
}

#[derive(serde::Deserialize)]
struct LimitsResponse {
    limits: LimitInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_accounts_parses_the_tool_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tools/list_accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accounts": [{
                    "id": "A1",
                    "number": "1234",
                    "balance": { "amount": 113400.0, "currency": "THB" },
                    "holder_name": "Alice",
                }]
            })))
            .mount(&server)
            .await;

        let client = DataServiceClient::new(server.uri(), "", "", "");
        let accounts = client.fetch_accounts("alice@ex").await.expect("call succeeds");

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "A1");
    }

    #[tokio::test]
    async fn fetch_limits_surfaces_unreachable_when_the_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tools/get_limits"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DataServiceClient::new("", "", "", server.uri());
        let result = client.fetch_limits("A1").await;

        assert!(matches!(result, Err(DownstreamError::MalformedResponse(_, _))));
    }
}
