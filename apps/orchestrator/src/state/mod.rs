use std::sync::Arc;

use orchestrator_downstream::{AgentClient, DataServiceClient, IdentityProviderClient};
use orchestrator_models::{AgentCatalog, AgentCatalogFile, CustomerDirectory};

use crate::config::OrchestratorConfig;
use crate::services::cache_populator::CachePopulator;
use crate::services::cache_store::CacheStore;
use crate::services::{
    AgentDispatcher, AuditLog, ConversationStateManager, EscalationPinStore, LlmClassifier, PrincipalResolver,
    SupervisorRouter,
};

/// Shared application state wired once at startup in [`crate::kernel`]
/// and cloned cheaply into every request handler (§9 composition root).
#[derive(Clone)]
pub struct AppState {
    pub principal_resolver: Arc<PrincipalResolver>,
    pub cache: Arc<CacheStore>,
    pub conversations: ConversationStateManager,
    pub router: Arc<SupervisorRouter>,
    pub dispatcher: Arc<AgentDispatcher>,
    pub audit: AuditLog,
}

impl AppState {
    pub async fn new(config: &OrchestratorConfig) -> anyhow::Result<Self> {
        let customer_directory = Arc::new(load_customer_directory(&config.customer_directory_path).await?);
        let agent_catalog = load_agent_catalog(&config.agent_catalog_path).await?;

        let audit = AuditLog::spawn(config.audit_root.clone());

        let data_services = DataServiceClient::new(
            std::env::var("ACCOUNTS_SERVICE_URL").unwrap_or_default(),
            std::env::var("TRANSACTIONS_SERVICE_URL").unwrap_or_default(),
            std::env::var("CONTACTS_SERVICE_URL").unwrap_or_default(),
            std::env::var("LIMITS_SERVICE_URL").unwrap_or_default(),
        );

        let populator = Arc::new(CachePopulator::new(data_services, audit.clone()));
        let cache = Arc::new(CacheStore::new(config.cache_root.clone(), populator, audit.clone()));

        let identity_provider = IdentityProviderClient::new(
            config.idp_jwks_url.clone(),
            config.idp_expected_issuer.clone(),
            config.idp_expected_audience.clone(),
        );

        let principal_resolver =
            Arc::new(PrincipalResolver::new(identity_provider, customer_directory, cache.clone()));

        let escalation_pins = EscalationPinStore::default();
        let llm_classifier = LlmClassifier::new(config.llm_classifier_url.clone(), config.llm_classifier_key.clone());
        let router = Arc::new(SupervisorRouter::new(
            agent_catalog,
            cache.clone(),
            escalation_pins.clone(),
            llm_classifier,
            audit.clone(),
        ));

        let dispatcher =
            Arc::new(AgentDispatcher::new(AgentClient::new(), cache.clone(), escalation_pins, audit.clone()));

        Ok(Self {
            principal_resolver,
            cache,
            conversations: ConversationStateManager::new(),
            router,
            dispatcher,
            audit,
        })
    }
}

async fn load_customer_directory(path: &str) -> anyhow::Result<CustomerDirectory> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn load_agent_catalog(path: &str) -> anyhow::Result<AgentCatalog> {
    let bytes = tokio::fs::read(path).await?;
    let file: AgentCatalogFile = serde_json::from_slice(&bytes)?;
    Ok(AgentCatalog::from_definitions(file.into_definitions()))
}
