//! End-to-end scenarios from spec §8: cache short-circuit, write-intent
//! bypassing the cache, and keyword-only routing with no cache present.

use chrono::Utc;
use conversational_orchestrator::services::agent_dispatcher::AgentDispatcher;
use conversational_orchestrator::services::cache_populator::CachePopulator;
use conversational_orchestrator::services::cache_store::CacheStore;
use conversational_orchestrator::services::supervisor_router::{EscalationPinStore, RouterOutcome, SupervisorRouter};
use conversational_orchestrator::services::{AuditLog, LlmClassifier};
use orchestrator_downstream::{AgentClient, DataServiceClient};
use orchestrator_models::{
    Account, AgentCatalog, AgentCategory, AgentDefinition, CacheBundle, CacheData, Message, Money, Principal, Role,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn principal() -> Principal {
    Principal {
        email: "alice@ex".to_string(),
        subject_id: "sub-1".to_string(),
        display_name: "Alice".to_string(),
        customer_id: "C001".to_string(),
    }
}

fn catalog() -> AgentCatalog {
    AgentCatalog::from_definitions(vec![
        AgentDefinition {
            name: "account".to_string(),
            base_url: "http://account:9001".to_string(),
            category: AgentCategory::Account,
            may_use_cache: true,
        },
        AgentDefinition {
            name: "transaction".to_string(),
            base_url: "http://t:9002".to_string(),
            category: AgentCategory::Transaction,
            may_use_cache: true,
        },
        AgentDefinition {
            name: "payment".to_string(),
            base_url: "http://payment:9000".to_string(),
            category: AgentCategory::Payment,
            may_use_cache: false,
        },
    ])
}

async fn router_with_cache_root(cache_root: &std::path::Path) -> SupervisorRouter {
    let audit = AuditLog::spawn(cache_root.join("audit").to_string_lossy().to_string());
    let data_services = DataServiceClient::new(
        "http://127.0.0.1:1/accounts",
        "http://127.0.0.1:1/transactions",
        "http://127.0.0.1:1/contacts",
        "http://127.0.0.1:1/limits",
    );
    let populator = Arc::new(CachePopulator::new(data_services, audit.clone()));
    let cache = Arc::new(CacheStore::new(cache_root, populator, audit.clone()));
    let escalation_pins = EscalationPinStore::default();
    let llm_classifier = LlmClassifier::new("", "");
    SupervisorRouter::new(catalog(), cache, escalation_pins, llm_classifier, audit)
}

fn write_valid_bundle(cache_root: &std::path::Path, customer_id: &str, balance: f64) {
    let bundle = CacheBundle {
        customer_id: customer_id.to_string(),
        created_at: Utc::now(),
        ttl_seconds: 300,
        data: CacheData {
            accounts: vec![Account {
                id: "A1".to_string(),
                number: "1234".to_string(),
                balance: Money { amount: balance, currency: "THB".to_string() },
                holder_name: "Alice".to_string(),
            }],
            primary_balance: Some(Money { amount: balance, currency: "THB".to_string() }),
            last_n_transactions: Vec::new(),
            beneficiaries: Vec::new(),
            limits: None,
        },
    };
    std::fs::create_dir_all(cache_root).unwrap();
    let path = cache_root.join(format!("{customer_id}.json"));
    std::fs::write(path, serde_json::to_vec_pretty(&bundle).unwrap()).unwrap();
}

#[tokio::test]
async fn balance_inquiry_short_circuits_from_a_valid_cache_bundle() {
    let dir = tempfile::tempdir().unwrap();
    write_valid_bundle(dir.path(), "C001", 113_400.0);

    let router = router_with_cache_root(dir.path()).await;
    let outcome = router.route("what is my balance?", &principal()).await;

    match outcome {
        RouterOutcome::CacheServe { response_text } => {
            assert!(response_text.contains("113,400.00 THB"), "got: {response_text}");
        }
        other => panic!("expected a cache-served response, got {other:?}"),
    }
}

#[tokio::test]
async fn write_intent_messages_never_short_circuit_even_with_a_valid_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_valid_bundle(dir.path(), "C001", 113_400.0);

    let router = router_with_cache_root(dir.path()).await;
    let outcome = router
        .route("please transfer payment to somchai using a wire transfer", &principal())
        .await;

    match outcome {
        RouterOutcome::Dispatch { agent_name, rewritten_message, .. } => {
            assert_eq!(agent_name, "payment");
            assert!(
                rewritten_message.starts_with("my username is alice@ex,"),
                "got: {rewritten_message}"
            );
        }
        other => panic!("expected a dispatch outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn keyword_classifier_routes_to_transactions_with_no_cache_present() {
    let dir = tempfile::tempdir().unwrap();

    let router = router_with_cache_root(dir.path()).await;
    let outcome = router.route("show me my recent transactions and transaction history", &principal()).await;

    match outcome {
        RouterOutcome::Dispatch { agent_name, agent_endpoint, .. } => {
            assert_eq!(agent_name, "transaction");
            assert_eq!(agent_endpoint, "http://t:9002");
        }
        other => panic!("expected a dispatch outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn dispatcher_invalidates_the_cache_on_a_write_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    write_valid_bundle(dir.path(), "C001", 113_400.0);

    let agent_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "TRANSFER COMPLETED; transaction_id=TXN-001",
            "thread_id": "thread_1",
        })))
        .mount(&agent_server)
        .await;

    let audit = AuditLog::spawn(dir.path().join("audit").to_string_lossy().to_string());
    let data_services = DataServiceClient::new("", "", "", "");
    let populator = Arc::new(CachePopulator::new(data_services, audit.clone()));
    let cache = Arc::new(CacheStore::new(dir.path(), populator, audit.clone()));
    assert!(cache.get("C001").await.is_some(), "bundle must be valid before invalidation");

    let escalation_pins = EscalationPinStore::default();
    let dispatcher = AgentDispatcher::new(AgentClient::new(), cache.clone(), escalation_pins, audit);

    let messages = vec![Message { role: Role::User, content: "transfer 300 to somchai".to_string() }];
    let response = dispatcher
        .dispatch(&agent_server.uri(), &messages, "thread_1", "C001", "alice@ex")
        .await
        .expect("agent responds successfully");

    assert!(response.response_text.contains("TRANSFER COMPLETED"));
    assert!(cache.get("C001").await.is_none(), "write sentinel must invalidate the cache before returning (I5)");
}
