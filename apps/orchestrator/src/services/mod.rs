pub mod agent_dispatcher;
pub mod audit_log;
pub mod cache_populator;
pub mod cache_store;
pub mod conversation_state;
pub mod continuation_detector;
pub mod daemons;
pub mod llm_classifier;
pub mod principal_resolver;
pub mod stream_multiplexer;
pub mod supervisor_router;

pub use agent_dispatcher::AgentDispatcher;
pub use audit_log::AuditLog;
pub use cache_populator::CachePopulator;
pub use cache_store::CacheStore;
pub use conversation_state::ConversationStateManager;
pub use llm_classifier::LlmClassifier;
pub use principal_resolver::PrincipalResolver;
pub use supervisor_router::{EscalationPinStore, SupervisorRouter};
