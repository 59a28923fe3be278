//! Shared domain types for the orchestration core.
//!
//! Every type here is a plain data holder owned by exactly one
//! component, per the ownership summary in the spec: the cache store
//! owns `CacheBundle`, the state manager owns `ConversationEntry`, the
//! principal resolver produces request-scoped `Principal` values.

pub mod agent;
pub mod audit;
pub mod cache;
pub mod conversation;
pub mod customer_directory;
pub mod error;
pub mod message;
pub mod principal;

pub use agent::{AgentCatalog, AgentCatalogFile, AgentCategory, AgentDefinition};
pub use audit::{AuditRecord, EventType};
pub use cache::{Account, Beneficiary, CacheBundle, CacheData, LimitInfo, Money, Transaction};
pub use conversation::ConversationEntry;
pub use customer_directory::{CustomerDirectory, CustomerRecord};
pub use error::OrchestratorError;
pub use message::{ConversationRequest, Message, Role};
pub use principal::Principal;
