//! HTTP adapters for everything the orchestration core treats as a
//! black-box collaborator: the data services (§6.4), specialist agents
//! (§6.3), and the identity provider's JWKS endpoint (§4.1).

pub mod agents;
pub mod data_services;
pub mod errors;
pub mod identity;

pub use agents::{AgentClient, AgentInvocationResponse};
pub use data_services::DataServiceClient;
pub use errors::DownstreamError;
pub use identity::IdentityProviderClient;
