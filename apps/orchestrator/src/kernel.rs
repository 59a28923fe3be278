use std::net::SocketAddr;

use tracing::{error, info, instrument};

use crate::config::OrchestratorConfig;
use crate::routes::create_router;
use crate::services::daemons::{spawn_cache_sweep_daemon, spawn_conversation_reaper_daemon};
use crate::state::AppState;

/// Composition root (§9): wires every component with explicit
/// constructor injection, spawns the background daemons, and serves
/// the HTTP router.
pub struct OrchestratorKernel {
    listen_addr: SocketAddr,
    state: AppState,
}

impl OrchestratorKernel {
    #[instrument(skip(config))]
    pub async fn ignite(config: &OrchestratorConfig) -> anyhow::Result<Self> {
        let listen_addr: SocketAddr = config.listen_addr.parse()?;
        let state = AppState::new(config).await?;
        Ok(Self { listen_addr, state })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        spawn_cache_sweep_daemon(self.state.cache.clone());
        spawn_conversation_reaper_daemon(self.state.conversations.clone());

        let router = create_router(self.state);

        info!(listen_addr = %self.listen_addr, "orchestrator listening");
        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;

        if let Err(err) = axum::serve(listener, router).await {
            error!(error = %err, "server terminated with an error");
            return Err(err.into());
        }

        Ok(())
    }
}
