use conversational_orchestrator::prelude::{OrchestratorConfig, OrchestratorKernel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    orchestrator_telemetry::init_tracing("orchestrator");

    let config = OrchestratorConfig::from_env();
    let kernel = OrchestratorKernel::ignite(&config).await?;
    kernel.run().await
}
