use std::sync::Arc;

use gatehouse_api::app::{build_app, AppServices, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let config = Config::from_env();
    let services = Arc::new(AppServices::from_config(&config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
