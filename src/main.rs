use todo_api::application::todo_service::TodoServiceImpl;
use todo_api::config::AppConfig;
use todo_api::domain::repository::TodoRepository;
use todo_api::http::routing::{self, todos};
use todo_api::infrastructure::sqlite_repo::SqliteTodoRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    todo_api::telemetry::init();

    let repo = SqliteTodoRepository::connect_with(&config.database_url, config.max_connections, config.request_timeout).await?;
    repo.init().await?;
    let service = TodoServiceImpl::new(repo).with_page_limits(config.page_limits);
    let todos_router = todos::router(todos::AppState { service, request_timeout: config.request_timeout });
    let router = routing::app(todos_router);

    tracing::info!(addr = %config.addr, database_url = %config.database_url, "listening");
    axum::serve(tokio::net::TcpListener::bind(config.addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
