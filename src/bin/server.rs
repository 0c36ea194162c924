//! magentic-server：HTTP 服务入口
//!
//! 配置来自 config/default.toml 与 MAGENTIC__* 环境变量；可用第一个命令行参数指定额外配置文件。

use std::sync::Arc;

use anyhow::Context;
use magentic::{
    core::ShutdownManager,
    load_config, observability,
    web::{router, AppState},
    ExecutionGateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let gateway = ExecutionGateway::from_config(&cfg);
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let app = router(AppState::new(gateway, cfg, shutdown.token()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Magentic backend listening on http://{}", addr);
    tracing::info!("  POST /api/execute         (buffered, with activity log)");
    tracing::info!("  POST /api/execute-stream  (server-sent events)");
    tracing::info!("  POST /copilotkit          (chat-style integration)");

    let waiter = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { waiter.wait_for_shutdown().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
