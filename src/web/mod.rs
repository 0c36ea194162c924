//! HTTP 接口（feature = "web"）
//!
//! - GET  /                    服务信息
//! - GET  /api/health          健康检查（含已缓存事件源数）
//! - GET  /api/models          可选模型目录
//! - GET  /api/examples        示例任务
//! - POST /api/execute         缓冲执行，返回完整活动日志
//! - POST /api/execute-stream  SSE 流式执行
//! - POST /copilotkit          聊天式兼容接口

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::activity::Role;
use crate::config::AppConfig;
use crate::gateway::{until_shutdown, ExecutionGateway, TaskRequest, TaskResponse};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ExecutionGateway>,
    pub config: Arc<AppConfig>,
    /// 服务关闭时取消，进行中的 SSE 流以 error 帧结束
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(gateway: ExecutionGateway, config: AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            gateway: Arc::new(gateway),
            config: Arc::new(config),
            shutdown,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/models", get(models))
        .route("/api/examples", get(examples))
        .route("/api/execute", post(execute))
        .route("/api/execute-stream", post(execute_stream))
        .route("/copilotkit", post(copilotkit))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn index() -> Json<serde_json::Value> {
    let participants: Vec<&str> = Role::PARTICIPANTS.iter().map(|r| r.display_name()).collect();
    Json(serde_json::json!({
        "status": "running",
        "service": "Magentic Multi-Agent Backend",
        "agents": participants,
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "sources_cached": state.gateway.sources().len().await,
    }))
}

async fn models(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "models": state.config.models.catalogue }))
}

async fn examples(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "examples": state.config.examples }))
}

/// POST /api/execute：任务文本原样交给编排器；编排失败也返回 200，status 字段为 error
async fn execute(State(state): State<AppState>, Json(req): Json<TaskRequest>) -> Json<TaskResponse> {
    Json(state.gateway.execute(&req).await)
}

/// POST /api/execute-stream：每帧一行 `data:` JSON，客户端断开或服务关闭即取消运行
async fn execute_stream(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let frames = until_shutdown(state.gateway.execute_stream(&req), state.shutdown.clone())
        .map(|frame| Event::default().json_data(frame));
    Sse::new(frames).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    )
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

/// POST /copilotkit：取最后一条消息作为任务，回复一条 assistant 消息
async fn copilotkit(State(state): State<AppState>, Json(req): Json<ChatPayload>) -> Json<ChatPayload> {
    let task = match req.messages.last().map(|m| m.content.trim()) {
        Some(task) if !task.is_empty() => task.to_string(),
        _ => return Json(ChatPayload::default()),
    };

    let content = match state.gateway.run_to_text(&task).await {
        Ok(text) => text,
        Err(e) => format!("Error executing task: {}", e),
    };
    Json(ChatPayload {
        messages: vec![ChatMessage {
            role: "assistant".to_string(),
            content,
        }],
    })
}
