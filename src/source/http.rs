//! HTTP 事件源：连接运行编排引擎的 sidecar 进程
//!
//! `POST {base_url}/run`，请求体为任务与各角色模型，响应体为 NDJSON（每行一个 WorkflowEvent）。
//! `{"kind": "error", "message": ...}` 行或非 2xx 状态视为编排失败。

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{stream, Stream, StreamExt};

use super::{EventKind, EventSource, EventStream, RoleModels, WorkflowEvent};
use crate::config::OrchestratorSection;
use crate::core::RunError;

/// sidecar 客户端
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    max_stall_count: u32,
    max_reset_count: u32,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, settings: &OrchestratorSection) -> Result<Self, RunError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_stall_count: settings.max_stall_count,
            max_reset_count: settings.max_reset_count,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EventSource for HttpSource {
    async fn open(
        &self,
        task: &str,
        models: &RoleModels,
        max_rounds: u32,
    ) -> Result<EventStream, RunError> {
        let url = format!("{}/run", self.base_url);
        let body = serde_json::json!({
            "task": task,
            "max_rounds": max_rounds,
            "max_stall_count": self.max_stall_count,
            "max_reset_count": self.max_reset_count,
            "models": {
                "researcher": models.researcher,
                "coder": models.coder,
                "manager": models.manager,
                "reviewer": models.reviewer,
            },
        });

        tracing::debug!("opening orchestrator run at {}", url);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(RunError::Adapter(format!("orchestrator returned {}: {}", status, detail)));
        }
        Ok(ndjson_events(resp.bytes_stream()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

struct LineReader<S> {
    inner: Pin<Box<S>>,
    buf: BytesMut,
    eof: bool,
    failed: bool,
}

/// 将字节块流切分为 NDJSON 行并逐行解码为事件
pub fn ndjson_events<S, E>(chunks: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let reader = LineReader {
        inner: Box::pin(chunks),
        buf: BytesMut::new(),
        eof: false,
        failed: false,
    };

    let events = stream::unfold(reader, |mut reader| async move {
        loop {
            if reader.failed {
                return None;
            }
            if let Some(pos) = reader.buf.iter().position(|b| *b == b'\n') {
                let line = reader.buf.split_to(pos + 1);
                match decode_line(&line) {
                    Some(item) => {
                        reader.failed = item.is_err();
                        return Some((item, reader));
                    }
                    None => continue,
                }
            }
            if reader.eof {
                if reader.buf.is_empty() {
                    return None;
                }
                let line = reader.buf.split();
                match decode_line(&line) {
                    Some(item) => {
                        reader.failed = item.is_err();
                        return Some((item, reader));
                    }
                    None => return None,
                }
            }
            match reader.inner.next().await {
                Some(Ok(chunk)) => reader.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    reader.failed = true;
                    return Some((Err(RunError::Transport(e.to_string())), reader));
                }
                None => reader.eof = true,
            }
        }
    });
    Box::pin(events)
}

/// 空行与字段不合法的事件返回 None；只有非 JSON 行才是协议错误
fn decode_line(line: &[u8]) -> Option<Result<WorkflowEvent, RunError>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return Some(Err(RunError::Protocol(e.to_string()))),
    };
    let event = match serde_json::from_value::<WorkflowEvent>(value) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("skipping malformed event: {}", e);
            return None;
        }
    };
    if event.kind == EventKind::Other("error".to_string()) {
        let message = event
            .first_body()
            .unwrap_or("orchestrator reported an error")
            .to_string();
        return Some(Err(RunError::Adapter(message)));
    }
    Some(Ok(event))
}
