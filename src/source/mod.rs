//! 事件源抽象
//!
//! 外部编排引擎通过 EventSource 接入：给定任务、各角色模型与最大轮数，返回按序推送的事件流，
//! 运行结束时流自然终止；运行中的失败以 `Err` 项上浮，而不是静默结束。

pub mod event;
pub mod http;
pub mod registry;
pub mod scripted;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::config::ModelsSection;
use crate::core::RunError;

pub use event::{ChatMessage, EventKind, Payload, WorkflowEvent};
pub use http::HttpSource;
pub use registry::{SourceFactory, SourceRegistry};
pub use scripted::ScriptedSource;

/// 一次运行的事件流
pub type EventStream = Pin<Box<dyn Stream<Item = Result<WorkflowEvent, RunError>> + Send>>;

/// 事件源 trait：每次 open 开启一次独立运行
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(
        &self,
        task: &str,
        models: &RoleModels,
        max_rounds: u32,
    ) -> Result<EventStream, RunError>;

    /// 用于日志
    fn name(&self) -> &str {
        "source"
    }
}

/// 各角色使用的模型标识（不透明字符串，原样透传给编排引擎）
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleModels {
    #[serde(default, rename = "researcher_model")]
    pub researcher: String,
    #[serde(default, rename = "coder_model")]
    pub coder: String,
    #[serde(default, rename = "manager_model")]
    pub manager: String,
    #[serde(default, rename = "reviewer_model")]
    pub reviewer: String,
}

impl RoleModels {
    /// 空字段用配置中的默认模型补齐
    pub fn with_defaults(&self, defaults: &ModelsSection) -> RoleModels {
        fn pick(value: &str, fallback: &str) -> String {
            let value = value.trim();
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }
        RoleModels {
            researcher: pick(&self.researcher, &defaults.researcher),
            coder: pick(&self.coder, &defaults.coder),
            manager: pick(&self.manager, &defaults.manager),
            reviewer: pick(&self.reviewer, &defaults.reviewer),
        }
    }
}
