//! 网关消息协议定义
//!
//! 请求 / 缓冲响应 / 流式帧三种线上格式，HTTP 层与 CLI 共用。

use serde::{Deserialize, Serialize};

use crate::activity::ActivityEntry;
use crate::source::RoleModels;

/// 任务请求；模型字段为空时使用配置中的默认模型
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(flatten)]
    pub models: RoleModels,
}

impl TaskRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn with_models(mut self, models: RoleModels) -> Self {
        self.models = models;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// 缓冲模式的完整响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
}

impl TaskResponse {
    pub fn success(result: impl Into<String>, activity_log: Vec<ActivityEntry>) -> Self {
        Self {
            status: RunStatus::Success,
            result: Some(result.into()),
            error: None,
            activity_log,
        }
    }

    /// 失败时不返回部分活动日志
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error,
            result: None,
            error: Some(error.into()),
            activity_log: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// 流式模式的单帧
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// 非输出事件：只转发事件名
    Event { name: String },
    /// 输出事件的一段正文
    Result { content: String },
    /// 正常结束
    Done,
    /// 失败结束
    Error { message: String },
}

impl StreamFrame {
    /// 是否为终止帧
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::Done | StreamFrame::Error { .. })
    }
}
