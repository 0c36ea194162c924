//! 编排引擎事件模型
//!
//! 外部工作流引擎在一次运行中按顺序推送的生命周期事件。字段全部显式可选：
//! 缺失字段只会让对应的提取步骤产出空结果，不会报错。

use serde::{Deserialize, Deserializer, Serialize};

/// 事件种类（线上格式为引擎的类名字符串，未知名称原样保留）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// 通用生命周期事件，不携带有用细节
    Workflow,
    /// 终态输出事件：携带最终报告
    WorkflowOutput,
    WorkflowStarted,
    WorkflowStatus,
    /// 参与者流式增量更新
    AgentRunUpdate,
    /// 参与者完成一轮回复
    AgentRun,
    /// 编排者（Manager）发出的计划 / 指令
    OrchestratorMessage,
    Other(String),
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            EventKind::Workflow => "WorkflowEvent",
            EventKind::WorkflowOutput => "WorkflowOutputEvent",
            EventKind::WorkflowStarted => "WorkflowStartedEvent",
            EventKind::WorkflowStatus => "WorkflowStatusEvent",
            EventKind::AgentRunUpdate => "AgentRunUpdateEvent",
            EventKind::AgentRun => "AgentRunEvent",
            EventKind::OrchestratorMessage => "MagenticOrchestratorMessageEvent",
            EventKind::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "WorkflowEvent" => EventKind::Workflow,
            "WorkflowOutputEvent" => EventKind::WorkflowOutput,
            "WorkflowStartedEvent" => EventKind::WorkflowStarted,
            "WorkflowStatusEvent" => EventKind::WorkflowStatus,
            "AgentRunUpdateEvent" => EventKind::AgentRunUpdate,
            "AgentRunEvent" => EventKind::AgentRun,
            "MagenticOrchestratorMessageEvent" => EventKind::OrchestratorMessage,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// 是否为运行的终态输出
    pub fn is_output(&self) -> bool {
        matches!(self, EventKind::WorkflowOutput)
    }

    /// 不值得生成「processing」条目的两种事件
    pub fn is_quiet(&self) -> bool {
        matches!(self, EventKind::Workflow | EventKind::WorkflowOutput)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        EventKind::from_name(&name)
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.name().to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 参与者消息（text 优先于 content）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

/// 载荷：裸字符串或结构化消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Message(ChatMessage),
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Message(ChatMessage {
            text: Some(text.into()),
            ..Default::default()
        })
    }

    /// 第一个非空正文（text → content）
    pub fn body(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s.as_str()).filter(|s| !s.is_empty()),
            Payload::Message(m) => m
                .text
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| m.content.as_deref().filter(|s| !s.is_empty())),
        }
    }

    fn author(&self) -> Option<&str> {
        match self {
            Payload::Text(_) => None,
            Payload::Message(m) => m.author_name.as_deref(),
        }
    }
}

/// 单条编排事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// 载荷列表；线上可为单个对象或数组
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Payload>,
}

impl WorkflowEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            source: None,
            agent_name: None,
            data: Vec::new(),
            content: None,
            message: None,
        }
    }

    /// 终态输出事件（单条文本载荷）
    pub fn output(text: impl Into<String>) -> Self {
        Self::new(EventKind::WorkflowOutput).with_data(vec![Payload::text(text)])
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_agent(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: Vec<Payload>) -> Self {
        self.data = data;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.data.push(Payload::text(text));
        self
    }

    pub fn with_content(mut self, content: Payload) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_message(mut self, message: Payload) -> Self {
        self.message = Some(message);
        self
    }

    /// 显式的来源标识：source 优先，其次 agent_name
    pub fn origin(&self) -> Option<&str> {
        self.source.as_deref().or(self.agent_name.as_deref())
    }

    /// 按优先级取第一段非空正文：载荷列表 → content → message
    pub fn first_body(&self) -> Option<&str> {
        self.data
            .iter()
            .find_map(Payload::body)
            .or_else(|| self.content.as_ref().and_then(Payload::body))
            .or_else(|| self.message.as_ref().and_then(Payload::body))
    }

    /// 载荷列表中所有非空正文（输出事件用）
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.data.iter().filter_map(Payload::body)
    }

    /// 事件的文本指纹：种类、来源与全部正文拼接，用于角色关键词探测
    pub fn fingerprint(&self) -> String {
        let mut parts: Vec<&str> = vec![self.kind.name()];
        parts.extend(self.source.as_deref());
        parts.extend(self.agent_name.as_deref());
        for payload in self
            .data
            .iter()
            .chain(self.content.iter())
            .chain(self.message.iter())
        {
            parts.extend(payload.author());
            parts.extend(payload.body());
        }
        parts.join(" ")
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Payload>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Payload>),
        One(Payload),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}
