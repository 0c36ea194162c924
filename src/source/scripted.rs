//! 脚本化事件源（用于测试与离线演示，无需编排引擎）
//!
//! 按顺序回放一组预置事件，可在末尾注入失败；流被丢弃或结束时置位 closed 标志。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;

use super::{EventSource, EventStream, Payload, RoleModels, WorkflowEvent};
use super::event::{ChatMessage, EventKind};
use crate::core::RunError;

#[derive(Debug, Clone)]
enum ScriptStep {
    Emit(WorkflowEvent),
    Fail(String),
}

/// 回放预置事件的事件源
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    delay: Option<Duration>,
    open_error: Option<String>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

/// 随流一起被持有，流释放时置位
struct CloseSignal(Arc<AtomicBool>);

impl Drop for CloseSignal {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new(events: Vec<WorkflowEvent>) -> Self {
        Self {
            steps: events.into_iter().map(ScriptStep::Emit).collect(),
            delay: None,
            open_error: None,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 回放完所有事件后以错误结束
    pub fn failing_after(mut self, message: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Fail(message.into()));
        self
    }

    /// open 本身即失败（模拟连接 / 鉴权错误）
    pub fn failing_on_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// 每个事件之前的等待
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 最近一次打开的流是否已被释放
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// open 被调用的次数
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// 演示脚本：Manager 规划 → Researcher 调研 → Coder 计算 → Reviewer 审查 → 最终报告
    pub fn demo() -> Self {
        let agent_update = |source: &str, text: &str| {
            WorkflowEvent::new(EventKind::AgentRunUpdate)
                .from_source(source)
                .with_data(vec![Payload::Message(ChatMessage {
                    text: Some(text.to_string()),
                    content: None,
                    author_name: Some(source.to_string()),
                })])
        };

        Self::new(vec![
            WorkflowEvent::new(EventKind::WorkflowStarted),
            WorkflowEvent::new(EventKind::OrchestratorMessage)
                .from_source("magentic_orchestrator")
                .with_message(Payload::Text(
                    "Plan: research the market, compute the figures, review the draft.".into(),
                )),
            agent_update(
                "ResearcherAgent",
                "Key findings:\n- The AI chip market reached $20B in 2020\n- Industry analysts project $120B by 2025\n- Data center accelerators are the fastest growing segment",
            ),
            WorkflowEvent::new(EventKind::AgentRun).from_source("ResearcherAgent"),
            agent_update(
                "CoderAgent",
                "```python\ncagr = (120 / 20) ** (1 / 5) - 1\nprint(round(cagr * 100, 1))\n```\nCAGR = 43.1%",
            ),
            WorkflowEvent::new(EventKind::AgentRun).from_source("CoderAgent"),
            agent_update(
                "ReviewerAgent",
                "The growth figure is consistent. However, the 2025 projection is an assumption; recommend citing the source.",
            ),
            WorkflowEvent::new(EventKind::Workflow),
            WorkflowEvent::output(
                "AI chip market report\n\nAccording to industry data the market grows from $20B (2020) to $120B (2025), a CAGR of 43.1%. Data center accelerators lead growth.",
            ),
        ])
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn open(
        &self,
        task: &str,
        _models: &RoleModels,
        _max_rounds: u32,
    ) -> Result<EventStream, RunError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.open_error {
            return Err(RunError::Adapter(message.clone()));
        }
        tracing::debug!("scripted source replaying {} steps for task: {}", self.steps.len(), task);

        self.closed.store(false, Ordering::SeqCst);
        let steps: VecDeque<ScriptStep> = self.steps.iter().cloned().collect();
        let signal = CloseSignal(Arc::clone(&self.closed));
        let delay = self.delay;

        let stream = stream::unfold((steps, signal), move |(mut steps, signal)| async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match steps.pop_front()? {
                ScriptStep::Emit(event) => Some((Ok(event), (steps, signal))),
                ScriptStep::Fail(message) => {
                    steps.clear();
                    Some((Err(RunError::Adapter(message)), (steps, signal)))
                }
            }
        });
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
