//! 执行网关
//!
//! 一次运行 = 一个事件流 + 一个 SessionState，由单一异步控制流消费：
//! - 缓冲模式：逐事件分类、提取结果，结束时附加协作汇总，始终返回完整响应
//! - 流式模式：按到达顺序转发帧，不做分类；丢弃帧流即取消底层事件流

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{stream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::message::{StreamFrame, TaskRequest, TaskResponse};
use crate::activity::{collaboration_summary, ActivityEntry, Classifier, ResultExtractor, SessionState};
use crate::config::{AppConfig, ModelsSection};
use crate::core::RunError;
use crate::source::{EventStream, RoleModels, SourceRegistry, WorkflowEvent};

/// 运行正常结束但没有产出报告时的结果文本
pub const NO_OUTPUT_RESULT: &str = "Task completed but no output generated.";

/// 服务关闭时中断流式运行的错误帧文本
pub const SHUTDOWN_MESSAGE: &str = "server shutting down";

/// 流式帧序列
pub type FrameStream = Pin<Box<dyn Stream<Item = StreamFrame> + Send>>;

/// 缓冲运行的产出
#[derive(Debug, Default)]
struct RunOutcome {
    result: Option<String>,
    activity_log: Vec<ActivityEntry>,
}

pub struct ExecutionGateway {
    sources: Arc<SourceRegistry>,
    classifier: Classifier,
    extractor: ResultExtractor,
    default_models: ModelsSection,
    default_max_rounds: u32,
}

impl ExecutionGateway {
    pub fn new(sources: Arc<SourceRegistry>, config: &AppConfig) -> Self {
        Self {
            sources,
            classifier: Classifier::new(&config.activity),
            extractor: ResultExtractor::new(),
            default_models: config.models.clone(),
            default_max_rounds: config.orchestrator.default_max_rounds,
        }
    }

    /// 按配置选择事件源（sidecar 或内置演示脚本）
    pub fn from_config(config: &AppConfig) -> Self {
        let sources = Arc::new(SourceRegistry::from_config(&config.orchestrator));
        Self::new(sources, config)
    }

    pub fn sources(&self) -> &Arc<SourceRegistry> {
        &self.sources
    }

    fn resolve(&self, request: &TaskRequest) -> (RoleModels, u32) {
        let models = request.models.with_defaults(&self.default_models);
        let max_rounds = request.max_rounds.unwrap_or(self.default_max_rounds);
        (models, max_rounds)
    }

    /// 缓冲执行：失败时返回 status=error 且活动日志为空
    pub async fn execute(&self, request: &TaskRequest) -> TaskResponse {
        match self.run(request).await {
            Ok(outcome) => {
                let result = outcome
                    .result
                    .unwrap_or_else(|| NO_OUTPUT_RESULT.to_string());
                TaskResponse::success(result, outcome.activity_log)
            }
            Err(e) => TaskResponse::failure(e.to_string()),
        }
    }

    /// 只要最终报告文本（默认模型），用于聊天式接口
    pub async fn run_to_text(&self, task: &str) -> Result<String, RunError> {
        let outcome = self.run(&TaskRequest::new(task)).await?;
        Ok(outcome.result.unwrap_or_else(|| NO_OUTPUT_RESULT.to_string()))
    }

    async fn run(&self, request: &TaskRequest) -> Result<RunOutcome, RunError> {
        let (models, max_rounds) = self.resolve(request);
        let mut state = SessionState::new();
        tracing::info!(
            run_id = %state.run_id(),
            "Executing task with models - Researcher: {}, Coder: {}, Reviewer: {}, Manager: {}",
            models.researcher,
            models.coder,
            models.reviewer,
            models.manager
        );

        match self.drive(request, &models, max_rounds, &mut state).await {
            Ok(outcome) => {
                if outcome.result.is_none() {
                    tracing::warn!(run_id = %state.run_id(), "run finished without output");
                }
                tracing::info!(
                    run_id = %state.run_id(),
                    events = state.event_count(),
                    entries = outcome.activity_log.len(),
                    "Task completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(run_id = %state.run_id(), "Task failed: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        request: &TaskRequest,
        models: &RoleModels,
        max_rounds: u32,
        state: &mut SessionState,
    ) -> Result<RunOutcome, RunError> {
        let source = self.sources.get_or_create(models).await?;
        let mut events = source.open(&request.task, models, max_rounds).await?;

        let mut outcome = RunOutcome::default();
        while let Some(event) = events.next().await {
            let event = event?;
            let count = state.record_event();
            tracing::debug!(run_id = %state.run_id(), count, kind = %event.kind, "event received");

            let entries = self.classifier.classify(&event, state);
            if !entries.is_empty() {
                tracing::debug!(run_id = %state.run_id(), count = entries.len(), "classified into activity entries");
            }
            outcome.activity_log.extend(entries);

            if let Some(extraction) = self.extractor.extract(&event, state) {
                if extraction.result.is_some() {
                    outcome.result = extraction.result;
                }
                outcome.activity_log.extend(extraction.entries);
            }
        }

        outcome.activity_log.extend(collaboration_summary(state));
        Ok(outcome)
    }

    /// 流式执行：事件帧 → 结果帧 → 恰好一个 done / error
    pub fn execute_stream(&self, request: &TaskRequest) -> FrameStream {
        let (models, max_rounds) = self.resolve(request);
        let run = StreamRun {
            run_id: uuid::Uuid::new_v4().to_string(),
            phase: StreamPhase::Opening {
                sources: Arc::clone(&self.sources),
                task: request.task.clone(),
                models,
                max_rounds,
            },
            pending: VecDeque::new(),
        };
        tracing::info!(run_id = %run.run_id, "Streaming task execution");

        let frames = stream::unfold(run, |mut run| async move {
            loop {
                if let Some(frame) = run.pending.pop_front() {
                    return Some((frame, run));
                }
                let phase = std::mem::replace(&mut run.phase, StreamPhase::Finished);
                run.phase = match phase {
                    StreamPhase::Opening {
                        sources,
                        task,
                        models,
                        max_rounds,
                    } => match open_stream(&sources, &task, &models, max_rounds).await {
                        Ok(events) => StreamPhase::Running(events),
                        Err(e) => run.fail(e),
                    },
                    StreamPhase::Running(mut events) => match events.next().await {
                        Some(Ok(event)) => {
                            run.pending.extend(frames_for(&event));
                            StreamPhase::Running(events)
                        }
                        Some(Err(e)) => run.fail(e),
                        None => {
                            tracing::info!(run_id = %run.run_id, "Streaming task completed");
                            run.pending.push_back(StreamFrame::Done);
                            StreamPhase::Finished
                        }
                    },
                    StreamPhase::Finished => return None,
                };
            }
        });
        Box::pin(frames)
    }
}

enum StreamPhase {
    Opening {
        sources: Arc<SourceRegistry>,
        task: String,
        models: RoleModels,
        max_rounds: u32,
    },
    Running(EventStream),
    Finished,
}

struct StreamRun {
    run_id: String,
    phase: StreamPhase,
    pending: VecDeque<StreamFrame>,
}

impl StreamRun {
    fn fail(&mut self, e: RunError) -> StreamPhase {
        tracing::error!(run_id = %self.run_id, "Streaming task failed: {}", e);
        self.pending.push_back(StreamFrame::Error {
            message: e.to_string(),
        });
        StreamPhase::Finished
    }
}

async fn open_stream(
    sources: &SourceRegistry,
    task: &str,
    models: &RoleModels,
    max_rounds: u32,
) -> Result<EventStream, RunError> {
    let source = sources.get_or_create(models).await?;
    source.open(task, models, max_rounds).await
}

/// 输出事件拆成每段正文一帧；其它事件只转发名称
fn frames_for(event: &WorkflowEvent) -> Vec<StreamFrame> {
    if event.kind.is_output() {
        event
            .bodies()
            .map(|body| StreamFrame::Result {
                content: body.to_string(),
            })
            .collect()
    } else {
        vec![StreamFrame::Event {
            name: event.kind.name().to_string(),
        }]
    }
}

/// token 取消时以一个 error 帧结束流并释放底层事件流；已发出终止帧的流不受影响
pub fn until_shutdown(frames: FrameStream, token: CancellationToken) -> FrameStream {
    let guarded = stream::unfold(Some((frames, token)), |state| async move {
        let (mut frames, token) = state?;
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("Streaming task interrupted by shutdown");
                Some((
                    StreamFrame::Error {
                        message: SHUTDOWN_MESSAGE.to_string(),
                    },
                    None,
                ))
            }
            frame = frames.next() => frame.map(|frame| {
                let next = if frame.is_terminal() { None } else { Some((frames, token)) };
                (frame, next)
            }),
        }
    });
    Box::pin(guarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Role;
    use crate::source::{EventKind, ScriptedSource};
    use std::time::Duration;

    fn gateway(source: ScriptedSource) -> ExecutionGateway {
        let registry = SourceRegistry::shared(Arc::new(source));
        ExecutionGateway::new(Arc::new(registry), &AppConfig::default())
    }

    #[tokio::test]
    async fn test_no_output_fallback() {
        let gw = gateway(ScriptedSource::new(vec![WorkflowEvent::new(EventKind::WorkflowStarted)]));
        let resp = gw.execute(&TaskRequest::new("anything")).await;
        assert!(resp.is_success());
        assert_eq!(resp.result.as_deref(), Some(NO_OUTPUT_RESULT));
        assert!(resp.activity_log.is_empty());
    }

    #[tokio::test]
    async fn test_failure_discards_partial_log() {
        let source = ScriptedSource::new(vec![WorkflowEvent::new(EventKind::AgentRunUpdate)
            .from_source("ResearcherAgent")
            .with_text("market notes")])
        .failing_after("quota exceeded");
        let resp = gateway(source).execute(&TaskRequest::new("t")).await;
        assert!(!resp.is_success());
        assert!(resp.activity_log.is_empty());
        assert!(resp.error.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_summary_closes_log() {
        let resp = gateway(ScriptedSource::demo()).execute(&TaskRequest::new("demo")).await;
        let last = resp.activity_log.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.message.starts_with("📊 Collaboration Summary:"));
    }

    #[tokio::test]
    async fn test_run_to_text() {
        let gw = gateway(ScriptedSource::new(vec![WorkflowEvent::output("42")]));
        assert_eq!(gw.run_to_text("what is 6 x 7").await.unwrap(), "42");

        let gw = gateway(ScriptedSource::new(Vec::new()).failing_on_open("no credentials"));
        assert!(matches!(gw.run_to_text("x").await, Err(RunError::Adapter(_))));
    }

    #[test]
    fn test_frames_for_output_skips_empty_bodies() {
        let event = WorkflowEvent::output("a").with_text("").with_text("b");
        let frames = frames_for(&event);
        assert_eq!(
            frames,
            vec![
                StreamFrame::Result { content: "a".into() },
                StreamFrame::Result { content: "b".into() },
            ]
        );
        assert!(frames_for(&WorkflowEvent::new(EventKind::WorkflowOutput)).is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_ends_open_stream_with_error() {
        let events = (0..10).map(|_| WorkflowEvent::new(EventKind::WorkflowStatus)).collect();
        let source = ScriptedSource::new(events).with_delay(Duration::from_millis(10));
        let handle = source.clone();
        let gw = gateway(source);
        let token = CancellationToken::new();

        let mut frames = until_shutdown(gw.execute_stream(&TaskRequest::new("t")), token.clone());
        assert!(matches!(frames.next().await, Some(StreamFrame::Event { .. })));
        token.cancel();

        let rest: Vec<StreamFrame> = frames.collect().await;
        assert_eq!(
            rest,
            vec![StreamFrame::Error {
                message: SHUTDOWN_MESSAGE.to_string()
            }]
        );
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_finished_stream_ignores_shutdown() {
        let gw = gateway(ScriptedSource::new(vec![WorkflowEvent::output("report")]));
        let token = CancellationToken::new();
        let frames: Vec<StreamFrame> =
            until_shutdown(gw.execute_stream(&TaskRequest::new("t")), token.clone())
                .collect()
                .await;
        token.cancel();
        assert_eq!(
            frames,
            vec![
                StreamFrame::Result { content: "report".into() },
                StreamFrame::Done
            ]
        );
    }
}
