//! 网关集成测试：事件源 → 分类 / 提取 → 响应 / 帧

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use magentic::activity::Role;
use magentic::source::{EventKind, EventSource, RoleModels, ScriptedSource, SourceRegistry, WorkflowEvent};
use magentic::{AppConfig, ExecutionGateway, RunError, StreamFrame, TaskRequest};

fn gateway_with(source: ScriptedSource) -> ExecutionGateway {
    let registry = SourceRegistry::shared(Arc::new(source));
    ExecutionGateway::new(Arc::new(registry), &AppConfig::default())
}

fn researcher_update(text: &str) -> WorkflowEvent {
    WorkflowEvent::new(EventKind::AgentRunUpdate)
        .from_source("ResearcherAgent")
        .with_text(text)
}

#[tokio::test]
async fn test_researcher_then_output_end_to_end() {
    let gw = gateway_with(ScriptedSource::new(vec![
        researcher_update("market share grew 12%"),
        WorkflowEvent::output("Final report"),
    ]));
    let resp = gw.execute(&TaskRequest::new("Analyze the AI chip market")).await;

    assert!(resp.is_success());
    assert_eq!(resp.result.as_deref(), Some("Final report"));
    let messages: Vec<&str> = resp.activity_log.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages[0],
        "🔍 Researcher Agent activated - Starting comprehensive information gathering"
    );
    assert_eq!(
        messages[1],
        "📚 Researcher completed Market Research:\n   market share grew 12%"
    );
    assert_eq!(
        messages[2],
        "📄 Final report compiled! Manager synthesized inputs from 1 agents"
    );
    assert_eq!(resp.activity_log[2].role, Role::Success);
    assert_eq!(
        messages[3],
        "📊 Collaboration Summary:\n   🔍 Researcher: 1 findings (market analysis)"
    );
    assert_eq!(messages.len(), 4);
}

#[tokio::test]
async fn test_cagr_estimate_run() {
    let gw = gateway_with(ScriptedSource::new(vec![
        researcher_update("according to industry data, the CAGR is 18%"),
        WorkflowEvent::output("Final CAGR estimate: 18%"),
    ]));
    let resp = gw.execute(&TaskRequest::new("Estimate the CAGR of the AI chip market")).await;

    assert!(resp.is_success());
    assert_eq!(resp.result.as_deref(), Some("Final CAGR estimate: 18%"));
    let messages: Vec<&str> = resp.activity_log.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "🔍 Researcher Agent activated - Starting comprehensive information gathering",
            "📚 Researcher completed Market Research:\n   according to industry data, the CAGR is 18%",
            // CAGR, 18%
            "🧮 Coder performed calculations:\n   Found 2 mathematical operations in analysis",
            "📄 Final report compiled! Manager synthesized inputs from 1 agents",
            "📊 Collaboration Summary:\n   🔍 Researcher: 1 findings (market analysis)",
        ]
    );
}

#[tokio::test]
async fn test_demo_run_covers_all_roles() {
    let gw = gateway_with(ScriptedSource::demo());
    let resp = gw.execute(&TaskRequest::new("demo")).await;
    assert!(resp.is_success());

    let activated: Vec<Role> = resp
        .activity_log
        .iter()
        .filter(|e| e.message.contains("activated") || e.message.contains("coordinating"))
        .map(|e| e.role)
        .collect();
    assert_eq!(
        activated,
        vec![Role::Coordinator, Role::Researcher, Role::Coder, Role::Reviewer]
    );
    assert!(resp
        .activity_log
        .iter()
        .any(|e| e.message.starts_with("🧮 Coder performing CAGR Calculation:\n   Code: python")));
    assert!(resp
        .activity_log
        .iter()
        .any(|e| e.message.starts_with("🔎 Reviewer providing critical feedback")));
}

#[tokio::test]
async fn test_midstream_failure_buffered() {
    let source = ScriptedSource::new(vec![researcher_update("industry notes")]).failing_after("participant crashed");
    let resp = gateway_with(source).execute(&TaskRequest::new("t")).await;
    assert!(!resp.is_success());
    assert!(resp.result.is_none());
    assert!(resp.activity_log.is_empty());
    assert_eq!(
        resp.error.as_deref(),
        Some("Orchestrator failure: participant crashed")
    );
}

#[tokio::test]
async fn test_stream_order_and_single_done() {
    let gw = gateway_with(ScriptedSource::new(vec![
        WorkflowEvent::new(EventKind::WorkflowStarted),
        researcher_update("notes"),
        WorkflowEvent::output("part one").with_text("part two"),
    ]));
    let frames: Vec<StreamFrame> = gw.execute_stream(&TaskRequest::new("t")).collect().await;
    assert_eq!(
        frames,
        vec![
            StreamFrame::Event { name: "WorkflowStartedEvent".into() },
            StreamFrame::Event { name: "AgentRunUpdateEvent".into() },
            StreamFrame::Result { content: "part one".into() },
            StreamFrame::Result { content: "part two".into() },
            StreamFrame::Done,
        ]
    );
}

#[tokio::test]
async fn test_stream_failure_single_error_frame() {
    let source = ScriptedSource::new(vec![WorkflowEvent::new(EventKind::WorkflowStarted)]).failing_after("boom");
    let frames: Vec<StreamFrame> = gateway_with(source)
        .execute_stream(&TaskRequest::new("t"))
        .collect()
        .await;
    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[1], StreamFrame::Error { ref message } if message.contains("boom")));
    assert_eq!(frames.iter().filter(|f| f.is_terminal()).count(), 1);

    let source = ScriptedSource::new(Vec::new()).failing_on_open("unauthorized");
    let frames: Vec<StreamFrame> = gateway_with(source)
        .execute_stream(&TaskRequest::new("t"))
        .collect()
        .await;
    assert_eq!(frames.len(), 1);
    assert!(matches!(frames[0], StreamFrame::Error { .. }));
}

#[tokio::test]
async fn test_dropping_frame_stream_closes_source() {
    let events: Vec<WorkflowEvent> = (0..10)
        .map(|_| WorkflowEvent::new(EventKind::WorkflowStatus))
        .collect();
    let source = ScriptedSource::new(events).with_delay(Duration::from_millis(10));
    let handle = source.clone();
    let gw = gateway_with(source);

    let mut frames = gw.execute_stream(&TaskRequest::new("long running"));
    for _ in 0..2 {
        let frame = frames.next().await.unwrap();
        assert!(matches!(frame, StreamFrame::Event { .. }));
    }
    assert_eq!(handle.open_count(), 1);
    assert!(!handle.is_closed());

    drop(frames);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_sources_reused_per_model_set() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let registry = SourceRegistry::new(Arc::new(move |_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedSource::new(vec![WorkflowEvent::output("ok")])))
    }));
    let gw = ExecutionGateway::new(Arc::new(registry), &AppConfig::default());

    // 空字段补齐为默认模型，与显式写出默认模型等价
    gw.execute(&TaskRequest::new("a")).await;
    let explicit = RoleModels {
        researcher: "gpt-4o".into(),
        ..Default::default()
    };
    gw.execute(&TaskRequest::new("b").with_models(explicit)).await;
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let mini = RoleModels {
        coder: "gpt-4o-mini".into(),
        ..Default::default()
    };
    gw.execute(&TaskRequest::new("c").with_models(mini)).await;
    assert_eq!(built.load(Ordering::SeqCst), 2);
    assert_eq!(gw.sources().len().await, 2);
}
