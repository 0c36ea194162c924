//! magentic-demo：命令行运行任务并打印活动日志
//!
//! `magentic-demo "Calculate ROI for ..."` 运行单个任务；不带参数时依次运行配置中的示例任务。
//! 未配置 orchestrator.base_url 时回放内置演示脚本。

use anyhow::Context;
use magentic::{load_config, observability, ExecutionGateway, TaskRequest, TaskResponse};

fn print_response(title: &str, resp: &TaskResponse) {
    println!("{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));
    if let Some(ref error) = resp.error {
        println!("❌ {}", error);
        return;
    }
    println!("\n📋 Agent activity ({} entries):\n", resp.activity_log.len());
    for entry in &resp.activity_log {
        println!("[{}] {}", entry.role, entry.message);
    }
    if let Some(ref result) = resp.result {
        println!("\n📄 Result:\n{}\n", result);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let gateway = ExecutionGateway::from_config(&cfg);

    let task: Vec<String> = std::env::args().skip(1).collect();
    if !task.is_empty() {
        let task = task.join(" ");
        let resp = gateway.execute(&TaskRequest::new(task.clone())).await;
        print_response(&task, &resp);
        return Ok(());
    }

    for example in &cfg.examples {
        let resp = gateway.execute(&TaskRequest::new(example.task.clone())).await;
        print_response(&example.title, &resp);
    }
    Ok(())
}
