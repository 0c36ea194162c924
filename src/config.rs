//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAGENTIC__*` 覆盖（双下划线表示嵌套，如 `MAGENTIC__SERVER__PORT=9000`）。
//! 每个字段都有默认值，没有配置文件也能启动（此时事件源回放内置演示脚本）。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub orchestrator: OrchestratorSection,
    pub models: ModelsSection,
    pub activity: ActivitySection,
    /// 前端展示的示例任务
    pub examples: Vec<ExampleTask>,
}

/// [server] 段：监听地址与 CORS 白名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// [orchestrator] 段：外部编排引擎
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// sidecar 地址；未设置时回放内置演示脚本
    pub base_url: Option<String>,
    /// 单次运行（含完整事件流）的超时（秒）
    pub request_timeout_secs: u64,
    pub max_stall_count: u32,
    pub max_reset_count: u32,
    /// 请求未指定 max_rounds 时使用
    pub default_max_rounds: u32,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 600,
            max_stall_count: 5,
            max_reset_count: 3,
            default_max_rounds: 20,
        }
    }
}

/// [models] 段：各角色默认模型与可选模型目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    pub researcher: String,
    pub coder: String,
    pub manager: String,
    pub reviewer: String,
    pub catalogue: Vec<ModelInfo>,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            researcher: default_model(),
            coder: default_model(),
            manager: default_model(),
            reviewer: default_model(),
            catalogue: vec![
                ModelInfo::new("gpt-4o", "GPT-4o (Recommended)", "Most capable, best for complex analysis"),
                ModelInfo::new("gpt-4o-mini", "GPT-4o Mini", "Fast and cost-effective"),
                ModelInfo::new("gpt-4", "GPT-4 Turbo", "Previous generation, reliable"),
                ModelInfo::new("gpt-35-turbo", "GPT-3.5 Turbo", "Fast, good for simple tasks"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ModelInfo {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// [activity] 段：活动日志参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActivitySection {
    /// 里程碑检查点（事件计数）
    pub milestones: Vec<u64>,
    /// 消息预览截取的字符数
    pub preview_chars: usize,
}

impl Default for ActivitySection {
    fn default() -> Self {
        Self {
            milestones: vec![10, 20, 30, 40],
            preview_chars: 300,
        }
    }
}

/// [[examples]]：示例任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub task: String,
}

impl ExampleTask {
    fn new(title: &str, description: &str, task: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            task: task.to_string(),
        }
    }
}

fn default_examples() -> Vec<ExampleTask> {
    vec![
        ExampleTask::new(
            "ML Model Energy Analysis",
            "Compare energy efficiency of ML models",
            "Compare the estimated training and inference energy consumption of ResNet-50, BERT-base, and GPT-2. Include CO2 emissions for 24 hours on Azure Standard_NC6s_v3 VM.",
        ),
        ExampleTask::new(
            "Market Research",
            "Analyze AI chip market trends",
            "Analyze the current state of the AI chip market. Include top 3 companies, calculate CAGR from $20B (2020) to $120B (2025), and identify fastest growing segment.",
        ),
        ExampleTask::new(
            "Financial Analysis",
            "Calculate ROI for a project",
            "Calculate ROI for an AI project with $500K initial investment, $150K annual savings, 5-year lifespan. Calculate payback period, ROI%, and NPV (8% discount rate).",
        ),
        ExampleTask::new(
            "Technical Comparison",
            "Compare cloud platforms",
            "Compare AWS, Azure, and Google Cloud in terms of AI/ML capabilities, pricing for GPU instances, and market positioning in 2025.",
        ),
        ExampleTask::new(
            "Data Analysis",
            "Calculate and visualize Fibonacci sequence",
            "Calculate the Fibonacci sequence up to the 15th number, compute ratios between consecutive numbers, and show convergence to the golden ratio (1.618).",
        ),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            orchestrator: OrchestratorSection::default(),
            models: ModelsSection::default(),
            activity: ActivitySection::default(),
            examples: default_examples(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MAGENTIC__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MAGENTIC__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("config file {} not found, using defaults", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAGENTIC")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8000);
        assert!(cfg.orchestrator.base_url.is_none());
        assert_eq!(cfg.orchestrator.max_stall_count, 5);
        assert_eq!(cfg.models.catalogue.len(), 4);
        assert_eq!(cfg.activity.milestones, vec![10, 20, 30, 40]);
        assert_eq!(cfg.examples.len(), 5);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[orchestrator]
base_url = "http://127.0.0.1:7000"

[models]
coder = "gpt-4o-mini"

[activity]
milestones = [5]

[[examples]]
title = "Quick"
task = "Add 2 and 2"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.orchestrator.base_url.as_deref(), Some("http://127.0.0.1:7000"));
        assert_eq!(cfg.orchestrator.default_max_rounds, 20);
        assert_eq!(cfg.models.coder, "gpt-4o-mini");
        assert_eq!(cfg.models.researcher, "gpt-4o");
        assert_eq!(cfg.activity.milestones, vec![5]);
        assert_eq!(cfg.activity.preview_chars, 300);
        assert_eq!(cfg.examples.len(), 1);
        assert!(cfg.examples[0].description.is_empty());
    }
}
