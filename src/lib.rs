//! Magentic - 多智能体工作流活动中继
//!
//! 外部编排引擎（Manager 协调 Researcher / Coder / Reviewer）推送原始事件，
//! 本 crate 将其翻译为可读的活动日志并交付最终报告。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 运行错误与优雅关闭
//! - **source**: 事件模型与事件源（HTTP sidecar / 脚本回放）及其缓存
//! - **activity**: 事件分类、结果提取、协作汇总
//! - **gateway**: 缓冲 / 流式执行入口
//! - **observability**: tracing 初始化
//! - **web**: axum HTTP 接口（feature = "web"）

pub mod activity;
pub mod config;
pub mod core;
pub mod gateway;
pub mod observability;
pub mod source;
#[cfg(feature = "web")]
pub mod web;

pub use config::{load_config, AppConfig};
pub use core::RunError;
pub use gateway::{ExecutionGateway, StreamFrame, TaskRequest, TaskResponse};
