//! 运行错误类型
//!
//! 只有事件源（外部编排引擎）的失败会上浮为错误；事件字段缺失、分类歧义都在本地消化。

use thiserror::Error;

/// 一次编排运行中可能出现的错误
#[derive(Error, Debug)]
pub enum RunError {
    /// 编排引擎自身报错（配额、参与者失败等）
    #[error("Orchestrator failure: {0}")]
    Adapter(String),

    /// 无法连接编排引擎或传输中断
    #[error("Orchestrator unreachable: {0}")]
    Transport(String),

    /// 事件流中出现无法解码的行
    #[error("Malformed event stream: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RunError {
    fn from(err: reqwest::Error) -> Self {
        RunError::Transport(err.to_string())
    }
}

impl From<config::ConfigError> for RunError {
    fn from(err: config::ConfigError) -> Self {
        RunError::Config(err.to_string())
    }
}
