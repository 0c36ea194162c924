//! 执行网关
//!
//! HTTP 层与 CLI 的唯一入口：接收任务请求，选择事件源，驱动一次运行，
//! 以缓冲响应或流式帧的形式交付结果。

mod message;
mod runtime;

pub use message::{RunStatus, StreamFrame, TaskRequest, TaskResponse};
pub use runtime::{until_shutdown, ExecutionGateway, FrameStream, NO_OUTPUT_RESULT, SHUTDOWN_MESSAGE};
