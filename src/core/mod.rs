//! 核心：运行错误与优雅关闭

pub mod error;
pub mod shutdown;

pub use error::RunError;
pub use shutdown::ShutdownManager;
