//! 活动日志引擎
//!
//! 把编排事件翻译为人类可读的活动条目：分类器负责参与者活动，提取器负责终态报告，
//! 汇总在运行结束时给出各角色的贡献统计。所有可变状态都放在每次运行独占的 SessionState 中。

pub mod classifier;
pub mod entry;
pub mod extractor;
pub mod session;
pub mod summary;

pub use classifier::{Classifier, CoderOperation, RoleSignals};
pub use entry::{ActivityEntry, Role};
pub use extractor::{Extraction, ResultExtractor};
pub use session::{ResearchTopic, SessionState};
pub use summary::collaboration_summary;
