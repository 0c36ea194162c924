//! 活动日志条目

use serde::{Deserialize, Serialize};

/// 条目归属（四个逻辑角色 + 系统 + 成功）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Researcher,
    Coder,
    Reviewer,
    Coordinator,
    System,
    Success,
}

impl Role {
    /// 可从事件中探测出的参与者角色
    pub const PARTICIPANTS: [Role; 4] = [Role::Researcher, Role::Coder, Role::Reviewer, Role::Coordinator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Researcher => "researcher",
            Role::Coder => "coder",
            Role::Reviewer => "reviewer",
            Role::Coordinator => "coordinator",
            Role::System => "system",
            Role::Success => "success",
        }
    }

    /// 日志中展示的名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Researcher => "Researcher",
            Role::Coder => "Coder",
            Role::Reviewer => "Reviewer",
            Role::Coordinator => "Manager",
            Role::System => "System",
            Role::Success => "Success",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条人类可读的活动记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub role: Role,
    pub icon: String,
    pub message: String,
}

impl ActivityEntry {
    pub fn new(role: Role, icon: &str, message: impl Into<String>) -> Self {
        Self {
            role,
            icon: icon.to_string(),
            message: message.into(),
        }
    }
}

/// 按字符截断（不会切断多字节字符）
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let entry = ActivityEntry::new(Role::Coordinator, "🎯", "planning");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "coordinator");
        assert_eq!(json["icon"], "🎯");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("数据分析报告", 2), "数据");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
