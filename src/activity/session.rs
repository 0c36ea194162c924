//! 单次运行的会话累加器
//!
//! 每次运行独占一个 SessionState，运行结束即丢弃，不在并发运行之间共享。

use std::collections::{BTreeSet, HashMap, HashSet};

use super::entry::Role;

/// Researcher 的调研主题（声明顺序即汇总中的展示顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResearchTopic {
    Market,
    Data,
    Trend,
    Comparative,
}

impl ResearchTopic {
    /// 明细条目中的分类名
    pub fn analysis_label(&self) -> &'static str {
        match self {
            ResearchTopic::Market => "Market Research",
            ResearchTopic::Data => "Data Analysis",
            ResearchTopic::Trend => "Trend Analysis",
            ResearchTopic::Comparative => "Comparative Analysis",
        }
    }

    /// 汇总中的主题名
    pub fn summary_label(&self) -> &'static str {
        match self {
            ResearchTopic::Market => "market analysis",
            ResearchTopic::Data => "data research",
            ResearchTopic::Trend => "trend analysis",
            ResearchTopic::Comparative => "comparative analysis",
        }
    }
}

/// 运行期可变状态
#[derive(Debug)]
pub struct SessionState {
    run_id: String,
    activated: Vec<Role>,
    seen: HashMap<Role, HashSet<String>>,
    operations: HashMap<Role, Vec<String>>,
    findings: HashMap<Role, usize>,
    topics: BTreeSet<ResearchTopic>,
    event_count: u64,
    fired_milestones: HashSet<u64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            activated: Vec::new(),
            seen: HashMap::new(),
            operations: HashMap::new(),
            findings: HashMap::new(),
            topics: BTreeSet::new(),
            event_count: 0,
            fired_milestones: HashSet::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// 收到一个事件，返回新的计数
    pub fn record_event(&mut self) -> u64 {
        self.event_count += 1;
        self.event_count
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// 标记角色已激活；首次激活返回 true
    pub fn activate(&mut self, role: Role) -> bool {
        if self.activated.contains(&role) {
            return false;
        }
        self.activated.push(role);
        true
    }

    pub fn is_activated(&self, role: Role) -> bool {
        self.activated.contains(&role)
    }

    /// 按首次激活顺序
    pub fn activated_roles(&self) -> &[Role] {
        &self.activated
    }

    pub fn has_seen(&self, role: Role, preview: &str) -> bool {
        self.seen.get(&role).is_some_and(|s| s.contains(preview))
    }

    /// 记录已明细分类的内容；首次出现返回 true
    pub fn remember(&mut self, role: Role, preview: &str) -> bool {
        self.seen.entry(role).or_default().insert(preview.to_string())
    }

    /// 追加操作标签（保留重复）
    pub fn tally(&mut self, role: Role, label: impl Into<String>) {
        self.operations.entry(role).or_default().push(label.into());
    }

    pub fn operations(&self, role: Role) -> &[String] {
        self.operations.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_finding(&mut self, role: Role) {
        *self.findings.entry(role).or_default() += 1;
    }

    pub fn findings(&self, role: Role) -> usize {
        self.findings.get(&role).copied().unwrap_or(0)
    }

    pub fn add_topic(&mut self, topic: ResearchTopic) {
        self.topics.insert(topic);
    }

    pub fn topics(&self) -> impl Iterator<Item = ResearchTopic> + '_ {
        self.topics.iter().copied()
    }

    /// 检查点首次到达时返回 true
    pub fn fire_milestone(&mut self, checkpoint: u64) -> bool {
        self.fired_milestones.insert(checkpoint)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_once() {
        let mut state = SessionState::new();
        assert!(state.activate(Role::Coder));
        assert!(!state.activate(Role::Coder));
        assert!(state.activate(Role::Researcher));
        assert_eq!(state.activated_roles(), &[Role::Coder, Role::Researcher]);
    }

    #[test]
    fn test_remember_is_per_role() {
        let mut state = SessionState::new();
        assert!(state.remember(Role::Researcher, "same text"));
        assert!(!state.remember(Role::Researcher, "same text"));
        assert!(state.remember(Role::Coder, "same text"));
        assert!(state.has_seen(Role::Coder, "same text"));
        assert!(!state.has_seen(Role::Reviewer, "same text"));
    }

    #[test]
    fn test_tally_keeps_duplicates_in_order() {
        let mut state = SessionState::new();
        state.tally(Role::Coder, "ROI Analysis");
        state.tally(Role::Coder, "Summation");
        state.tally(Role::Coder, "ROI Analysis");
        assert_eq!(state.operations(Role::Coder), &["ROI Analysis", "Summation", "ROI Analysis"]);
        assert!(state.operations(Role::Researcher).is_empty());
    }

    #[test]
    fn test_topics_in_declaration_order() {
        let mut state = SessionState::new();
        state.add_topic(ResearchTopic::Trend);
        state.add_topic(ResearchTopic::Market);
        state.add_topic(ResearchTopic::Trend);
        let topics: Vec<_> = state.topics().collect();
        assert_eq!(topics, vec![ResearchTopic::Market, ResearchTopic::Trend]);
    }

    #[test]
    fn test_milestone_fires_once() {
        let mut state = SessionState::new();
        assert!(state.fire_milestone(10));
        assert!(!state.fire_milestone(10));
        assert_eq!(state.record_event(), 1);
    }
}
