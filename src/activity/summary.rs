//! 运行结束时的协作汇总

use super::entry::{ActivityEntry, Role};
use super::session::SessionState;

const MAX_LISTED_OPERATIONS: usize = 3;

/// 没有任何角色被激活时返回 None
pub fn collaboration_summary(state: &SessionState) -> Option<ActivityEntry> {
    if state.activated_roles().is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    if state.is_activated(Role::Researcher) {
        let topics: Vec<&str> = state.topics().map(|t| t.summary_label()).collect();
        let mut line = format!("🔍 Researcher: {} findings", state.findings(Role::Researcher));
        if !topics.is_empty() {
            line.push_str(&format!(" ({})", topics.join(", ")));
        }
        lines.push(line);
    }
    if state.is_activated(Role::Coder) {
        let ops = state.operations(Role::Coder);
        let mut distinct: Vec<&str> = Vec::new();
        for op in ops {
            if distinct.len() == MAX_LISTED_OPERATIONS {
                break;
            }
            if !distinct.contains(&op.as_str()) {
                distinct.push(op);
            }
        }
        let mut line = format!("💻 Coder: {} operations", ops.len());
        if !distinct.is_empty() {
            line.push_str(&format!(" ({})", distinct.join(", ")));
        }
        lines.push(line);
    }
    if state.is_activated(Role::Reviewer) {
        lines.push(format!(
            "🔎 Reviewer: {} feedback points",
            state.findings(Role::Reviewer)
        ));
    }
    if state.is_activated(Role::Coordinator) {
        lines.push(format!(
            "🎯 Manager: Coordinated {} workflow events",
            state.event_count()
        ));
    }

    Some(ActivityEntry::new(
        Role::System,
        "📊",
        format!("📊 Collaboration Summary:\n   {}", lines.join("\n   ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ResearchTopic;

    #[test]
    fn test_no_summary_without_activity() {
        assert!(collaboration_summary(&SessionState::new()).is_none());
    }

    #[test]
    fn test_summary_lines() {
        let mut state = SessionState::new();
        for _ in 0..7 {
            state.record_event();
        }
        state.activate(Role::Coordinator);
        state.activate(Role::Researcher);
        state.activate(Role::Coder);
        state.add_finding(Role::Researcher);
        state.add_finding(Role::Researcher);
        state.add_topic(ResearchTopic::Trend);
        state.add_topic(ResearchTopic::Market);
        for op in ["ROI Analysis", "Summation", "ROI Analysis", "Processing", "Calculation"] {
            state.tally(Role::Coder, op);
        }

        let entry = collaboration_summary(&state).unwrap();
        assert_eq!(entry.role, Role::System);
        assert_eq!(
            entry.message,
            "📊 Collaboration Summary:\n   \
             🔍 Researcher: 2 findings (market analysis, trend analysis)\n   \
             💻 Coder: 5 operations (ROI Analysis, Summation, Processing)\n   \
             🎯 Manager: Coordinated 7 workflow events"
        );
    }
}
