//! 终态输出提取
//!
//! 只处理 WorkflowOutputEvent：正文即最终报告，并在报告文本上再做一次
//! 计算 / 调研痕迹的统计（不与分类器的去重状态互通）。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::entry::{ActivityEntry, Role};
use super::session::{ResearchTopic, SessionState};
use crate::source::WorkflowEvent;

static CALCULATION_RE: OnceLock<Regex> = OnceLock::new();
static RESEARCH_RE: OnceLock<Regex> = OnceLock::new();

fn calculation_re() -> &'static Regex {
    CALCULATION_RE.get_or_init(|| {
        Regex::new(r"(?i)\$[0-9,]+|×|÷|[0-9]+%|=\s*\$?[0-9,]+|ROI|CAGR|calculation|formula").unwrap()
    })
}

fn research_re() -> &'static Regex {
    RESEARCH_RE.get_or_init(|| {
        Regex::new(r"(?i)average|market|industry|study|research|data|statistics|according to|typical|standard")
            .unwrap()
    })
}

/// 不同匹配文本的个数
fn distinct_matches(re: &Regex, text: &str) -> usize {
    re.find_iter(text).map(|m| m.as_str()).collect::<HashSet<_>>().len()
}

/// 单个输出事件的提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// 最后一段非空正文
    pub result: Option<String>,
    pub entries: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultExtractor;

impl ResultExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 非输出事件或没有正文时返回 None
    pub fn extract(&self, event: &WorkflowEvent, state: &mut SessionState) -> Option<Extraction> {
        if !event.kind.is_output() {
            return None;
        }

        let mut extraction = Extraction::default();
        for body in event.bodies() {
            extraction.result = Some(body.to_string());
            self.scan(body, state, &mut extraction.entries);
        }
        extraction.result.as_ref()?;

        extraction.entries.push(ActivityEntry::new(
            Role::Success,
            "✅",
            format!(
                "📄 Final report compiled! Manager synthesized inputs from {} agents",
                state.activated_roles().len()
            ),
        ));
        tracing::debug!(run_id = %state.run_id(), entries = extraction.entries.len(), "output event extracted");
        Some(extraction)
    }

    fn scan(&self, text: &str, state: &mut SessionState, entries: &mut Vec<ActivityEntry>) {
        let calculations = distinct_matches(calculation_re(), text);
        if calculations > 0 {
            entries.push(ActivityEntry::new(
                Role::Coder,
                "🧮",
                format!(
                    "🧮 Coder performed calculations:\n   Found {} mathematical operations in analysis",
                    calculations
                ),
            ));
            state.add_finding(Role::Coder);
            state.tally(Role::Coder, "Mathematical Analysis");
        }

        let indicators = distinct_matches(research_re(), text);
        if indicators > 0 {
            entries.push(ActivityEntry::new(
                Role::Researcher,
                "📚",
                format!(
                    "📚 Researcher gathered market intelligence:\n   Found {} research data points",
                    indicators
                ),
            ));
            state.add_finding(Role::Researcher);
            state.add_topic(ResearchTopic::Market);
        }
    }
}
