//! 事件分类器
//!
//! 事件本身没有结构化的「发生了什么」字段，只能从来源与消息文本推断：
//! 1. 在事件指纹中匹配角色关键词（researcher / coder / reviewer / manager|orchestrator / tool|code），可多个同时命中
//! 2. 角色首次出现时输出一次激活条目
//! 3. 按 载荷列表 → content → message 取第一段非空正文，前 N 个字符作为预览
//! 4. 预览为空或该角色已见过时只输出轻量的 processing 条目，否则进入明细分类
//! 5. 明细分类：按固定顺序的关键词表逐类匹配，首个命中的类别生效
//! 6. 事件计数到达检查点时输出里程碑
//!
//! 关键词表的顺序即优先级，调整顺序会改变分类结果。

use super::entry::{truncate_chars, ActivityEntry, Role};
use super::session::{ResearchTopic, SessionState};
use crate::config::ActivitySection;
use crate::source::WorkflowEvent;

const RESEARCH_CATEGORIES: &[(ResearchTopic, &[&str])] = &[
    (ResearchTopic::Market, &["market", "industry", "sector", "company", "companies"]),
    (ResearchTopic::Data, &["data", "statistics", "number", "figure", "percent"]),
    (ResearchTopic::Trend, &["trend", "growth", "increase", "decrease", "change"]),
    (ResearchTopic::Comparative, &["compare", "comparison", "versus", "vs", "difference"]),
];

const CALCULATION_MARKERS: &[&str] = &["=", "result", "answer", "equals"];

const CALCULATION_KINDS: &[(&str, &[&str])] = &[
    ("CAGR Calculation", &["cagr", "compound", "growth rate"]),
    ("ROI Analysis", &["roi", "return on investment", "payback"]),
    ("Summation", &["sum", "total", "add"]),
    ("Statistical Analysis", &["average", "mean", "median"]),
    ("Percentage Calculation", &["percent", "%", "percentage"]),
];

const CODE_MARKERS: &[&str] = &["python", "code"];

const ANALYSIS_MARKERS: &[&str] = &["analyze", "analysis", "examine"];

const CRITIQUE_MARKERS: &[&str] = &[
    "however",
    "concern",
    "gap",
    "missing",
    "assumption",
    "validate",
    "suggest",
    "recommend",
    "issue",
    "question",
];

const CODE_FENCE: &str = "```";

/// 研究要点只在正文前几行里找
const KEY_POINT_SCAN_LINES: usize = 5;
const KEY_POINT_LIMIT: usize = 2;
const KEY_POINT_CHARS: usize = 100;
const EXCERPT_CHARS: usize = 200;
const FORMULA_SIDE_CHARS: usize = 80;
const CODE_EXCERPT_CHARS: usize = 150;

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// 从事件中探测到的参与者信号
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSignals {
    pub researcher: bool,
    pub coder: bool,
    pub reviewer: bool,
    pub coordinator: bool,
    /// 工具 / 代码执行
    pub tool: bool,
}

impl RoleSignals {
    pub fn detect(event: &WorkflowEvent) -> Self {
        let fingerprint = event.fingerprint().to_lowercase();
        let hit = |needle: &str| fingerprint.contains(needle);
        Self {
            researcher: hit("researcher"),
            coder: hit("coder"),
            reviewer: hit("reviewer"),
            coordinator: hit("manager") || hit("orchestrator"),
            tool: hit("tool") || hit("code"),
        }
    }
}

/// Coder 明细分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderOperation {
    pub label: &'static str,
    /// 公式或代码摘录
    pub detail: Option<String>,
}

/// 规则分类器（无 I/O，状态全部在 SessionState 中）
#[derive(Debug, Clone)]
pub struct Classifier {
    milestones: Vec<u64>,
    preview_chars: usize,
}

impl Classifier {
    pub fn new(settings: &ActivitySection) -> Self {
        Self {
            milestones: settings.milestones.clone(),
            preview_chars: settings.preview_chars,
        }
    }

    /// 对单个事件分类；事件计数由调用方先行推进（SessionState::record_event）
    pub fn classify(&self, event: &WorkflowEvent, state: &mut SessionState) -> Vec<ActivityEntry> {
        let mut entries = Vec::new();
        let signals = RoleSignals::detect(event);

        let full_message = event.first_body().unwrap_or("");
        let preview = truncate_chars(full_message, self.preview_chars);
        if !preview.trim().is_empty() {
            tracing::debug!(run_id = %state.run_id(), "agent message detected: {}", truncate_chars(preview, 150));
        }

        if signals.researcher {
            self.researcher(event, full_message, preview, state, &mut entries);
        }
        if signals.coder {
            self.coder(event, preview, state, &mut entries);
        }
        if signals.reviewer {
            self.reviewer(preview, state, &mut entries);
        }
        if signals.coordinator && state.activate(Role::Coordinator) {
            entries.push(ActivityEntry::new(
                Role::Coordinator,
                "🎯",
                "🎯 Manager Agent coordinating - Analyzing task and planning workflow",
            ));
        }
        if signals.tool {
            entries.push(ActivityEntry::new(
                Role::Coder,
                "🔧",
                "🔧 Coder executing code interpreter for calculations",
            ));
        }

        if let Some(entry) = self.milestone(state) {
            entries.push(entry);
        }
        entries
    }

    fn researcher(
        &self,
        event: &WorkflowEvent,
        full_message: &str,
        preview: &str,
        state: &mut SessionState,
        entries: &mut Vec<ActivityEntry>,
    ) {
        if state.activate(Role::Researcher) {
            entries.push(ActivityEntry::new(
                Role::Researcher,
                "🔍",
                "🔍 Researcher Agent activated - Starting comprehensive information gathering",
            ));
        }
        if !self.admit_detail(Role::Researcher, event, preview, state, entries) {
            return;
        }
        state.add_finding(Role::Researcher);

        let topic = research_topic(preview);
        let label = match topic {
            Some(topic) => {
                state.add_topic(topic);
                topic.analysis_label()
            }
            None => "Information",
        };
        state.tally(Role::Researcher, label);

        let mut message = format!("📚 Researcher completed {}:\n", label);
        let points = key_points(full_message);
        if points.is_empty() {
            message.push_str(&format!("   {}", truncate_chars(preview, EXCERPT_CHARS)));
        } else {
            let bullets: Vec<String> = points
                .iter()
                .map(|p| format!("   • {}", truncate_chars(p, KEY_POINT_CHARS)))
                .collect();
            message.push_str(&bullets.join("\n"));
        }
        entries.push(ActivityEntry::new(Role::Researcher, "📚", message));
    }

    fn coder(
        &self,
        event: &WorkflowEvent,
        preview: &str,
        state: &mut SessionState,
        entries: &mut Vec<ActivityEntry>,
    ) {
        if state.activate(Role::Coder) {
            entries.push(ActivityEntry::new(
                Role::Coder,
                "💻",
                "💻 Coder Agent activated - Initializing computational analysis tools",
            ));
        }
        if !self.admit_detail(Role::Coder, event, preview, state, entries) {
            return;
        }
        state.add_finding(Role::Coder);

        let op = coder_operation(preview);
        state.tally(Role::Coder, op.label);

        let detail = op
            .detail
            .unwrap_or_else(|| truncate_chars(preview, EXCERPT_CHARS).to_string());
        entries.push(ActivityEntry::new(
            Role::Coder,
            "🧮",
            format!("🧮 Coder performing {}:\n   {}", op.label, detail),
        ));
    }

    fn reviewer(&self, preview: &str, state: &mut SessionState, entries: &mut Vec<ActivityEntry>) {
        if state.activate(Role::Reviewer) {
            entries.push(ActivityEntry::new(
                Role::Reviewer,
                "🔍",
                "🔍 Reviewer Agent activated - Critically evaluating analysis quality",
            ));
        }
        if !preview.is_empty() && contains_any(&preview.to_lowercase(), CRITIQUE_MARKERS) {
            state.add_finding(Role::Reviewer);
            entries.push(ActivityEntry::new(
                Role::Reviewer,
                "🔎",
                "🔎 Reviewer providing critical feedback:\n   Identified quality checks and improvement areas",
            ));
        }
    }

    /// 预览为空或已见过：输出轻量条目并返回 false；否则记下预览并返回 true
    fn admit_detail(
        &self,
        role: Role,
        event: &WorkflowEvent,
        preview: &str,
        state: &mut SessionState,
        entries: &mut Vec<ActivityEntry>,
    ) -> bool {
        if preview.is_empty() || state.has_seen(role, preview) {
            if !event.kind.is_quiet() {
                let icon = if role == Role::Coder { "💻" } else { "🔍" };
                entries.push(ActivityEntry::new(
                    role,
                    icon,
                    format!("{} {} processing: {}", icon, role.display_name(), event.kind),
                ));
            }
            return false;
        }
        state.remember(role, preview);
        true
    }

    fn milestone(&self, state: &mut SessionState) -> Option<ActivityEntry> {
        let count = state.event_count();
        if !self.milestones.contains(&count) || !state.fire_milestone(count) {
            return None;
        }
        Some(ActivityEntry::new(
            Role::System,
            "⚡",
            format!("⚡ Workflow milestone: {} events processed, agents collaborating", count),
        ))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ActivitySection::default())
    }
}

/// 首个命中的调研类别
pub fn research_topic(text: &str) -> Option<ResearchTopic> {
    let lower = text.to_lowercase();
    RESEARCH_CATEGORIES
        .iter()
        .find(|(_, words)| contains_any(&lower, words))
        .map(|(topic, _)| *topic)
}

/// Coder 操作分类：计算（细分） → 代码执行 → 数据分析 → 处理
pub fn coder_operation(text: &str) -> CoderOperation {
    let lower = text.to_lowercase();
    let mut label = "Processing";
    let mut detail = None;

    if contains_any(&lower, CALCULATION_MARKERS) {
        label = "Calculation";
        let mut sides = text.split('=');
        if let (Some(lhs), Some(rhs)) = (sides.next(), sides.next()) {
            detail = Some(format!(
                "Formula: {} = {}",
                truncate_chars(lhs.trim(), FORMULA_SIDE_CHARS),
                truncate_chars(rhs.trim(), FORMULA_SIDE_CHARS)
            ));
        }
        if let Some((kind, _)) = CALCULATION_KINDS
            .iter()
            .find(|(_, words)| contains_any(&lower, words))
        {
            label = *kind;
        }
    } else if contains_any(&lower, CODE_MARKERS) {
        label = "Code Execution";
        detail = Some("Running Python code interpreter".to_string());
    } else if contains_any(&lower, ANALYSIS_MARKERS) {
        label = "Data Analysis";
    }

    if let Some(code) = code_excerpt(text) {
        detail = Some(format!("Code: {}...", code));
    }
    CoderOperation { label, detail }
}

/// 第一个代码围栏之后的片段
fn code_excerpt(text: &str) -> Option<String> {
    let (_, rest) = text.split_once(CODE_FENCE)?;
    let block = rest.split(CODE_FENCE).next().unwrap_or("").trim();
    if block.is_empty() {
        return None;
    }
    Some(truncate_chars(block, CODE_EXCERPT_CHARS).to_string())
}

/// 正文前几行中的列表项（去掉项目符号 / 序号），最多两条
pub fn key_points(text: &str) -> Vec<String> {
    text.lines()
        .take(KEY_POINT_SCAN_LINES)
        .map(str::trim)
        .filter(|line| {
            line.starts_with(['-', '•', '*'])
                || line.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(|line| {
            line.trim_start_matches(|c: char| "-•* 0123456789.)".contains(c))
                .to_string()
        })
        .take(KEY_POINT_LIMIT)
        .collect()
}
