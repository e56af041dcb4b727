//! Deterministic question answering over a [`DashboardSpec`].
//!
//! Rules are tried in order against the lower-cased question; a rule fires
//! when any keyword is a substring and its handler produces an answer. A
//! handler that finds nothing to say lets the next rule try.

use serde::Serialize;

use crate::types::{DashboardSpec, Module};

const NO_DATA: &str = "No data loaded yet. Please upload a file to activate the agent.";
const EXPORT_HINT: &str =
    "Use the **Export Report** button (or `argus export`) to download a CSV report of the current module.";
const ASK_HINT: &str =
    "Try asking: \"summarize\", \"what's the cost variance?\", \"show discipline breakdown\".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_kpi_id: Option<String>,
}

impl Answer {
    fn text(message: impl Into<String>) -> Self {
        Answer {
            message: message.into(),
            highlight_kpi_id: None,
        }
    }

    fn highlighting(message: String, kpi_id: &str) -> Self {
        Answer {
            message,
            highlight_kpi_id: Some(kpi_id.to_string()),
        }
    }
}

struct Context<'a> {
    spec: &'a DashboardSpec,
    module: Option<Module>,
}

impl Context<'_> {
    fn first_insight(&self) -> Option<&str> {
        self.spec.insights.first().map(String::as_str)
    }
}

pub struct Rule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    handler: fn(&Context<'_>) -> Option<Answer>,
}

/// Keyword rules in precedence order.
pub static RULES: [Rule; 8] = [
    Rule {
        name: "summary",
        keywords: &["summary", "summarize", "overview"],
        handler: summary,
    },
    Rule {
        name: "cost",
        keywords: &["cost", "budget", "spend", "financial", "forecast", "over budget"],
        handler: cost,
    },
    Rule {
        name: "manpower",
        keywords: &["manpower", "headcount", "worker", "crew"],
        handler: manpower,
    },
    Rule {
        name: "equipment",
        keywords: &["equipment", "idle", "breakdown", "fleet"],
        handler: equipment,
    },
    Rule {
        name: "progress",
        keywords: &["progress", "behind", "ahead", "schedule", "slippage"],
        handler: progress,
    },
    Rule {
        name: "discipline",
        keywords: &["discipline"],
        handler: disciplines,
    },
    Rule {
        name: "insights",
        keywords: &["insight", "problem", "issue"],
        handler: insights,
    },
    Rule {
        name: "export",
        keywords: &["export", "report", "download"],
        handler: export,
    },
];

/// Name of the first rule whose keywords appear in `question`, ignoring
/// whether its handler would answer.
pub fn matching_rule(question: &str) -> Option<&'static str> {
    let q = question.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| q.contains(k)))
        .map(|rule| rule.name)
}

/// Answer `question` against the dashboard currently on screen.
pub fn answer(question: &str, spec: Option<&DashboardSpec>, module: Option<Module>) -> Answer {
    let Some(spec) = spec else {
        return Answer::text(NO_DATA);
    };
    let q = question.to_lowercase();
    let ctx = Context { spec, module };
    RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| q.contains(k)))
        .find_map(|rule| (rule.handler)(&ctx))
        .unwrap_or_else(|| fallback(&ctx))
}

fn summary(ctx: &Context<'_>) -> Option<Answer> {
    let title = ctx.module.map(|m| m.as_str().to_uppercase()).unwrap_or_else(|| "CURRENT".to_string());
    let kpis: Vec<String> = ctx.spec.kpis.iter().map(|k| k.headline()).collect();
    let findings: Vec<String> = ctx
        .spec
        .insights
        .iter()
        .take(2)
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    Some(Answer::text(format!(
        "**{} STATUS SUMMARY**\n\n{}\n\n**Key Findings:**\n{}",
        title,
        kpis.join("\n"),
        findings.join("\n")
    )))
}

fn cost(ctx: &Context<'_>) -> Option<Answer> {
    if ctx.module != Some(Module::Cost) {
        return Some(Answer::text("Switch to the **Cost** view for budget and spend analysis."));
    }
    let value = |needle: &str| {
        ctx.spec
            .kpi_matching(needle)
            .map(|k| k.value.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    };
    Some(Answer::text(format!(
        "Budget: **{}** · Spent to date: **{}**\nCost variance: **{}**\n\n{}",
        value("budget"),
        value("spent"),
        value("variance"),
        ctx.first_insight().unwrap_or_default()
    )))
}

fn manpower(ctx: &Context<'_>) -> Option<Answer> {
    let kpi = ctx
        .spec
        .kpis
        .iter()
        .find(|k| k.id.contains("actual") || k.id.contains("headcount"))?;
    let delta = kpi.delta.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default();
    Some(Answer::highlighting(
        format!("**{}** is currently **{}**{}.", kpi.label, kpi.value, delta),
        &kpi.id,
    ))
}

fn equipment(ctx: &Context<'_>) -> Option<Answer> {
    let idle = ctx.spec.kpi_matching("idle");
    let breakdown = ctx.spec.kpi_matching("breakdown");
    if idle.is_none() && breakdown.is_none() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(k) = idle {
        parts.push(format!("Idle: **{}** units", k.value));
    }
    if let Some(k) = breakdown {
        parts.push(format!("Breakdown: **{}** units", k.value));
    }
    if let Some(k) = ctx.spec.kpi_matching("utilization") {
        parts.push(format!("Utilization: **{}**", k.value));
    }
    let mut message = format!("Equipment status: {}.", parts.join(", "));
    if let Some(insight) = ctx.first_insight() {
        message.push_str("\n\n");
        message.push_str(insight);
    }
    Some(Answer::text(message))
}

fn progress(ctx: &Context<'_>) -> Option<Answer> {
    let mut lines = Vec::new();
    if let Some(k) = ctx.spec.kpi_matching("actual") {
        lines.push(format!("Actual progress: **{}**", k.value));
    }
    if let Some(k) = ctx.spec.kpi_matching("slippage") {
        lines.push(format!("Schedule slippage: **{}**", k.value));
    }
    if let Some(insight) = ctx.first_insight() {
        lines.push(insight.to_string());
    }
    if lines.is_empty() {
        return None;
    }
    Some(Answer::text(lines.join("\n")))
}

fn disciplines(ctx: &Context<'_>) -> Option<Answer> {
    let meta = &ctx.spec.meta;
    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
    Some(Answer::text(format!(
        "Active disciplines: **{}**.\nDate range: {} to {}.",
        meta.disciplines.join(", "),
        or_na(&meta.date_min),
        or_na(&meta.date_max)
    )))
}

fn insights(ctx: &Context<'_>) -> Option<Answer> {
    let numbered: Vec<String> = ctx
        .spec
        .insights
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    Some(Answer::text(format!("**Current issues:**\n\n{}", numbered.join("\n"))))
}

fn export(_: &Context<'_>) -> Option<Answer> {
    Some(Answer::text(EXPORT_HINT))
}

fn fallback(ctx: &Context<'_>) -> Answer {
    match ctx.spec.kpis.first() {
        Some(k) => {
            let delta = k.delta.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default();
            Answer::text(format!("**{}**: {}{}.\n\n{}", k.label, k.value, delta, ASK_HINT))
        }
        None => Answer::text("No data available for this query."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{cost::CostRecord, equipment::EquipmentRecord, manpower::ManpowerRecord};
    use crate::aggregate::{cost, equipment, manpower};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn manpower_spec() -> DashboardSpec {
        let rows = vec![
            ManpowerRecord {
                date: "2024-01-01".into(),
                discipline: "Civil".into(),
                planned: 10.0,
                actual: 8.0,
            },
            ManpowerRecord {
                date: "2024-01-02".into(),
                discipline: "MEP".into(),
                planned: 20.0,
                actual: 15.0,
            },
        ];
        manpower::compute(&rows, now())
    }

    fn cost_spec() -> DashboardSpec {
        let rows = vec![CostRecord {
            date: "2024-01-01".into(),
            discipline: "Civil".into(),
            budget: 1000.0,
            spend: 1100.0,
            cost_code: "C-01".into(),
        }];
        cost::compute(&rows, now())
    }

    #[test]
    fn no_spec_means_no_data() {
        let a = answer("summarize", None, Some(Module::Manpower));
        assert_eq!(a.message, NO_DATA);
        assert_eq!(a.highlight_kpi_id, None);
    }

    #[test]
    fn rule_precedence_is_list_order() {
        assert_eq!(matching_rule("cost insight please"), Some("cost"));
        assert_eq!(matching_rule("Give me an OVERVIEW of cost"), Some("summary"));
        assert_eq!(matching_rule("which crew is behind?"), Some("manpower"));
        assert_eq!(matching_rule("any issues?"), Some("insights"));
        assert_eq!(matching_rule("hello"), None);
    }

    #[test]
    fn cost_question_outside_cost_view_redirects() {
        let spec = manpower_spec();
        let a = answer("cost insight please", Some(&spec), Some(Module::Manpower));
        assert_eq!(a.message, "Switch to the **Cost** view for budget and spend analysis.");
    }

    #[test]
    fn cost_question_in_cost_view_quotes_kpis() {
        let spec = cost_spec();
        let a = answer("Are we over budget?", Some(&spec), Some(Module::Cost));
        assert_eq!(
            a.message,
            "Budget: **1000** · Spent to date: **1100**\nCost variance: **-100**\n\nTotal spend is over budget by 100 (10.0%)."
        );
    }

    #[test]
    fn manpower_highlights_actual_kpi() {
        let spec = manpower_spec();
        let a = answer("How many workers today?", Some(&spec), Some(Module::Manpower));
        assert_eq!(a.highlight_kpi_id.as_deref(), Some("total_actual"));
        assert_eq!(a.message, "**Avg Daily Actual** is currently **12** (-23.3%).");
    }

    #[test]
    fn equipment_question_without_fleet_kpis_falls_through() {
        let spec = manpower_spec();
        let a = answer("idle disciplines", Some(&spec), Some(Module::Manpower));
        assert!(a.message.starts_with("Active disciplines: **Civil, MEP**."));
        assert!(a.message.ends_with("Date range: 2024-01-01 to 2024-01-02."));
    }

    #[test]
    fn equipment_status_lists_counts() {
        let rows = vec![
            EquipmentRecord {
                timestamp: "2024-01-01".into(),
                discipline: "Civil".into(),
                equipment_id: "EX-1".into(),
                status: "idle".into(),
                hours_idle: "4".into(),
            },
            EquipmentRecord {
                timestamp: "2024-01-01".into(),
                discipline: "Civil".into(),
                equipment_id: "EX-2".into(),
                status: "Active".into(),
                hours_idle: String::new(),
            },
        ];
        let spec = equipment::compute(&rows, now());
        let a = answer("fleet?", Some(&spec), Some(Module::Equipment));
        assert!(a
            .message
            .starts_with("Equipment status: Idle: **1** units, Breakdown: **0** units, Utilization: **50.0%**."));
    }

    #[test]
    fn summary_lists_kpis_and_two_findings() {
        let spec = manpower_spec();
        let a = answer("summary", Some(&spec), Some(Module::Manpower));
        assert!(a.message.starts_with("**MANPOWER STATUS SUMMARY**\n\nAvg Daily Planned: 15\n"));
        assert!(a.message.contains("**Key Findings:**\n1. "));
        assert!(a.message.contains("\n2. "));
        assert!(!a.message.contains("\n3. "));
    }

    #[test]
    fn insights_are_numbered() {
        let spec = manpower_spec();
        let a = answer("what problems do we have", Some(&spec), None);
        assert!(a.message.starts_with("**Current issues:**\n\n1. Overall workforce"));
    }

    #[test]
    fn unmatched_question_falls_back_to_first_kpi() {
        let spec = manpower_spec();
        let a = answer("hello there", Some(&spec), None);
        assert_eq!(a.message, format!("**Avg Daily Planned**: 15.\n\n{}", ASK_HINT));

        let mut spec = spec;
        spec.kpis[0].delta = Some("+2 vs last week".into());
        let a = answer("hello there", Some(&spec), None);
        assert!(a.message.starts_with("**Avg Daily Planned**: 15 (+2 vs last week).\n\n"));
    }

    #[test]
    fn export_gets_static_instruction() {
        let spec = cost_spec();
        assert_eq!(answer("download it", Some(&spec), Some(Module::Cost)).message, EXPORT_HINT);
    }
}
