//! Cost: budget against actual spend.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{distinct_sorted, group_by, highest, lowest, number, span_insight, text, to_records};
use super::{ACTUAL_COLOR, PLANNED_COLOR};
use crate::dashboard::{assemble, SpecParts};
use crate::normalize::NormalizedRow;
use crate::types::{ChartSeries, DashboardSpec, Kpi, KpiStatus, Module, TableColumn, Visual, VisualType};
use crate::util::{fixed0, fixed1, percent_of};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostRecord {
    pub date: String,
    pub discipline: String,
    pub budget: f64,
    pub spend: f64,
    pub cost_code: String,
}

impl CostRecord {
    pub fn from_row(row: &NormalizedRow) -> Self {
        CostRecord {
            date: text(row, "date"),
            discipline: text(row, "discipline"),
            budget: number(row, "budget_amount"),
            spend: number(row, "actual_spend"),
            cost_code: text(row, "cost_code"),
        }
    }
}

/// Under or on budget is good; overspend up to 5% of budget is a warning.
pub fn classify(variance: f64, variance_pct: f64) -> KpiStatus {
    if variance >= 0.0 {
        KpiStatus::Good
    } else if variance_pct >= -5.0 {
        KpiStatus::Warning
    } else {
        KpiStatus::Danger
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineCost {
    pub discipline: String,
    pub budget_amount: f64,
    pub actual_spend: f64,
    pub variance: f64,
    pub variance_pct: String,
    pub cost_codes: usize,
    pub status: KpiStatus,
    #[serde(skip)]
    pub variance_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostPoint {
    pub date: String,
    pub budget_amount: f64,
    pub actual_spend: f64,
    pub variance: f64,
}

fn totals<'a, I: IntoIterator<Item = &'a CostRecord>>(rows: I) -> (f64, f64) {
    rows.into_iter().fold((0.0, 0.0), |(b, s), r| (b + r.budget, s + r.spend))
}

pub fn breakdown(records: &[CostRecord]) -> Vec<DisciplineCost> {
    group_by(records, |r| r.discipline.as_str())
        .into_iter()
        .map(|(discipline, rows)| {
            let (budget, spend) = totals(rows.iter().copied());
            let variance = budget - spend;
            let variance_value = percent_of(variance, budget);
            let mut codes: Vec<&str> = rows
                .iter()
                .map(|r| r.cost_code.as_str())
                .filter(|c| !c.is_empty())
                .collect();
            codes.sort_unstable();
            codes.dedup();
            DisciplineCost {
                discipline: discipline.to_string(),
                budget_amount: budget,
                actual_spend: spend,
                variance,
                variance_pct: format!("{}%", fixed1(variance_value)),
                cost_codes: codes.len(),
                status: classify(variance, variance_value),
                variance_value,
            }
        })
        .collect()
}

pub fn timeline(records: &[CostRecord], dates: &[String]) -> Vec<CostPoint> {
    let by_date = group_by(records, |r| r.date.as_str());
    dates
        .iter()
        .map(|date| {
            let (budget, spend) = by_date
                .get(date.as_str())
                .map(|rows| totals(rows.iter().copied()))
                .unwrap_or((0.0, 0.0));
            CostPoint {
                date: date.clone(),
                budget_amount: budget,
                actual_spend: spend,
                variance: budget - spend,
            }
        })
        .collect()
}

pub fn compute(records: &[CostRecord], generated_at: DateTime<Utc>) -> DashboardSpec {
    let (budget, spend) = totals(records);
    let variance = budget - spend;
    let variance_pct = percent_of(variance, budget);
    let status = classify(variance, variance_pct);

    let dates = distinct_sorted(records, |r| r.date.as_str());
    let by_discipline = breakdown(records);
    let disciplines: Vec<String> = by_discipline.iter().map(|d| d.discipline.clone()).collect();

    let kpis = vec![
        Kpi::new("total_budget", "Total Budget", fixed0(budget), KpiStatus::Neutral)
            .with_sub_label("Sum of uploaded budget"),
        Kpi::new(
            "total_spent",
            "Total Spent",
            fixed0(spend),
            if spend > budget { KpiStatus::Warning } else { KpiStatus::Neutral },
        )
        .with_sub_label("Spend to date"),
        Kpi::new("cost_variance", "Cost Variance", fixed0(variance), status)
            .with_delta(format!("{}%", fixed1(variance_pct)))
            .with_sub_label("Budget minus spend"),
        Kpi::new("discipline_count", "Disciplines", disciplines.len(), KpiStatus::Neutral)
            .with_sub_label("Cost centres reporting"),
    ];

    let series = vec![
        ChartSeries::new("budget_amount", "Budget", PLANNED_COLOR),
        ChartSeries::new("actual_spend", "Actual Spend", ACTUAL_COLOR),
    ];
    let discipline_rows = to_records(&by_discipline);
    let visuals = vec![
        Visual::chart(
            "timeline",
            VisualType::Line,
            "Budget vs Spend Over Time",
            "date",
            series.clone(),
            to_records(&timeline(records, &dates)),
        ),
        Visual::chart("discipline_bar", VisualType::Bar, "Budget vs Spend by Discipline", "discipline", series, discipline_rows.clone()),
        Visual::table(
            "cost_table",
            "Cost Detail by Discipline",
            vec![
                TableColumn::new("discipline", "Discipline"),
                TableColumn::new("budget_amount", "Budget"),
                TableColumn::new("actual_spend", "Actual Spend"),
                TableColumn::new("variance", "Variance"),
                TableColumn::new("variance_pct", "Variance %"),
                TableColumn::new("cost_codes", "Cost Codes"),
            ],
            discipline_rows,
        ),
    ];

    let mut insights = vec![format!(
        "Total spend is {} budget by {} ({}%).",
        if variance < 0.0 { "over" } else { "within" },
        fixed0(variance.abs()),
        fixed1(variance_pct.abs())
    )];
    let worst = lowest(&by_discipline, |d| d.variance_value);
    let best = highest(&by_discipline, |d| d.variance_value);
    if let Some(w) = worst {
        insights.push(format!("{} shows the worst variance at {}.", w.discipline, w.variance_pct));
    }
    if let (Some(b), Some(w)) = (best, worst) {
        if b.discipline != w.discipline {
            insights.push(format!("{} has the healthiest margin at {}.", b.discipline, b.variance_pct));
        }
    }
    insights.push(span_insight(&dates));

    assemble(
        SpecParts {
            module: Module::Cost,
            kpis,
            visuals,
            insights,
            disciplines,
            dates,
        },
        generated_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KpiValue;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn rec(date: &str, discipline: &str, budget: f64, spend: f64, code: &str) -> CostRecord {
        CostRecord {
            date: date.to_string(),
            discipline: discipline.to_string(),
            budget,
            spend,
            cost_code: code.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn classify_bands() {
        assert_eq!(classify(0.0, 0.0), KpiStatus::Good);
        assert_eq!(classify(-50.0, -5.0), KpiStatus::Warning);
        assert_eq!(classify(-51.0, -5.1), KpiStatus::Danger);
    }

    #[test]
    fn totals_and_variance() {
        let rows = vec![
            rec("2024-02-01", "Civil", 1000.0, 1100.0, "C-01"),
            rec("2024-02-01", "Civil", 500.0, 400.0, "C-02"),
            rec("2024-01-01", "MEP", 2000.0, 1800.0, "M-01"),
        ];
        let spec = compute(&rows, now());
        assert_eq!(spec.kpi("total_budget").unwrap().value, KpiValue::Text("3500".into()));
        assert_eq!(spec.kpi("total_spent").unwrap().value, KpiValue::Text("3300".into()));
        assert_eq!(spec.kpi("total_spent").unwrap().label, "Total Spent");
        assert_eq!(spec.kpi("total_spent").unwrap().status, KpiStatus::Neutral);
        let v = spec.kpi("cost_variance").unwrap();
        assert_eq!(v.value, KpiValue::Text("200".into()));
        assert_eq!(v.delta.as_deref(), Some("5.7%"));
        assert_eq!(v.status, KpiStatus::Good);

        let table = spec.visual("cost_table").unwrap();
        assert_eq!(table.data[0]["discipline"], "Civil");
        assert_eq!(table.data[0]["cost_codes"], 2);
        assert_eq!(table.data[0]["variance_pct"], "0.0%");
        assert_eq!(spec.meta.date_min, "2024-01-01");
        assert_eq!(spec.meta.date_max, "2024-02-01");
        assert_eq!(spec.insights[0], "Total spend is within budget by 200 (5.7%).");
    }

    #[test]
    fn worst_is_most_negative_variance_percent() {
        let rows = vec![
            rec("", "Arch", 100.0, 105.0, ""),
            rec("", "Civil", 100.0, 120.0, ""),
            rec("", "MEP", 100.0, 98.0, ""),
        ];
        let spec = compute(&rows, now());
        assert_eq!(spec.insights[0], "Total spend is over budget by 23 (7.7%).");
        assert_eq!(spec.insights[1], "Civil shows the worst variance at -20.0%.");
        assert_eq!(spec.insights[2], "MEP has the healthiest margin at 2.0%.");
        assert_eq!(spec.kpi("total_spent").unwrap().status, KpiStatus::Warning);
        assert_eq!(spec.kpi("cost_variance").unwrap().status, KpiStatus::Danger);
    }

    #[test]
    fn zero_budget_is_safe() {
        let spec = compute(&[rec("2024-01-01", "Civil", 0.0, 0.0, "")], now());
        assert_eq!(spec.kpi("cost_variance").unwrap().delta.as_deref(), Some("0.0%"));
        assert_eq!(spec.kpi("cost_variance").unwrap().status, KpiStatus::Good);
        assert_eq!(spec.kpi("total_spent").unwrap().status, KpiStatus::Neutral);
        let empty = compute(&[], now());
        assert_eq!(empty.kpi("discipline_count").unwrap().value, KpiValue::Count(0));
        assert_eq!(empty.insights.len(), 2);
    }
}
