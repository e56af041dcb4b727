//! Manpower: planned vs actual headcount.
//!
//! Headline figures are daily averages (totals divided by the number of
//! distinct dates, at least one). Variance is `(actual - planned) /
//! planned * 100`; `>= -5` is good, `>= -15` warning, anything lower danger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{group_by, distinct_sorted, highest, lowest, number, span_insight, text, to_records};
use super::{ACTUAL_COLOR, PLANNED_COLOR};
use crate::dashboard::{assemble, SpecParts};
use crate::normalize::NormalizedRow;
use crate::types::{ChartSeries, DashboardSpec, Kpi, KpiStatus, Module, TableColumn, Visual, VisualType};
use crate::util::{fixed1, percent_of, plain, round_half_up};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManpowerRecord {
    pub date: String,
    pub discipline: String,
    pub planned: f64,
    pub actual: f64,
}

impl ManpowerRecord {
    pub fn from_row(row: &NormalizedRow) -> Self {
        ManpowerRecord {
            date: text(row, "date"),
            discipline: text(row, "discipline"),
            planned: number(row, "planned_headcount"),
            actual: number(row, "actual_headcount"),
        }
    }
}

pub fn classify(variance_pct: f64) -> KpiStatus {
    if variance_pct >= -5.0 {
        KpiStatus::Good
    } else if variance_pct >= -15.0 {
        KpiStatus::Warning
    } else {
        KpiStatus::Danger
    }
}

/// Per-discipline headcount. Serialized fields are the chart/table data
/// (daily averages); totals stay on the struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineHeadcount {
    pub discipline: String,
    pub planned_headcount: i64,
    pub actual_headcount: i64,
    pub variance: i64,
    pub variance_pct: String,
    pub status: KpiStatus,
    #[serde(skip)]
    pub planned_total: f64,
    #[serde(skip)]
    pub actual_total: f64,
    #[serde(skip)]
    pub variance_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadcountPoint {
    pub date: String,
    pub planned_headcount: f64,
    pub actual_headcount: f64,
}

pub fn breakdown(records: &[ManpowerRecord], day_count: usize) -> Vec<DisciplineHeadcount> {
    let days = day_count.max(1) as f64;
    group_by(records, |r| r.discipline.as_str())
        .into_iter()
        .map(|(discipline, rows)| {
            let planned_total: f64 = rows.iter().map(|r| r.planned).sum();
            let actual_total: f64 = rows.iter().map(|r| r.actual).sum();
            let p = planned_total / days;
            let a = actual_total / days;
            let variance_value = percent_of(a - p, p);
            DisciplineHeadcount {
                discipline: discipline.to_string(),
                planned_headcount: round_half_up(p) as i64,
                actual_headcount: round_half_up(a) as i64,
                variance: round_half_up(a - p) as i64,
                variance_pct: format!("{}%", fixed1(variance_value)),
                status: classify(variance_value),
                planned_total,
                actual_total,
                variance_value,
            }
        })
        .collect()
}

pub fn timeline(records: &[ManpowerRecord], dates: &[String]) -> Vec<HeadcountPoint> {
    let by_date = group_by(records, |r| r.date.as_str());
    dates
        .iter()
        .map(|date| {
            let rows = by_date.get(date.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            HeadcountPoint {
                date: date.clone(),
                planned_headcount: rows.iter().map(|r| r.planned).sum(),
                actual_headcount: rows.iter().map(|r| r.actual).sum(),
            }
        })
        .collect()
}

pub fn compute(records: &[ManpowerRecord], generated_at: DateTime<Utc>) -> DashboardSpec {
    let planned: f64 = records.iter().map(|r| r.planned).sum();
    let actual: f64 = records.iter().map(|r| r.actual).sum();
    let variance = actual - planned;
    let variance_pct = percent_of(variance, planned);
    let vp = fixed1(variance_pct);
    let status = classify(variance_pct);

    let dates = distinct_sorted(records, |r| r.date.as_str());
    let days = dates.len().max(1) as f64;
    let by_discipline = breakdown(records, dates.len());
    let disciplines: Vec<String> = by_discipline.iter().map(|d| d.discipline.clone()).collect();
    let points = timeline(records, &dates);

    let kpis = vec![
        Kpi::new("total_planned", "Avg Daily Planned", round_half_up(planned / days) as i64, KpiStatus::Neutral)
            .with_unit("workers")
            .with_sub_label("Planned headcount/day"),
        Kpi::new("total_actual", "Avg Daily Actual", round_half_up(actual / days) as i64, status)
            .with_delta(format!("{}%", vp))
            .with_unit("workers")
            .with_sub_label("Actual headcount/day"),
        Kpi::new("variance_pct", "Overall Variance", format!("{}%", vp), status)
            .with_delta(format!("{} workers", plain(variance.abs())))
            .with_sub_label("Planned vs actual"),
        Kpi::new("discipline_count", "Disciplines", disciplines.len(), KpiStatus::Neutral)
            .with_sub_label("Reporting data"),
    ];

    let series = vec![
        ChartSeries::new("planned_headcount", "Planned", PLANNED_COLOR),
        ChartSeries::new("actual_headcount", "Actual", ACTUAL_COLOR),
    ];
    let discipline_rows = to_records(&by_discipline);
    let visuals = vec![
        Visual::chart("timeline", VisualType::Line, "Planned vs Actual Over Time", "date", series.clone(), to_records(&points)),
        Visual::chart("discipline_bar", VisualType::Bar, "Headcount by Discipline", "discipline", series, discipline_rows.clone()),
        Visual::table(
            "detail_table",
            "Discipline Detail",
            vec![
                TableColumn::new("discipline", "Discipline"),
                TableColumn::new("planned_headcount", "Planned"),
                TableColumn::new("actual_headcount", "Actual"),
                TableColumn::new("variance", "Variance"),
                TableColumn::new("variance_pct", "Variance %"),
            ],
            discipline_rows,
        ),
    ];

    let mut insights = vec![format!(
        "Overall workforce is {}% {} plan across {} disciplines.",
        vp,
        if variance_pct < 0.0 { "below" } else { "above" },
        disciplines.len()
    )];
    let worst = lowest(&by_discipline, |d| d.variance_value);
    let best = highest(&by_discipline, |d| d.variance_value);
    if let Some(w) = worst {
        insights.push(format!("{} is most understaffed at {} vs planned.", w.discipline, w.variance_pct));
    }
    if let (Some(b), Some(w)) = (best, worst) {
        if b.discipline != w.discipline {
            insights.push(format!("{} is best staffed at {} vs planned.", b.discipline, b.variance_pct));
        }
    }
    insights.push(span_insight(&dates));

    assemble(
        SpecParts {
            module: Module::Manpower,
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

    fn rec(date: &str, discipline: &str, planned: f64, actual: f64) -> ManpowerRecord {
        ManpowerRecord {
            date: date.to_string(),
            discipline: discipline.to_string(),
            planned,
            actual,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn groups_disciplines_with_totals() {
        let rows = vec![
            rec("", "Civil", 10.0, 8.0),
            rec("", "Civil", 5.0, 5.0),
            rec("", "MEP", 20.0, 15.0),
        ];
        let b = breakdown(&rows, 0);
        assert_eq!(b.len(), 2);
        assert_eq!((b[0].discipline.as_str(), b[0].planned_total, b[0].actual_total), ("Civil", 15.0, 13.0));
        assert_eq!((b[1].discipline.as_str(), b[1].planned_total, b[1].actual_total), ("MEP", 20.0, 15.0));
        assert_eq!(b[1].variance_pct, "-25.0%");
        assert_eq!(b[1].status, KpiStatus::Danger);
    }

    #[test]
    fn averages_per_day_for_chart_values() {
        let rows = vec![
            rec("2024-01-01", "Civil", 10.0, 9.0),
            rec("2024-01-02", "Civil", 10.0, 8.0),
            rec("2024-01-02", "MEP", 4.0, 4.0),
        ];
        let spec = compute(&rows, now());
        assert_eq!(spec.kpi("total_planned").unwrap().value, KpiValue::Count(12));
        assert_eq!(spec.kpi("total_actual").unwrap().value, KpiValue::Count(11));
        let bar = spec.visual("discipline_bar").unwrap();
        assert_eq!(bar.data[0]["planned_headcount"], 10);
        assert_eq!(bar.data[0]["actual_headcount"], 9);
        let line = spec.visual("timeline").unwrap();
        assert_eq!(line.data.len(), 2);
        assert_eq!(line.data[1]["planned_headcount"], 14.0);
    }

    #[test]
    fn zero_plan_reports_zero_variance() {
        let rows = vec![rec("2024-01-01", "Civil", 0.0, 5.0), rec("2024-01-01", "MEP", 0.0, 0.0)];
        let spec = compute(&rows, now());
        let v = spec.kpi("variance_pct").unwrap();
        assert_eq!(v.value, KpiValue::Text("0.0%".to_string()));
        assert_eq!(v.status, KpiStatus::Good);
        let json = serde_json::to_string(&spec).unwrap();
        assert!(!json.contains("NaN") && !json.contains("inf"));
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(classify(-5.0), KpiStatus::Good);
        assert_eq!(classify(-5.1), KpiStatus::Warning);
        assert_eq!(classify(-15.0), KpiStatus::Warning);
        assert_eq!(classify(-15.1), KpiStatus::Danger);
        assert_eq!(classify(12.0), KpiStatus::Good);
    }

    #[test]
    fn insights_cite_worst_and_best_disciplines() {
        let rows = vec![
            rec("2024-01-01", "Arch", 100.0, 95.0),
            rec("2024-01-01", "Civil", 100.0, 80.0),
            rec("2024-01-01", "MEP", 100.0, 102.0),
        ];
        let spec = compute(&rows, now());
        assert_eq!(spec.insights.len(), 4);
        assert_eq!(spec.insights[0], "Overall workforce is -7.7% below plan across 3 disciplines.");
        assert_eq!(spec.insights[1], "Civil is most understaffed at -20.0% vs planned.");
        assert_eq!(spec.insights[2], "MEP is best staffed at 2.0% vs planned.");
        assert_eq!(spec.insights[3], "Data spans 1 day(s) from 2024-01-01 to 2024-01-01.");
        assert_eq!(spec.kpi("variance_pct").unwrap().delta.as_deref(), Some("23 workers"));
        assert_eq!(spec.kpi("variance_pct").unwrap().status, KpiStatus::Warning);
    }

    #[test]
    fn tied_disciplines_pick_first_seen() {
        let rows = vec![rec("", "Civil", 10.0, 9.0), rec("", "MEP", 10.0, 9.0)];
        let spec = compute(&rows, now());
        assert_eq!(spec.insights[1], "Civil is most understaffed at -10.0% vs planned.");
        assert_eq!(spec.insights.len(), 2 + 1);
    }
}
