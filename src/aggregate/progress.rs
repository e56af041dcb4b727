//! Work progress: planned vs actual completion percentages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{distinct_sorted, group_by, highest, lowest, number, text, to_records};
use super::{ACTUAL_COLOR, PLANNED_COLOR};
use crate::dashboard::{assemble, SpecParts};
use crate::normalize::NormalizedRow;
use crate::types::{ChartSeries, DashboardSpec, Kpi, KpiStatus, Module, TableColumn, Visual, VisualType};
use crate::util::{average, fixed1, signed1};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressRecord {
    pub date: String,
    pub discipline: String,
    pub planned: f64,
    pub actual: f64,
}

impl ProgressRecord {
    pub fn from_row(row: &NormalizedRow) -> Self {
        ProgressRecord {
            date: text(row, "date"),
            discipline: text(row, "discipline"),
            planned: number(row, "planned_progress_pct"),
            actual: number(row, "actual_progress_pct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScheduleStatus {
    Ahead,
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "Minor Delay")]
    MinorDelay,
    Behind,
}

impl ScheduleStatus {
    /// Slippage above +2 is ahead, 0..=2 on track, above -5 a minor delay.
    pub fn from_slippage(slippage: f64) -> Self {
        if slippage >= 0.0 {
            if slippage > 2.0 {
                ScheduleStatus::Ahead
            } else {
                ScheduleStatus::OnTrack
            }
        } else if slippage > -5.0 {
            ScheduleStatus::MinorDelay
        } else {
            ScheduleStatus::Behind
        }
    }

    pub fn meets_schedule(self) -> bool {
        matches!(self, ScheduleStatus::Ahead | ScheduleStatus::OnTrack)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScheduleStatus::Ahead => "Ahead",
            ScheduleStatus::OnTrack => "On Track",
            ScheduleStatus::MinorDelay => "Minor Delay",
            ScheduleStatus::Behind => "Behind",
        })
    }
}

pub fn classify(slippage: f64) -> KpiStatus {
    if slippage >= 0.0 {
        KpiStatus::Good
    } else if slippage >= -5.0 {
        KpiStatus::Warning
    } else {
        KpiStatus::Danger
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisciplineProgress {
    pub discipline: String,
    pub planned: f64,
    pub actual: f64,
    /// `actual - planned`, unrounded; rounding is display-only.
    pub slippage: f64,
    pub schedule: ScheduleStatus,
}

#[derive(Serialize)]
struct ProgressChartRow<'a> {
    discipline: &'a str,
    planned_progress_pct: f64,
    actual_progress_pct: f64,
}

#[derive(Serialize)]
struct ProgressTableRow<'a> {
    discipline: &'a str,
    planned_progress_pct: String,
    actual_progress_pct: String,
    slippage: String,
    status: ScheduleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub date: String,
    pub planned_progress_pct: f64,
    pub actual_progress_pct: f64,
}

fn means<'a, I: IntoIterator<Item = &'a ProgressRecord>>(rows: I) -> (f64, f64) {
    let (mut p, mut a, mut n) = (0.0, 0.0, 0usize);
    for r in rows {
        p += r.planned;
        a += r.actual;
        n += 1;
    }
    (average(p, n), average(a, n))
}

pub fn breakdown(records: &[ProgressRecord]) -> Vec<DisciplineProgress> {
    group_by(records, |r| r.discipline.as_str())
        .into_iter()
        .map(|(discipline, rows)| {
            let (planned, actual) = means(rows.iter().copied());
            let slippage = actual - planned;
            DisciplineProgress {
                discipline: discipline.to_string(),
                planned,
                actual,
                slippage,
                schedule: ScheduleStatus::from_slippage(slippage),
            }
        })
        .collect()
}

pub fn timeline(records: &[ProgressRecord], dates: &[String]) -> Vec<ProgressPoint> {
    let by_date = group_by(records, |r| r.date.as_str());
    dates
        .iter()
        .map(|date| {
            let (planned, actual) = by_date
                .get(date.as_str())
                .map(|rows| means(rows.iter().copied()))
                .unwrap_or((0.0, 0.0));
            ProgressPoint {
                date: date.clone(),
                planned_progress_pct: planned,
                actual_progress_pct: actual,
            }
        })
        .collect()
}

pub fn compute(records: &[ProgressRecord], generated_at: DateTime<Utc>) -> DashboardSpec {
    let (planned, actual) = means(records);
    let slippage = actual - planned;
    let slip_text = format!("{}%", signed1(slippage));
    let status = classify(slippage);

    let dates = distinct_sorted(records, |r| r.date.as_str());
    let by_discipline = breakdown(records);
    let disciplines: Vec<String> = by_discipline.iter().map(|d| d.discipline.clone()).collect();
    let on_track = by_discipline.iter().filter(|d| d.schedule.meets_schedule()).count();
    let total = by_discipline.len();
    let on_track_status = if on_track == total {
        KpiStatus::Good
    } else if on_track as f64 >= total as f64 / 2.0 {
        KpiStatus::Warning
    } else {
        KpiStatus::Danger
    };

    let kpis = vec![
        Kpi::new("planned_avg", "Planned Progress", format!("{}%", fixed1(planned)), KpiStatus::Neutral)
            .with_sub_label("Schedule target"),
        Kpi::new("actual_avg", "Actual Progress", format!("{}%", fixed1(actual)), status)
            .with_delta(format!("{} vs plan", slip_text))
            .with_sub_label("Current completion"),
        Kpi::new("slippage_pct", "Schedule Slippage", slip_text.clone(), status)
            .with_sub_label("vs planned schedule"),
        Kpi::new("on_track", "On Track", format!("{}/{}", on_track, total), on_track_status)
            .with_sub_label("Disciplines meeting schedule"),
    ];

    let chart_rows: Vec<ProgressChartRow> = by_discipline
        .iter()
        .map(|d| ProgressChartRow {
            discipline: &d.discipline,
            planned_progress_pct: d.planned,
            actual_progress_pct: d.actual,
        })
        .collect();
    let table_rows: Vec<ProgressTableRow> = by_discipline
        .iter()
        .map(|d| ProgressTableRow {
            discipline: &d.discipline,
            planned_progress_pct: format!("{}%", fixed1(d.planned)),
            actual_progress_pct: format!("{}%", fixed1(d.actual)),
            slippage: format!("{}%", signed1(d.slippage)),
            status: d.schedule,
        })
        .collect();
    let series = vec![
        ChartSeries::new("planned_progress_pct", "Planned %", PLANNED_COLOR),
        ChartSeries::new("actual_progress_pct", "Actual %", ACTUAL_COLOR),
    ];
    let visuals = vec![
        Visual::chart(
            "timeline",
            VisualType::Line,
            "Planned vs Actual Progress Over Time",
            "date",
            series.clone(),
            to_records(&timeline(records, &dates)),
        ),
        Visual::chart("disc_progress", VisualType::Bar, "Progress by Discipline", "discipline", series, to_records(&chart_rows)),
        Visual::table(
            "progress_table",
            "Progress Detail by Discipline",
            vec![
                TableColumn::new("discipline", "Discipline"),
                TableColumn::new("planned_progress_pct", "Planned %"),
                TableColumn::new("actual_progress_pct", "Actual %"),
                TableColumn::new("slippage", "Slippage"),
                TableColumn::new("status", "Status"),
            ],
            to_records(&table_rows),
        ),
    ];

    let mut insights = vec![format!(
        "Overall progress is {}% {} schedule.",
        fixed1(slippage.abs()),
        if slippage < 0.0 { "behind" } else { "ahead of" }
    )];
    let worst = lowest(&by_discipline, |d| d.slippage);
    let best = highest(&by_discipline, |d| d.slippage);
    if let Some(w) = worst {
        insights.push(format!(
            "{} has the worst slippage at {}%, prioritize resources.",
            w.discipline,
            signed1(w.slippage)
        ));
    }
    if let (Some(b), Some(w)) = (best, worst) {
        if b.discipline != w.discipline {
            insights.push(format!("{} is performing best at {}% vs plan.", b.discipline, signed1(b.slippage)));
        }
    }
    insights.push(format!("{} of {} disciplines are meeting schedule targets.", on_track, total));

    assemble(
        SpecParts {
            module: Module::Progress,
            kpis,
            visuals,
            insights,
            disciplines,
            dates,
        },
        generated_at,
    )
}
