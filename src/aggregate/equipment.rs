//! Equipment: fleet status counts and utilization.
//!
//! Status is categorical; a row counts as active, idle or breakdown by
//! case-insensitive comparison of its `status` cell. Utilization is
//! `active / rows * 100`: `>= 70` good, `>= 55` warning, else danger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{distinct_sorted, group_by, highest, text, to_records};
use crate::dashboard::{assemble, SpecParts};
use crate::normalize::NormalizedRow;
use crate::types::{ChartSeries, DashboardSpec, Kpi, KpiStatus, Module, TableColumn, Visual, VisualType};
use crate::util::{fixed1, percent_of};

/// Rows shown in the detail table.
pub const DETAIL_ROW_LIMIT: usize = 50;

const ACTIVE_COLOR: &str = "#22c55e";
const IDLE_COLOR: &str = "#eab308";
const BREAKDOWN_COLOR: &str = "#ef4444";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetState {
    Active,
    Idle,
    Breakdown,
    Other,
}

impl FleetState {
    pub fn parse(status: &str) -> Self {
        let s = status.trim();
        if s.eq_ignore_ascii_case("active") {
            FleetState::Active
        } else if s.eq_ignore_ascii_case("idle") {
            FleetState::Idle
        } else if s.eq_ignore_ascii_case("breakdown") {
            FleetState::Breakdown
        } else {
            FleetState::Other
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentRecord {
    pub timestamp: String,
    pub discipline: String,
    pub equipment_id: String,
    pub status: String,
    pub hours_idle: String,
}

impl EquipmentRecord {
    pub fn from_row(row: &NormalizedRow) -> Self {
        EquipmentRecord {
            timestamp: text(row, "timestamp"),
            discipline: text(row, "discipline"),
            equipment_id: text(row, "equipment_id"),
            status: text(row, "status"),
            hours_idle: text(row, "hours_idle"),
        }
    }

    pub fn state(&self) -> FleetState {
        FleetState::parse(&self.status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetCounts {
    pub active: usize,
    pub idle: usize,
    pub breakdown: usize,
    pub total: usize,
}

impl FleetCounts {
    pub fn tally<'a, I: IntoIterator<Item = &'a EquipmentRecord>>(records: I) -> Self {
        let mut c = FleetCounts::default();
        for r in records {
            c.total += 1;
            match r.state() {
                FleetState::Active => c.active += 1,
                FleetState::Idle => c.idle += 1,
                FleetState::Breakdown => c.breakdown += 1,
                FleetState::Other => {}
            }
        }
        c
    }

    pub fn utilization_pct(&self) -> f64 {
        percent_of(self.active as f64, self.total as f64)
    }
}

pub fn classify(utilization_pct: f64) -> KpiStatus {
    if utilization_pct >= 70.0 {
        KpiStatus::Good
    } else if utilization_pct >= 55.0 {
        KpiStatus::Warning
    } else {
        KpiStatus::Danger
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineFleet {
    pub discipline: String,
    #[serde(rename = "Active")]
    pub active: usize,
    #[serde(rename = "Idle")]
    pub idle: usize,
    #[serde(rename = "Breakdown")]
    pub breakdown: usize,
    pub utilization_pct: f64,
    pub status: KpiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetPoint {
    pub timestamp: String,
    #[serde(rename = "Active")]
    pub active: usize,
    #[serde(rename = "Idle")]
    pub idle: usize,
    #[serde(rename = "Breakdown")]
    pub breakdown: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentDetail {
    pub equipment_id: String,
    pub discipline: String,
    pub status: String,
    pub hours_idle: String,
}

pub fn breakdown(records: &[EquipmentRecord]) -> Vec<DisciplineFleet> {
    group_by(records, |r| r.discipline.as_str())
        .into_iter()
        .map(|(discipline, rows)| {
            let c = FleetCounts::tally(rows.iter().copied());
            let utilization_pct = c.utilization_pct();
            DisciplineFleet {
                discipline: discipline.to_string(),
                active: c.active,
                idle: c.idle,
                breakdown: c.breakdown,
                utilization_pct,
                status: classify(utilization_pct),
            }
        })
        .collect()
}

pub fn timeline(records: &[EquipmentRecord], timestamps: &[String]) -> Vec<FleetPoint> {
    let by_ts = group_by(records, |r| r.timestamp.as_str());
    timestamps
        .iter()
        .map(|ts| {
            let c = by_ts
                .get(ts.as_str())
                .map(|rows| FleetCounts::tally(rows.iter().copied()))
                .unwrap_or_default();
            FleetPoint {
                timestamp: ts.clone(),
                active: c.active,
                idle: c.idle,
                breakdown: c.breakdown,
            }
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn detail_rows(records: &[EquipmentRecord]) -> Vec<EquipmentDetail> {
    records
        .iter()
        .take(DETAIL_ROW_LIMIT)
        .map(|r| EquipmentDetail {
            equipment_id: r.equipment_id.clone(),
            discipline: r.discipline.clone(),
            status: capitalize(&r.status),
            hours_idle: if r.hours_idle.is_empty() { "0".to_string() } else { r.hours_idle.clone() },
        })
        .collect()
}

pub fn compute(records: &[EquipmentRecord], generated_at: DateTime<Utc>) -> DashboardSpec {
    let fleet = FleetCounts::tally(records);
    let util = fleet.utilization_pct();
    let util_text = fixed1(util);
    let status = if fleet.total == 0 { KpiStatus::Neutral } else { classify(util) };

    let timestamps = distinct_sorted(records, |r| r.timestamp.as_str());
    let by_discipline = breakdown(records);
    let disciplines: Vec<String> = by_discipline.iter().map(|d| d.discipline.clone()).collect();

    let idle_status = if fleet.idle as f64 > fleet.total as f64 * 0.3 {
        KpiStatus::Warning
    } else {
        KpiStatus::Neutral
    };
    let breakdown_status = if fleet.breakdown > 0 { KpiStatus::Danger } else { KpiStatus::Good };
    let kpis = vec![
        Kpi::new("active_count", "Active Equipment", fleet.active, KpiStatus::Good)
            .with_unit("units")
            .with_sub_label("Currently operating"),
        Kpi::new("idle_count", "Idle Equipment", fleet.idle, idle_status)
            .with_unit("units")
            .with_sub_label("Standing by"),
        Kpi::new("breakdown_count", "Breakdown", fleet.breakdown, breakdown_status)
            .with_unit("units")
            .with_sub_label("Out of service"),
        Kpi::new("utilization_pct", "Utilization Rate", format!("{}%", util_text), status)
            .with_sub_label("Of total fleet"),
    ];

    let series = vec![
        ChartSeries::new("Active", "Active", ACTIVE_COLOR),
        ChartSeries::new("Idle", "Idle", IDLE_COLOR),
        ChartSeries::new("Breakdown", "Breakdown", BREAKDOWN_COLOR),
    ];
    let visuals = vec![
        Visual::chart(
            "timeline",
            VisualType::Line,
            "Equipment Status Over Time",
            "timestamp",
            series.clone(),
            to_records(&timeline(records, &timestamps)),
        ),
        Visual::chart(
            "status_bar",
            VisualType::StackedBar,
            "Equipment Status by Discipline",
            "discipline",
            series,
            to_records(&by_discipline),
        ),
        Visual::table(
            "eq_table",
            "Equipment Detail",
            vec![
                TableColumn::new("equipment_id", "Equipment ID"),
                TableColumn::new("discipline", "Discipline"),
                TableColumn::new("status", "Status"),
                TableColumn::new("hours_idle", "Idle Hours"),
            ],
            to_records(&detail_rows(records)),
        ),
    ];

    let mut insights = vec![
        format!(
            "Fleet utilization is {}% ({} active, {} idle, {} breakdown).",
            util_text, fleet.active, fleet.idle, fleet.breakdown
        ),
        if fleet.breakdown > 0 {
            format!("{} unit(s) in breakdown status require immediate attention.", fleet.breakdown)
        } else {
            "No breakdown equipment, fleet health is good.".to_string()
        },
    ];
    if let Some(worst) = highest(&by_discipline, |d| d.breakdown as f64).filter(|d| d.breakdown > 0) {
        insights.push(format!(
            "{} has the most breakdown units ({}).",
            worst.discipline, worst.breakdown
        ));
    }
    if by_discipline.len() > 1 {
        if let Some(best) = highest(&by_discipline, |d| d.utilization_pct) {
            insights.push(format!(
                "{} has the highest utilization at {}%.",
                best.discipline,
                fixed1(best.utilization_pct)
            ));
        }
    }

    assemble(
        SpecParts {
            module: Module::Equipment,
            kpis,
            visuals,
            insights,
            disciplines,
            dates: timestamps,
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

    fn rec(ts: &str, discipline: &str, id: &str, status: &str) -> EquipmentRecord {
        EquipmentRecord {
            timestamp: ts.to_string(),
            discipline: discipline.to_string(),
            equipment_id: id.to_string(),
            status: status.to_string(),
            hours_idle: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn counts_status_case_insensitively() {
        let rows = vec![
            rec("2024-01-01", "Civil", "EX-1", "ACTIVE"),
            rec("2024-01-01", "Civil", "EX-2", "Idle"),
            rec("2024-01-02", "MEP", "CR-1", "breakdown"),
            rec("2024-01-02", "MEP", "CR-2", "active"),
            rec("2024-01-02", "MEP", "CR-3", "parked"),
        ];
        let c = FleetCounts::tally(&rows);
        assert_eq!(c, FleetCounts { active: 2, idle: 1, breakdown: 1, total: 5 });

        let spec = compute(&rows, now());
        assert_eq!(spec.kpi("utilization_pct").unwrap().value, KpiValue::Text("40.0%".into()));
        assert_eq!(spec.kpi("utilization_pct").unwrap().status, KpiStatus::Danger);
        assert_eq!(spec.kpi("breakdown_count").unwrap().status, KpiStatus::Danger);
        assert_eq!(spec.kpi("idle_count").unwrap().status, KpiStatus::Neutral);
        assert_eq!(spec.meta.date_min, "2024-01-01");
        assert_eq!(spec.meta.date_max, "2024-01-02");
    }

    #[test]
    fn utilization_thresholds() {
        assert_eq!(classify(70.0), KpiStatus::Good);
        assert_eq!(classify(69.9), KpiStatus::Warning);
        assert_eq!(classify(55.0), KpiStatus::Warning);
        assert_eq!(classify(54.9), KpiStatus::Danger);
    }

    #[test]
    fn stacked_bar_uses_capitalized_series_keys() {
        let rows = vec![rec("", "Civil", "EX-1", "active"), rec("", "Civil", "EX-2", "idle")];
        let spec = compute(&rows, now());
        let bar = spec.visual("status_bar").unwrap();
        assert_eq!(bar.kind, VisualType::StackedBar);
        assert_eq!(bar.data[0]["Active"], 1);
        assert_eq!(bar.data[0]["Idle"], 1);
        assert_eq!(bar.data[0]["utilization_pct"], 50.0);
        assert_eq!(spec.kpi("idle_count").unwrap().status, KpiStatus::Warning);
    }

    #[test]
    fn detail_table_is_capped_and_cleaned() {
        let rows: Vec<EquipmentRecord> = (0..60)
            .map(|i| rec("2024-01-01", "Civil", &format!("EX-{i}"), "IDLE"))
            .collect();
        let details = detail_rows(&rows);
        assert_eq!(details.len(), DETAIL_ROW_LIMIT);
        assert_eq!(details[0].status, "Idle");
        assert_eq!(details[0].hours_idle, "0");
    }

    #[test]
    fn insights_name_breakdown_hotspot_and_best_discipline() {
        let rows = vec![
            rec("", "Civil", "EX-1", "breakdown"),
            rec("", "Civil", "EX-2", "active"),
            rec("", "MEP", "CR-1", "active"),
            rec("", "MEP", "CR-2", "active"),
        ];
        let spec = compute(&rows, now());
        assert_eq!(
            spec.insights,
            vec![
                "Fleet utilization is 75.0% (3 active, 0 idle, 1 breakdown).",
                "1 unit(s) in breakdown status require immediate attention.",
                "Civil has the most breakdown units (1).",
                "MEP has the highest utilization at 100.0%.",
            ]
        );
    }

    #[test]
    fn empty_fleet_is_neutral_not_danger() {
        let spec = compute(&[], now());
        let util = spec.kpi("utilization_pct").unwrap();
        assert_eq!(util.value, KpiValue::Text("0.0%".into()));
        assert_eq!(util.status, KpiStatus::Neutral);
        assert_eq!(spec.insights.len(), 2);
    }
}
