//! Packaging of aggregator output into a [`DashboardSpec`], plus the
//! discipline filter applied when a dashboard is narrowed to a subset.

use chrono::{DateTime, Utc};

use crate::types::{DashboardSpec, Kpi, Module, SpecMeta, Visual};

/// KPI ids per module, in display order. Every spec for a module carries
/// exactly these four, in this order.
pub fn kpi_ids(module: Module) -> [&'static str; 4] {
    match module {
        Module::Manpower => ["total_planned", "total_actual", "variance_pct", "discipline_count"],
        Module::Equipment => ["active_count", "idle_count", "breakdown_count", "utilization_pct"],
        Module::Progress => ["planned_avg", "actual_avg", "slippage_pct", "on_track"],
        Module::Cost => ["total_budget", "total_spent", "cost_variance", "discipline_count"],
    }
}

/// Everything an aggregator computed, ready to be packaged.
#[derive(Debug)]
pub struct SpecParts {
    pub module: Module,
    pub kpis: Vec<Kpi>,
    pub visuals: Vec<Visual>,
    pub insights: Vec<String>,
    pub disciplines: Vec<String>,
    /// Distinct dates, already sorted ascending.
    pub dates: Vec<String>,
}

pub fn assemble(parts: SpecParts, generated_at: DateTime<Utc>) -> DashboardSpec {
    debug_assert_eq!(
        parts.kpis.iter().map(|k| k.id.as_str()).collect::<Vec<_>>(),
        kpi_ids(parts.module).to_vec(),
        "kpi layout drifted for {}",
        parts.module
    );
    let meta = SpecMeta {
        date_min: parts.dates.first().cloned().unwrap_or_default(),
        date_max: parts.dates.last().cloned().unwrap_or_default(),
        disciplines: parts.disciplines,
    };
    DashboardSpec {
        kpis: parts.kpis,
        visuals: parts.visuals,
        insights: parts.insights.into_iter().filter(|s| !s.is_empty()).collect(),
        meta,
        last_updated: generated_at,
    }
}

/// Copy of `spec` whose visual rows tagged with a discipline outside
/// `selected` are dropped. Rows without a `discipline` key (timelines) are
/// kept; an empty selection keeps everything.
pub fn filter_disciplines<S: AsRef<str>>(spec: &DashboardSpec, selected: &[S]) -> DashboardSpec {
    let mut out = spec.clone();
    if selected.is_empty() {
        return out;
    }
    for visual in &mut out.visuals {
        visual.data.retain(|row| match row.get("discipline").and_then(|v| v.as_str()) {
            Some(d) if !d.is_empty() => selected.iter().any(|s| s.as_ref() == d),
            _ => true,
        });
    }
    out
}
