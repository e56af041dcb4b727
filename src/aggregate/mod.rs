//! Module aggregators: normalized rows in, [`DashboardSpec`] out.
//!
//! Each module converts its normalized rows into a typed record once, then
//! computes totals, a derived metric, a per-discipline breakdown (first-seen
//! order), a per-date timeline (ascending) and insight strings. None of
//! this can fail; empty input produces a zero baseline spec.

pub mod cost;
pub mod equipment;
pub mod manpower;
pub mod progress;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::normalize::NormalizedRow;
use crate::types::{DashboardSpec, Module, Record};

pub(crate) const PLANNED_COLOR: &str = "#4B9EFF";
pub(crate) const ACTUAL_COLOR: &str = "#FF6A00";

/// Run the aggregator for `module`.
pub fn aggregate(module: Module, rows: &[NormalizedRow], generated_at: DateTime<Utc>) -> DashboardSpec {
    match module {
        Module::Manpower => {
            let records: Vec<_> = rows.iter().map(manpower::ManpowerRecord::from_row).collect();
            manpower::compute(&records, generated_at)
        }
        Module::Equipment => {
            let records: Vec<_> = rows.iter().map(equipment::EquipmentRecord::from_row).collect();
            equipment::compute(&records, generated_at)
        }
        Module::Progress => {
            let records: Vec<_> = rows.iter().map(progress::ProgressRecord::from_row).collect();
            progress::compute(&records, generated_at)
        }
        Module::Cost => {
            let records: Vec<_> = rows.iter().map(cost::CostRecord::from_row).collect();
            cost::compute(&records, generated_at)
        }
    }
}

/// Trimmed text of `key`, empty when absent.
pub(crate) fn text(row: &NormalizedRow, key: &str) -> String {
    row.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

pub(crate) fn number(row: &NormalizedRow, key: &str) -> f64 {
    row.get(key).map(|v| crate::util::coerce_number(v)).unwrap_or(0.0)
}

/// Group records by a key in first-seen order. Empty keys are skipped.
pub(crate) fn group_by<'a, R, F>(records: &'a [R], key: F) -> IndexMap<&'a str, Vec<&'a R>>
where
    F: Fn(&'a R) -> &'a str,
{
    let mut groups: IndexMap<&'a str, Vec<&'a R>> = IndexMap::new();
    for r in records {
        let k = key(r);
        if k.is_empty() {
            continue;
        }
        groups.entry(k).or_default().push(r);
    }
    groups
}

/// Distinct non-empty values, sorted ascending. ISO dates sort
/// chronologically this way.
pub(crate) fn distinct_sorted<'a, R, F>(records: &'a [R], key: F) -> Vec<String>
where
    F: Fn(&'a R) -> &'a str,
{
    records
        .iter()
        .map(key)
        .filter(|k| !k.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// First item with the lowest metric; ties keep the earliest item.
pub(crate) fn lowest<T, F: Fn(&T) -> f64>(items: &[T], metric: F) -> Option<&T> {
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let m = metric(item);
        match best {
            Some((_, cur)) if m >= cur => {}
            _ => best = Some((item, m)),
        }
    }
    best.map(|(item, _)| item)
}

/// First item with the highest metric; ties keep the earliest item.
pub(crate) fn highest<T, F: Fn(&T) -> f64>(items: &[T], metric: F) -> Option<&T> {
    lowest(items, |item| -metric(item))
}

/// Serialize typed rows into flat visual records.
pub(crate) fn to_records<T: Serialize>(items: &[T]) -> Vec<Record> {
    items
        .iter()
        .filter_map(|item| match serde_json::to_value(item) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

pub(crate) fn span_insight(dates: &[String]) -> String {
    format!(
        "Data spans {} day(s) from {} to {}.",
        dates.len(),
        dates.first().map(String::as_str).unwrap_or("N/A"),
        dates.last().map(String::as_str).unwrap_or("N/A"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_keep_first_seen_order_and_skip_blank() {
        let rows = vec!["MEP", "", "Civil", "MEP", "Arch"];
        let groups = group_by(&rows, |r| *r);
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["MEP", "Civil", "Arch"]);
        assert_eq!(groups["MEP"].len(), 2);
    }

    #[test]
    fn dates_are_distinct_and_sorted() {
        let rows = vec!["2024-03-02", "2024-01-15", "", "2024-03-02"];
        assert_eq!(distinct_sorted(&rows, |r| *r), vec!["2024-01-15", "2024-03-02"]);
    }

    #[test]
    fn ties_resolve_to_first_item() {
        let items = vec![("A", 1.0), ("B", -3.0), ("C", -3.0), ("D", 4.0), ("E", 4.0)];
        assert_eq!(lowest(&items, |i| i.1).unwrap().0, "B");
        assert_eq!(highest(&items, |i| i.1).unwrap().0, "D");
        let flat = vec![("X", 0.0), ("Y", 0.0)];
        assert_eq!(lowest(&flat, |i| i.1).unwrap().0, "X");
        assert_eq!(highest(&flat, |i| i.1).unwrap().0, "X");
        let empty: Vec<(&str, f64)> = Vec::new();
        assert!(lowest(&empty, |i| i.1).is_none());
    }

    #[test]
    fn span_without_dates_says_na() {
        assert_eq!(span_insight(&[]), "Data spans 0 day(s) from N/A to N/A.");
    }
}
