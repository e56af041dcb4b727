use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table};

use crate::types::{DashboardSpec, KpiRow, Record, Visual};

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)
}

/// Write a table visual as a real CSV, one column per declared column.
pub fn write_visual_csv(path: &Path, visual: &Visual) -> csv::Result<()> {
    let columns = visual.columns.as_deref().unwrap_or_default();
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(columns.iter().map(|c| c.label.as_str()))?;
    for row in &visual.data {
        wtr.write_record(columns.iter().map(|c| cell_text(row, &c.key)))?;
    }
    wtr.flush()?;
    Ok(())
}

fn cell_text(row: &Record, key: &str) -> String {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(v) => v.to_string(),
    }
}

pub fn preview_kpis(spec: &DashboardSpec) {
    let rows: Vec<KpiRow> = spec.kpis.iter().map(KpiRow::from).collect();
    if rows.is_empty() {
        println!("(no KPIs)\n");
        return;
    }
    let table_str = Table::new(rows).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Markdown preview of the first `max_rows` rows of a table visual.
pub fn preview_visual(visual: &Visual, max_rows: usize) {
    let Some(columns) = visual.columns.as_deref() else {
        return;
    };
    println!("{}", visual.title);
    if visual.data.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.label.clone()));
    for row in visual.data.iter().take(max_rows) {
        builder.push_record(columns.iter().map(|c| cell_text(row, &c.key)));
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
