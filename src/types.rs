use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::UnknownModule;

/// One flat chart/table row, keyed by series or column key.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Manpower,
    Equipment,
    Progress,
    Cost,
}

impl Module {
    pub const ALL: [Module; 4] = [
        Module::Manpower,
        Module::Equipment,
        Module::Progress,
        Module::Cost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Manpower => "manpower",
            Module::Equipment => "equipment",
            Module::Progress => "progress",
            Module::Cost => "cost",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Module::Manpower => "Manpower",
            Module::Equipment => "Equipment",
            Module::Progress => "Work Progress",
            Module::Cost => "Cost",
        }
    }

    /// Canonical fields every normalized row of this module carries.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Module::Manpower => &["date", "discipline", "planned_headcount", "actual_headcount"],
            Module::Equipment => &["timestamp", "discipline", "equipment_id", "status", "hours_idle"],
            Module::Progress => &["date", "discipline", "planned_progress_pct", "actual_progress_pct"],
            Module::Cost => &["date", "discipline", "budget_amount", "actual_spend", "cost_code"],
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manpower" => Ok(Module::Manpower),
            "equipment" => Ok(Module::Equipment),
            "progress" => Ok(Module::Progress),
            "cost" => Ok(Module::Cost),
            _ => Err(UnknownModule(s.to_string())),
        }
    }
}

/// Traffic-light classification of a KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Good,
    Warning,
    Danger,
    Neutral,
}

impl fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KpiStatus::Good => "good",
            KpiStatus::Warning => "warning",
            KpiStatus::Danger => "danger",
            KpiStatus::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// A KPI display value. Counts stay JSON numbers and preformatted values
/// stay strings across a serialize/deserialize cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiValue {
    Count(i64),
    Text(String),
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Count(n) => write!(f, "{}", n),
            KpiValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KpiValue {
    fn from(n: i64) -> Self {
        KpiValue::Count(n)
    }
}

impl From<usize> for KpiValue {
    fn from(n: usize) -> Self {
        KpiValue::Count(n as i64)
    }
}

impl From<String> for KpiValue {
    fn from(s: String) -> Self {
        KpiValue::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: String,
    pub label: String,
    pub value: KpiValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    pub status: KpiStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_label: Option<String>,
}

impl Kpi {
    pub fn new(id: &str, label: &str, value: impl Into<KpiValue>, status: KpiStatus) -> Self {
        Kpi {
            id: id.to_string(),
            label: label.to_string(),
            value: value.into(),
            delta: None,
            status,
            unit: None,
            sub_label: None,
        }
    }

    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.delta = Some(delta.into());
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_sub_label(mut self, sub_label: &str) -> Self {
        self.sub_label = Some(sub_label.to_string());
        self
    }

    /// `label: value (delta)` as used in chat answers and summaries.
    pub fn headline(&self) -> String {
        match &self.delta {
            Some(d) => format!("{}: {} ({})", self.label, self.value, d),
            None => format!("{}: {}", self.label, self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualType {
    Line,
    Bar,
    StackedBar,
    StatusGrid,
    Table,
    Donut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub key: String,
    pub name: String,
    pub color: String,
}

impl ChartSeries {
    pub fn new(key: &str, name: &str, color: &str) -> Self {
        ChartSeries {
            key: key.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

impl TableColumn {
    pub fn new(key: &str, label: &str) -> Self {
        TableColumn {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

/// Render-agnostic chart or table description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visual {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VisualType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<ChartSeries>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<TableColumn>>,
    #[serde(default)]
    pub data: Vec<Record>,
}

impl Visual {
    pub fn chart(
        id: &str,
        kind: VisualType,
        title: &str,
        x_key: &str,
        series: Vec<ChartSeries>,
        data: Vec<Record>,
    ) -> Self {
        Visual {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            x_key: Some(x_key.to_string()),
            series: Some(series),
            columns: None,
            data,
        }
    }

    pub fn table(id: &str, title: &str, columns: Vec<TableColumn>, data: Vec<Record>) -> Self {
        Visual {
            id: id.to_string(),
            kind: VisualType::Table,
            title: title.to_string(),
            x_key: None,
            series: None,
            columns: Some(columns),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecMeta {
    pub disciplines: Vec<String>,
    pub date_min: String,
    pub date_max: String,
}

/// Complete output of one aggregation run for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpec {
    pub kpis: Vec<Kpi>,
    pub visuals: Vec<Visual>,
    pub insights: Vec<String>,
    pub meta: SpecMeta,
    pub last_updated: DateTime<Utc>,
}

impl DashboardSpec {
    pub fn kpi(&self, id: &str) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.id == id)
    }

    /// First KPI whose id contains `needle`.
    pub fn kpi_matching(&self, needle: &str) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.id.contains(needle))
    }

    pub fn visual(&self, id: &str) -> Option<&Visual> {
        self.visuals.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "KPI")]
    #[tabled(rename = "KPI")]
    pub label: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&Kpi> for KpiRow {
    fn from(k: &Kpi) -> Self {
        KpiRow {
            label: k.label.clone(),
            value: k.value.to_string(),
            delta: k.delta.clone().unwrap_or_default(),
            status: k.status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn module_parses_case_insensitively() {
        assert_eq!("Manpower".parse::<Module>().unwrap(), Module::Manpower);
        assert_eq!(" COST ".parse::<Module>().unwrap(), Module::Cost);
        assert!("payroll".parse::<Module>().is_err());
    }

    #[test]
    fn kpi_values_keep_their_json_type() {
        let values = vec![KpiValue::Count(12), KpiValue::Text("12".to_string()), KpiValue::Text("12.0%".to_string())];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[12,"12","12.0%"]"#);
        let back: Vec<KpiValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn kpi_serializes_camel_case_and_skips_missing() {
        let kpi = Kpi::new("total_actual", "Avg Daily Actual", 42usize, KpiStatus::Good)
            .with_sub_label("Actual headcount/day");
        let v = serde_json::to_value(&kpi).unwrap();
        assert_eq!(v["subLabel"], "Actual headcount/day");
        assert!(v.get("delta").is_none());
        assert_eq!(v["status"], "good");
    }

    #[test]
    fn headline_includes_delta_when_present() {
        let kpi = Kpi::new("variance_pct", "Overall Variance", "-4.0%".to_string(), KpiStatus::Good)
            .with_delta("8 workers");
        assert_eq!(kpi.headline(), "Overall Variance: -4.0% (8 workers)");
    }
}
