//! Plain-text/CSV dashboard reports.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::types::{DashboardSpec, Module};

/// What the report covers; empty disciplines means all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportScope {
    pub disciplines: Vec<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ReportScope {
    /// Full date range of `spec`, all disciplines.
    pub fn of(spec: &DashboardSpec) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ReportScope {
            disciplines: Vec::new(),
            date_from: non_empty(&spec.meta.date_min),
            date_to: non_empty(&spec.meta.date_max),
        }
    }

    pub fn with_disciplines(mut self, disciplines: Vec<String>) -> Self {
        self.disciplines = disciplines;
        self
    }

    /// Override either end of the date range; `None` keeps the current one.
    pub fn with_dates(mut self, from: Option<String>, to: Option<String>) -> Self {
        if from.is_some() {
            self.date_from = from;
        }
        if to.is_some() {
            self.date_to = to;
        }
        self
    }
}

pub fn render_report(module: Module, spec: &DashboardSpec, scope: &ReportScope, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("ARGUS REPORT - {} MODULE", module.as_str().to_uppercase()),
        format!("Generated: {}", generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        format!(
            "Disciplines: {}",
            if scope.disciplines.is_empty() { "All".to_string() } else { scope.disciplines.join(", ") }
        ),
        format!(
            "Date Range: {} to {}",
            scope.date_from.as_deref().unwrap_or("N/A"),
            scope.date_to.as_deref().unwrap_or("N/A")
        ),
        String::new(),
        "KPIs:".to_string(),
    ];
    for k in &spec.kpis {
        match &k.delta {
            Some(d) => lines.push(format!("{},{},{}", k.label, k.value, d)),
            None => lines.push(format!("{},{}", k.label, k.value)),
        }
    }
    lines.push(String::new());
    lines.push("Insights:".to_string());
    lines.extend(spec.insights.iter().cloned());
    lines.join("\n")
}

/// File name stamp: RFC 3339 with `:` and `.` replaced so it is safe on
/// every filesystem.
pub fn report_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(|c: char| c == ':' || c == '.', "-")
}

/// Render and write `<dir>/<module>_<stamp>.csv`, returning its path.
pub fn write_report(
    dir: &Path,
    module: Module,
    spec: &DashboardSpec,
    scope: &ReportScope,
    generated_at: DateTime<Utc>,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_{}.csv", module.as_str(), report_stamp(generated_at)));
    fs::write(&path, render_report(module, spec, scope, generated_at))?;
    info!(path = %path.display(), module = %module, "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::cost::{self, CostRecord};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap()
    }

    fn spec() -> DashboardSpec {
        let rows = vec![CostRecord {
            date: "2024-03-01".into(),
            discipline: "Civil".into(),
            budget: 1000.0,
            spend: 900.0,
            cost_code: "C-1".into(),
        }];
        cost::compute(&rows, at())
    }

    #[test]
    fn renders_header_kpis_and_insights() {
        let spec = spec();
        let text = render_report(Module::Cost, &spec, &ReportScope::of(&spec), at());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            &lines[..8],
            &[
                "ARGUS REPORT - COST MODULE",
                "Generated: 2024-04-02T09:30:00.000Z",
                "Disciplines: All",
                "Date Range: 2024-03-01 to 2024-03-01",
                "",
                "KPIs:",
                "Total Budget,1000",
                "Total Spent,900",
            ]
        );
        assert_eq!(lines[8], "Cost Variance,100,10.0%");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "Insights:");
        assert_eq!(lines[12], "Total spend is within budget by 100 (10.0%).");
    }

    #[test]
    fn scope_without_dates_prints_na() {
        let empty = cost::compute(&[], at());
        let scope = ReportScope::of(&empty).with_disciplines(vec!["Civil".into(), "MEP".into()]);
        let text = render_report(Module::Cost, &empty, &scope, at());
        assert!(text.contains("\nDisciplines: Civil, MEP\n"));
        assert!(text.contains("\nDate Range: N/A to N/A\n"));
    }

    #[test]
    fn explicit_dates_override_spec_range() {
        let spec = spec();
        let scope = ReportScope::of(&spec).with_dates(Some("2024-01-01".into()), None);
        let text = render_report(Module::Cost, &spec, &scope, at());
        assert!(text.contains("\nDate Range: 2024-01-01 to 2024-03-01\n"));

        let empty = cost::compute(&[], at());
        let scope = ReportScope::of(&empty).with_dates(None, Some("2024-06-30".into()));
        let text = render_report(Module::Cost, &empty, &scope, at());
        assert!(text.contains("\nDate Range: N/A to 2024-06-30\n"));
    }

    #[test]
    fn writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let path = write_report(dir.path(), Module::Cost, &spec, &ReportScope::default(), at()).unwrap();
        assert_eq!(path.file_name().unwrap(), "cost_2024-04-02T09-30-00-000Z.csv");
        let body = fs::read_to_string(path).unwrap();
        assert!(body.starts_with("ARGUS REPORT - COST MODULE\n"));
    }
}
