//! Fuzzy header matching for arbitrary spreadsheet uploads.
//!
//! Every module owns its own synonym table. A header is normalized
//! (lowercase, trimmed, runs of whitespace/underscore/hyphen collapsed to a
//! single `_`), then matched against canonical field names exactly, and
//! only then against synonyms by equality or substring containment. The
//! first canonical field in declaration order whose synonym matches wins,
//! so table order is part of the contract.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::types::Module;

/// Raw header -> canonical field. Unmatched headers are absent.
pub type ColumnMap = IndexMap<String, &'static str>;

#[derive(Debug)]
pub struct SynonymTable {
    entries: Vec<(&'static str, &'static [&'static str])>,
}

impl SynonymTable {
    pub fn new(entries: Vec<(&'static str, &'static [&'static str])>) -> Self {
        SynonymTable { entries }
    }

    /// Canonical fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(field, _)| *field)
    }

    /// Built-in table for `module`.
    pub fn for_module(module: Module) -> &'static SynonymTable {
        match module {
            Module::Manpower => &MANPOWER,
            Module::Equipment => &EQUIPMENT,
            Module::Progress => &PROGRESS,
            Module::Cost => &COST,
        }
    }
}

// Optional fields (company, equipment_type, wbs_code, ...) are declared so
// they claim their headers instead of leaking into a required field through
// a substring synonym. Narrow fields come before broad ones.

static MANPOWER: Lazy<SynonymTable> = Lazy::new(|| {
    SynonymTable::new(vec![
        ("date", &["date", "day", "period", "week"]),
        ("discipline", &["discipline", "trade", "category", "dept", "department", "crew", "team"]),
        ("company", &["company", "contractor", "vendor", "subcontractor", "firm"]),
        ("nationality", &["nationality", "national", "country", "origin"]),
        ("planned_headcount", &["planned_headcount", "planned", "plan", "target", "required"]),
        ("actual_headcount", &["actual_headcount", "actual", "current", "present", "on_site", "onsite", "headcount"]),
    ])
});

static EQUIPMENT: Lazy<SynonymTable> = Lazy::new(|| {
    SynonymTable::new(vec![
        ("timestamp", &["timestamp", "datetime", "date", "logged_at"]),
        ("discipline", &["discipline", "trade", "dept", "department", "crew", "team"]),
        ("hours_idle", &["hours_idle", "idle_hours", "idle_time", "downtime", "idle", "standby_hours", "standby"]),
        ("status", &["status", "state", "condition", "availability"]),
        ("equipment_type", &["equipment_type", "type", "model", "class", "category"]),
        ("equipment_id", &["equipment_id", "asset_id", "asset", "tag", "unit", "equipment", "id"]),
    ])
});

static PROGRESS: Lazy<SynonymTable> = Lazy::new(|| {
    SynonymTable::new(vec![
        ("date", &["date", "day", "period", "week"]),
        ("discipline", &["discipline", "trade", "category", "dept", "department", "team"]),
        ("activity_id", &["activity_id", "task_id", "activity_code"]),
        ("wbs_code", &["wbs_code", "wbs", "work_breakdown"]),
        ("activity_name", &["activity_name", "activity", "task", "description"]),
        ("weight", &["weight", "weighted", "priority", "importance"]),
        ("planned_progress_pct", &["planned_progress_pct", "planned_progress", "planned_pct", "target_progress", "baseline", "planned", "plan"]),
        ("actual_progress_pct", &["actual_progress_pct", "actual_progress", "actual_pct", "current_progress", "achieved", "actual", "progress"]),
    ])
});

static COST: Lazy<SynonymTable> = Lazy::new(|| {
    SynonymTable::new(vec![
        ("date", &["date", "day", "period", "month"]),
        ("discipline", &["discipline", "trade", "category", "dept", "department", "team"]),
        ("cost_code", &["cost_code", "code", "account", "gl_code", "wbs"]),
        ("description", &["description", "desc", "item", "narrative"]),
        ("currency", &["currency", "curr", "ccy"]),
        ("forecast_amount", &["forecast_amount", "forecast", "projected", "estimate", "eac"]),
        ("committed_amount", &["committed_amount", "committed", "commitment", "purchase_order", "contracted"]),
        ("budget_amount", &["budget_amount", "budget", "planned", "approved", "authorized", "baseline"]),
        ("actual_spend", &["actual_spend", "actual_amount", "actual", "spent", "spend", "paid", "invoiced", "incurred"]),
    ])
});

/// Lowercase, trim, and collapse whitespace/underscore/hyphen runs to `_`.
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut in_sep = false;
    for ch in header.trim().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !in_sep {
                out.push('_');
                in_sep = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            in_sep = false;
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderMatcher<'a> {
    table: &'a SynonymTable,
}

impl<'a> HeaderMatcher<'a> {
    pub fn new(table: &'a SynonymTable) -> Self {
        HeaderMatcher { table }
    }

    pub fn for_module(module: Module) -> HeaderMatcher<'static> {
        HeaderMatcher::new(SynonymTable::for_module(module))
    }

    pub fn match_header(&self, raw: &str) -> Option<&'static str> {
        let header = normalize_header(raw);
        if header.is_empty() {
            return None;
        }
        if let Some(field) = self.table.fields().find(|f| *f == header) {
            return Some(field);
        }
        self.table
            .entries
            .iter()
            .find(|(_, synonyms)| synonyms.iter().any(|s| header == *s || header.contains(s)))
            .map(|(field, _)| *field)
    }

    /// Map every header that resolves to a canonical field.
    pub fn build_column_map<S: AsRef<str>>(&self, headers: &[S]) -> ColumnMap {
        let mut map = ColumnMap::new();
        for header in headers {
            let header = header.as_ref();
            if let Some(field) = self.match_header(header) {
                map.insert(header.to_string(), field);
            }
        }
        map
    }
}
