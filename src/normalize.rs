//! Row normalization.
//!
//! Two strategies, kept apart on purpose:
//!
//! - [`normalize_row`]: prefix containment over the row's own keys, for
//!   semi-structured rows whose headers already resemble canonical names.
//! - [`apply_column_map`]: applies a [`ColumnMap`] built by the synonym
//!   matcher, for arbitrary spreadsheets.
//!
//! Both always produce every requested field (empty string when nothing
//! matched) and never fail. Values stay strings; numeric coercion happens
//! in the aggregators.

use indexmap::IndexMap;

use crate::matcher::ColumnMap;

/// Raw header -> cell value, in column order.
pub type RawRow = IndexMap<String, String>;

/// Canonical field -> raw cell value, required fields first.
pub type NormalizedRow = IndexMap<String, String>;

const PREFIX_LEN: usize = 6;

/// Key normalization for the prefix strategy: lowercase, whitespace runs
/// become `_`, anything outside `[a-z0-9_]` is dropped.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_space = false;
    for ch in key.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            out.push(ch);
        }
    }
    out
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| *c != '_').collect()
}

/// Extract `fields` from a raw row by exact key or truncated-prefix
/// containment. The first matching key in row order wins.
pub fn normalize_row<S: AsRef<str>>(row: &RawRow, fields: &[S]) -> NormalizedRow {
    let mut by_key: IndexMap<String, &str> = IndexMap::with_capacity(row.len());
    for (k, v) in row {
        by_key.insert(normalize_key(k), v.as_str());
    }

    let mut out = NormalizedRow::with_capacity(fields.len());
    for field in fields {
        let field = field.as_ref();
        let prefix: String = squash(field).chars().take(PREFIX_LEN).collect();
        let value = by_key
            .iter()
            .find(|(k, _)| k.as_str() == field || (!prefix.is_empty() && squash(k).contains(&prefix)))
            .map(|(_, v)| (*v).to_string())
            .unwrap_or_default();
        out.insert(field.to_string(), value);
    }
    out
}

/// A row after synonym mapping: canonical fields plus the untouched raw
/// cells, so unmatched headers stay traceable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
    pub fields: NormalizedRow,
    pub raw: RawRow,
}

/// Apply a column map to one row of cells aligned with `headers`.
///
/// Required fields are seeded empty so they are always present; when
/// several headers map to one field the last one wins.
pub fn apply_column_map<S: AsRef<str>>(
    headers: &[String],
    cells: &[String],
    map: &ColumnMap,
    required: &[S],
) -> MappedRow {
    let mut fields = NormalizedRow::with_capacity(required.len());
    for field in required {
        fields.insert(field.as_ref().to_string(), String::new());
    }
    let mut raw = RawRow::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let value = cells.get(idx).cloned().unwrap_or_default();
        if let Some(field) = map.get(header) {
            fields.insert((*field).to_string(), value.clone());
        }
        raw.insert(header.clone(), value);
    }
    MappedRow { fields, raw }
}
