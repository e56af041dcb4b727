//! Ingest pipeline: raw table in, dashboard spec out.
//!
//! Strategy selection happens here; the matcher, the normalizers and the
//! aggregators never know about each other.

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::error::{IngestError, IngestResult};
use crate::loader::RawTable;
use crate::matcher::{ColumnMap, HeaderMatcher};
use crate::normalize::{apply_column_map, normalize_row, NormalizedRow, RawRow};
use crate::types::{DashboardSpec, Module};

/// How raw headers are resolved to canonical fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MatchStrategy {
    /// Per-module synonym tables (arbitrary spreadsheets).
    #[default]
    Synonym,
    /// Six-character prefix containment (headers already close to canonical).
    Prefix,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStrategy::Synonym => "synonym",
            MatchStrategy::Prefix => "prefix",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub module: Module,
    pub spec: DashboardSpec,
    /// Only present for the synonym strategy.
    pub column_map: Option<ColumnMap>,
    pub unmapped_headers: Vec<String>,
    pub row_count: usize,
}

/// Normalize every row of `table` for `module` with the chosen strategy.
pub fn normalize_table(table: &RawTable, module: Module, strategy: MatchStrategy) -> (Vec<NormalizedRow>, Option<ColumnMap>) {
    let required = module.required_fields();
    match strategy {
        MatchStrategy::Synonym => {
            let map = HeaderMatcher::for_module(module).build_column_map(&table.headers);
            let rows = table
                .rows
                .iter()
                .map(|cells| apply_column_map(&table.headers, cells, &map, required).fields)
                .collect();
            (rows, Some(map))
        }
        MatchStrategy::Prefix => {
            let rows = table.records().iter().map(|row| normalize_row(row, required)).collect();
            (rows, None)
        }
    }
}

fn unmapped_headers(table: &RawTable, module: Module, column_map: Option<&ColumnMap>) -> Vec<String> {
    match column_map {
        Some(map) => table
            .headers
            .iter()
            .filter(|h| !map.contains_key(h.as_str()))
            .cloned()
            .collect(),
        None => {
            // Normalizing a row whose values are its own headers reports
            // which header each field was taken from.
            let echo: RawRow = table.headers.iter().map(|h| (h.clone(), h.clone())).collect();
            let used = normalize_row(&echo, module.required_fields());
            table
                .headers
                .iter()
                .filter(|h| !used.values().any(|v| v == *h))
                .cloned()
                .collect()
        }
    }
}

/// Run one upload through matching, normalization and aggregation.
///
/// A table without data rows is rejected up front so nothing partial is
/// ever aggregated.
pub fn process(
    table: &RawTable,
    module: Module,
    strategy: MatchStrategy,
    generated_at: DateTime<Utc>,
) -> IngestResult<Processed> {
    if table.headers.is_empty() || table.rows.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let (rows, column_map) = normalize_table(table, module, strategy);
    let unmapped = unmapped_headers(table, module, column_map.as_ref());
    if let Some(map) = &column_map {
        debug!(module = %module, mapped = ?map, "column map built");
        let missing: Vec<&str> = module
            .required_fields()
            .iter()
            .copied()
            .filter(|f| !map.values().any(|v| v == f))
            .collect();
        if !missing.is_empty() {
            warn!(module = %module, ?missing, "required fields not found in headers, treating as empty");
        }
    }

    let spec = aggregate(module, &rows, generated_at);
    info!(
        module = %module,
        strategy = %strategy,
        rows = rows.len(),
        unmapped = unmapped.len(),
        "aggregated upload"
    );
    Ok(Processed {
        module,
        spec,
        column_map,
        unmapped_headers: unmapped,
        row_count: rows.len(),
    })
}
