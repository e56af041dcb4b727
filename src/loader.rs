use crate::error::{IngestError, IngestResult};
use crate::normalize::RawRow;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Headers plus cell rows aligned to them, exactly as read from the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows keyed by header. Ragged rows are padded with empty strings and
    /// a repeated header keeps the value of its last column.
    pub fn records(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|cells| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(idx, h)| (h.clone(), cells.get(idx).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }

    fn from_lines(mut lines: Vec<Vec<String>>) -> IngestResult<RawTable> {
        lines.retain(|cells| cells.iter().any(|c| !c.is_empty()));
        if lines.is_empty() {
            return Err(IngestError::EmptyFile);
        }
        let mut headers = lines.remove(0);
        if let Some(first) = headers.first_mut() {
            *first = first.trim_start_matches('\u{feff}').trim().to_string();
        }
        if lines.is_empty() {
            return Err(IngestError::EmptyFile);
        }
        Ok(RawTable { headers, rows: lines })
    }
}

/// Load a CSV or workbook file, enforcing the upload size cap.
pub fn load_table(path: &Path, max_upload_mb: u64) -> IngestResult<RawTable> {
    let size = std::fs::metadata(path)
        .map_err(|source| IngestError::Io { path: path.to_path_buf(), source })?
        .len();
    if size > max_upload_mb.saturating_mul(1024 * 1024) {
        return Err(IngestError::FileTooLarge { size, limit_mb: max_upload_mb });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        read_workbook(path)?
    } else {
        let file = std::fs::File::open(path)
            .map_err(|source| IngestError::Io { path: path.to_path_buf(), source })?;
        read_csv(file)?
    };
    info!(
        path = %path.display(),
        headers = table.headers.len(),
        rows = table.row_count(),
        "loaded table"
    );
    Ok(table)
}

/// Read CSV text: cells trimmed, blank lines skipped, ragged rows allowed.
pub fn read_csv<R: Read>(reader: R) -> IngestResult<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut lines = Vec::new();
    for result in rdr.records() {
        let record = result?;
        lines.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    RawTable::from_lines(lines)
}

/// Read the first sheet of a workbook.
pub fn read_workbook(path: &Path) -> IngestResult<RawTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::Workbook(e.to_string()))?;
    let sheet_names = workbook.sheet_names();
    let Some(first) = sheet_names.first().cloned() else {
        return Err(IngestError::EmptyFile);
    };
    debug!(sheets = ?sheet_names, using = %first, "reading workbook");
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IngestError::Workbook(e.to_string()))?;

    let lines = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .collect();
    RawTable::from_lines(lines)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Whole numbers come back from spreadsheets as floats.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.get(..10).unwrap_or(s).to_string(),
        Data::DurationIso(s) => s.clone(),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}
