//! Construction-site dashboard pipeline.
//!
//! A spreadsheet upload for one module (manpower, equipment, progress or
//! cost) is loaded, its headers are matched to canonical fields, rows are
//! normalized and aggregated into a [`DashboardSpec`]. Specs are stored
//! per `(project, module)`, answered against by a rule-based responder and
//! exported as plain reports.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod store;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{IngestError, IngestResult, StoreError, StoreResult};
pub use pipeline::{process, MatchStrategy, Processed};
pub use query::{answer, Answer};
pub use store::{FileSpecStore, MemorySpecStore, SpecKey, SpecStore};
pub use types::{DashboardSpec, Kpi, KpiStatus, KpiValue, Module};
