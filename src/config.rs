use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;
pub const DEFAULT_STORE_DIR: &str = "argus_store";
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Runtime settings resolved from flags and `ARGUS_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_upload_mb: u64,
    pub store_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
        }
    }
}
