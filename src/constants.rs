/// Environment variables recognized by the binary
pub const CONFIG_PATH_ENV: &str = "LAYOFFS_CONFIG";
pub const LOG_DIR_ENV: &str = "LAYOFFS_LOG_DIR";
pub const METRICS_ADDR_ENV: &str = "LAYOFFS_METRICS_ADDR";

pub const DEFAULT_CONFIG_PATH: &str = "config/cleaning.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "layoffs_cleaner.log";

/// Input date layout, e.g. `3/14/2023`
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Cell text the CSV source reads as a null
pub const DEFAULT_NULL_MARKER: &str = "NULL";

/// Parse failures listed individually in the run report; the rest are only counted
pub const MAX_REPORTED_PARSE_FAILURES: usize = 25;

pub const REPORT_SCHEMA_VERSION: &str = "v1";
