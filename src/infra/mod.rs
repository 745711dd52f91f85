pub mod csv_sink;
pub mod csv_source;
pub mod report_adapter;

pub use csv_sink::CsvFileSink;
pub use csv_source::CsvFileSource;
pub use report_adapter::{JsonReportAdapter, LogReportAdapter};
