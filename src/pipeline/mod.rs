// Cleaning pipeline: loading, the processing stages, and in-memory storage

pub mod cleaning;
pub mod index;
pub mod ingestion;
pub mod processing;
pub mod storage;

pub use cleaning::{CleaningPipeline, PipelineOutcome};
pub use index::LookupIndexes;
