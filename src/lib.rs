pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

// Record shapes shared across layers
pub mod domain;
