//! Coverage report interpretation.
//!
//! Format-specific parsers that turn raw tool output into a normalized
//! [`CoverageResult`](crate::domain::models::CoverageResult), plus the
//! freshness guard that keeps the external tool's report writes and our
//! reads in distinct epochs.

mod cobertura;
mod freshness;
mod jacoco;
mod processor;

pub use freshness::verify_report_update;
pub(crate) use freshness::system_time_millis;
pub use processor::CoverageProcessor;
