//! Final report output port.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::models::ValidationOutcome;

/// Destination for the run's accumulated validation outcomes.
///
/// Write failures are logged by the caller and never affect the run's
/// exit code.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Render and persist `outcomes` to `path`.
    async fn write(&self, outcomes: &[ValidationOutcome], path: &Path) -> std::io::Result<()>;
}
