//! Report freshness guard.

use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::domain::errors::CoverageError;

/// Verify the report at `path` exists and was modified strictly after
/// `reference_time_ms`.
///
/// The test command regenerates the report as a side effect; an absent or
/// stale file means the run did not actually measure the source file, and
/// trusting an old report would corrupt the stop/continue signal. The
/// boundary is exclusive: a report whose mtime equals the reference time
/// is stale.
pub async fn verify_report_update(
    path: &Path,
    reference_time_ms: i64,
) -> Result<(), CoverageError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoverageError::ReportMissing(path.to_path_buf()));
        }
        Err(err) => {
            return Err(CoverageError::Io { path: path.to_path_buf(), source: err });
        }
    };

    let modified = metadata
        .modified()
        .map_err(|err| CoverageError::Io { path: path.to_path_buf(), source: err })?;
    let mtime_ms = system_time_millis(modified);

    if mtime_ms <= reference_time_ms {
        return Err(CoverageError::ReportStale {
            path: path.to_path_buf(),
            mtime_ms,
            reference_ms: reference_time_ms,
        });
    }

    Ok(())
}

/// Milliseconds since the Unix epoch for a filesystem timestamp.
pub(crate) fn system_time_millis(time: std::time::SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
