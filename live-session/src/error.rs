use live_net::transport::TransportError;
use thiserror::Error;

/// Errors surfaced to the caller. Teardown failures are deliberately
/// absent: a failed stop is logged and swallowed so leaving is never
/// blocked by a flaky network.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The live-streaming capability flag is off. Checked before any I/O.
    #[error("live streaming is not available")]
    FeatureDisabled,
    /// The gateway rejected or failed the start call. The controller is
    /// back in `Error` until acknowledged; retry is a fresh start.
    #[error("failed to go live: {0}")]
    StartFailed(String),
    /// Viewer credential resolution failed. Terminal for this mount.
    #[error("failed to connect to stream: {0}")]
    WatchResolutionFailed(String),
    #[error("realtime channel error: {0}")]
    Channel(#[from] TransportError),
}
