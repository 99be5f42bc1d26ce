// Client-side lifecycle for live broadcasts: the broadcaster's session
// state machine and the viewer's room-channel client. The signaling
// gateway and the media plane behind its tokens are external services.

pub mod config;
pub mod error;
pub mod session;
pub mod viewer;

pub use config::LiveSettings;
pub use error::SessionError;
pub use session::{BroadcasterController, SessionState};
pub use viewer::{ChatMessage, ViewerSession, MAX_CHAT_LEN, MESSAGE_LOG_CAP};

pub type BoxError = live_net::BoxError;

pub const METRICS_PATH: &str = "/metrics";
