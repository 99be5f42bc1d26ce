pub mod message;
pub mod metrics;
pub mod telemetry;
pub mod transport;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
