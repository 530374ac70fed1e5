pub mod config;
pub mod error;
pub mod types;
pub mod wire;

pub use config::AppConfig;
pub use error::{FunnelError, FunnelResult, SourceError};
