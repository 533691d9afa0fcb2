pub mod config;
pub mod error;
pub mod lock;
pub mod types;

pub use config::{ensure_workdir, EngineConfig};
pub use error::{CrawlError, EnvironmentFault, PageFault, TransientFault};
pub use lock::{AlreadyRunning, WorkLock};
pub use types::*;
