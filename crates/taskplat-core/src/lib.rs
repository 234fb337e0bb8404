//! `taskplat-core`: types, configuration and errors shared by every taskplat crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PanicPolicy, PlatformConfig, SchedulerConfig};
pub use error::{PlatformError, Result};
pub use types::{ContextRef, ExpectedRuntime};
