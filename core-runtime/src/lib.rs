//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the download core:
//! - Logging and tracing setup ([`logging`])
//! - Collaborator wiring and fail-fast validation ([`config`])
//! - Download lifecycle event bus ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, DownloadEvent, EventBus};
