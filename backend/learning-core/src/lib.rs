//! Course progression and lesson discussion engines for the video learning
//! platform. Both engines are synchronous, perform no I/O and expect the host
//! to serialize calls.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use errors::{EngineError, EngineResult, ErrorKind};
pub use services::{CommentService, PlatformState, ProgressService};
