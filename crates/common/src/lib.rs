//! Shared plumbing for the ONO notes workspace.

pub mod utils;

pub use utils::logging::{init_logging, LogFormat};
