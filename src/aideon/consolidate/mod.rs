pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod replicate;
pub mod style;
pub mod summary;

pub use config::{ConsolidateOptions, HeaderPolicy, LegacyMode};
pub use error::{ConsolidateError, Result};
pub use orchestrator::{FileStage, RunReport, SkippedFile, consolidate};
