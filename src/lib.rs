//! Core library for the aideon-consolidate command line application.
//!
//! The library merges every spreadsheet in a directory into one workbook.
//! Ordinary sheets are replicated with their formatting, and the designated
//! summary sheets are stacked into a single consolidated sheet placed first.
//! IO adapters live under [`aideon::consolidate::io`], the in-memory workbook
//! under [`aideon::consolidate::model`], and the run itself in
//! [`aideon::consolidate::orchestrator`].

pub mod aideon;

pub use aideon::consolidate::{
    ConsolidateError, ConsolidateOptions, FileStage, HeaderPolicy, LegacyMode, Result, RunReport,
    SkippedFile, config, consolidate, error, io, model, naming, orchestrator, replicate, style,
    summary,
};
