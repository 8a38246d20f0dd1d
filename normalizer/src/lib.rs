//! # Matzbiim - voter file normalization
//!
//! Matzbiim streams large delimited voter files (such as the NYS Board of
//! Elections statewide extract) through per-column handlers and writes a
//! clean CSV with a header row.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Source file │────▶│   Parser    │────▶│  Transform  │────▶│  Excel CSV  │
//! │ (any delim) │     │  (sniffer)  │     │ (registry)  │     │  + header   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use matzbiim::{handler, HandlerRegistry, HandlerResult, NullObserver, StreamPipeline};
//! use std::path::Path;
//!
//! fn registration_status(value: &str) -> HandlerResult { Ok(value.to_string()) }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(handler!(registration_status));
//!
//! let columns = vec!["id".to_string(), "registration_status".to_string()];
//! let summary = StreamPipeline::new(&registry, columns)
//!     .run_files(Path::new("in.txt"), Path::new("out.csv"), &mut NullObserver)?;
//! println!("{}", summary.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Console and JSON-lines logging
//! - [`parser`] - Dialect and encoding detection
//! - [`transform`] - Handler registry, record transformer, and pipeline
//! - [`layout`] - Built-in and file-based column layouts
//! - [`source`] - Source file discovery
//! - [`report`] - Pipeline observers and progress display

// Core modules
pub mod error;
pub mod logs;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Layouts
pub mod layout;

// Sources
pub mod source;

// Reporting
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DialectError,
    DiscoveryError,
    HandlerError,
    HandlerResult,
    LayoutError,
    PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Dialect detection
// =============================================================================

pub use parser::{
    detect_dialect,
    detect_encoding,
    sniff_file,
    Dialect,
    DEFAULT_SAMPLE_SIZE,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    count_rows,
    DropReason,
    DroppedRecord,
    FieldFault,
    Handler,
    HandlerRegistry,
    Interrupt,
    PipelineOptions,
    Record,
    RecordOutcome,
    RecordTransformer,
    RunSummary,
    Stage,
    StreamPipeline,
};

// =============================================================================
// Re-exports - Layouts
// =============================================================================

pub use layout::{
    builtin,
    example_layout,
    operations_description,
    Layout,
    LayoutFile,
    Operation,
    BUILTIN_LAYOUTS,
};

// =============================================================================
// Re-exports - Discovery and reporting
// =============================================================================

pub use report::{ConsoleObserver, NullObserver, PipelineObserver};
pub use source::{find_source_files, select_source};
