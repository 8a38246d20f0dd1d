//! Error types for the normalization pipeline.
//!
//! - [`DialectError`] - Delimiter/quoting detection errors
//! - [`HandlerError`] - Outcomes a column handler may raise instead of a value
//! - [`LayoutError`] - Layout loading and compilation errors
//! - [`DiscoveryError`] - Source file lookup errors
//! - [`PipelineError`] - Fatal run errors
//!
//! Only [`PipelineError`] ever terminates a run. Handler errors are caught per
//! record and reported by the pipeline.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Dialect Detection Errors
// =============================================================================

/// Errors while sniffing the source dialect.
#[derive(Debug, Error)]
pub enum DialectError {
    /// Nothing to sniff.
    #[error("Source is empty, cannot detect dialect")]
    EmptySample,

    /// None of the candidate delimiters appears in the sample.
    #[error("Could not determine delimiter from sample starting with '{0}'")]
    UndetectableDelimiter(String),
}

// =============================================================================
// Handler Outcomes
// =============================================================================

/// Non-value outcome of a column handler.
///
/// `Skip` is a control signal: the whole record is dropped without being
/// reported as a failure. `Fault` means the handler could not make sense of
/// the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Drop the entire record.
    #[error("record skipped")]
    Skip,

    /// The value could not be transformed.
    #[error("{0}")]
    Fault(String),
}

impl HandlerError {
    pub fn fault(message: impl Into<String>) -> Self {
        HandlerError::Fault(message.into())
    }
}

impl From<chrono::ParseError> for HandlerError {
    fn from(err: chrono::ParseError) -> Self {
        HandlerError::Fault(format!("invalid date: {}", err))
    }
}

// =============================================================================
// Layout Errors
// =============================================================================

/// Errors loading or compiling a column layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// No built-in layout with that name.
    #[error("Unknown layout '{0}'")]
    UnknownLayout(String),

    /// Layout declares no columns.
    #[error("Layout '{0}' declares no columns")]
    NoColumns(String),

    /// Same column declared twice.
    #[error("Column '{0}' is declared more than once")]
    DuplicateColumn(String),

    /// A binding targets a column the layout does not declare.
    #[error("Binding targets unknown column '{0}'")]
    UnknownColumn(String),

    /// An operation could not be compiled.
    #[error("Invalid operation for column '{column}': {message}")]
    InvalidOperation { column: String, message: String },

    /// IO error.
    #[error("Layout IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Layout JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Discovery Errors
// =============================================================================

/// Errors locating a source file.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No file matches the prefix.
    #[error("No files matching '{prefix}*' found in {}", .dir.display())]
    NoMatch { dir: PathBuf, prefix: String },

    /// More than one file matches and none was chosen.
    #[error("{} files match '{prefix}*', pass one explicitly: {}", .candidates.len(), display_paths(.candidates))]
    Ambiguous {
        prefix: String,
        candidates: Vec<PathBuf>,
    },

    /// Glob pattern error.
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Fatal errors that terminate a run.
///
/// Record-scoped problems (skips, field faults, rejected writes) never
/// surface here; they end up in the run summary instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source cannot be opened.
    #[error("Cannot open source {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sink cannot be created.
    #[error("Cannot create output {}: {source}", .path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dialect detection failed.
    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),

    /// The sink failed partway through a row, leaving a fragment behind.
    #[error("Output is incomplete: writing the row from line {line} failed partway: {source}")]
    PartialWrite {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    /// Stream-level IO failure (read, rewind, flush).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV stream error that is not attributable to a single record.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Layout error.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Source discovery error.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dialect detection.
pub type DialectResult<T> = Result<T, DialectError>;

/// Result type returned by column handlers.
pub type HandlerResult = Result<String, HandlerError>;

/// Result type for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Result type for source discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let dialect_err = DialectError::EmptySample;
        let pipeline_err: PipelineError = dialect_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let layout_err = LayoutError::UnknownLayout("ohio".into());
        let pipeline_err: PipelineError = layout_err.into();
        assert!(pipeline_err.to_string().contains("ohio"));
    }

    #[test]
    fn test_date_parse_error_becomes_fault() {
        let err = chrono::NaiveDate::parse_from_str("2020-99-99", "%Y%m%d").unwrap_err();
        match HandlerError::from(err) {
            HandlerError::Fault(msg) => assert!(msg.starts_with("invalid date")),
            HandlerError::Skip => panic!("parse error must not skip"),
        }
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = DiscoveryError::Ambiguous {
            prefix: "AllNYSVoters".into(),
            candidates: vec![PathBuf::from("data/AllNYSVoters_a.txt"), PathBuf::from("data/AllNYSVoters_b.txt")],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 files"));
        assert!(msg.contains("AllNYSVoters_a.txt"));
        assert!(msg.contains("AllNYSVoters_b.txt"));
    }
}
