//! Transformation module.
//!
//! This module handles record normalization:
//! - Registry: Column name to handler bindings
//! - Record: Per-record transformation with skip and fault outcomes
//! - Count: Row count pre-pass and interrupt flag
//! - Pipeline: Streaming source to sink pipeline

pub mod count;
pub mod pipeline;
pub mod record;
pub mod registry;

pub use count::{count_rows, Interrupt};
pub use pipeline::*;
pub use record::{FieldFault, Record, RecordOutcome, RecordTransformer};
pub use registry::{Handler, HandlerRegistry};
