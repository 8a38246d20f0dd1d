//! Column layouts
//!
//! A [`Layout`] names the ordered columns of a source file and carries the
//! [`HandlerRegistry`] that normalizes them. Layouts are either built in
//! (compiled Rust handlers, see [`nys`]) or loaded from a JSON [`LayoutFile`]
//! whose bindings chain declarative [`Operation`]s.

pub mod nys;
pub mod operations;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{LayoutError, LayoutResult};
use crate::transform::registry::{Handler, HandlerRegistry};
pub use operations::{apply_chain, operations_description, CompiledOperation, Operation};

/// Names accepted by [`builtin`].
pub const BUILTIN_LAYOUTS: &[&str] = &[nys::NAME];

/// A ready-to-run column layout.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    pub description: String,
    /// Field order of the source
    pub columns: Vec<String>,
    /// Whether the source starts with a header row to discard
    pub has_header: bool,
    /// File name prefix used to discover sources
    pub source_prefix: Option<String>,
    pub registry: HandlerRegistry,
}

impl Layout {
    /// JSON summary: columns in order and the handler bound to each.
    pub fn describe(&self) -> Value {
        let handlers: serde_json::Map<String, Value> = self
            .registry
            .bindings()
            .into_iter()
            .map(|(column, handler)| (column.to_string(), Value::String(handler.to_string())))
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "hasHeader": self.has_header,
            "sourcePrefix": self.source_prefix,
            "columns": self.columns,
            "handlers": handlers,
        })
    }
}

/// Built-in layout by name.
pub fn builtin(name: &str) -> LayoutResult<Layout> {
    match name {
        nys::NAME => Ok(nys::layout()),
        other => Err(LayoutError::UnknownLayout(other.to_string())),
    }
}

/// Serialized form of a layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutFile {
    /// Version of the layout format
    #[serde(default = "default_version")]
    pub version: String,

    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Ordered source columns
    pub columns: Vec<String>,

    #[serde(default)]
    pub has_header: bool,

    #[serde(default)]
    pub source_prefix: Option<String>,

    /// Operation chains bound to columns
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// One operation chain applied to each of `columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub columns: Vec<String>,
    pub operations: Vec<Operation>,
}

impl LayoutFile {
    /// Parse a layout from JSON string
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a layout file
    pub fn load(path: &Path) -> LayoutResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the layout and compile its bindings into a registry.
    ///
    /// Later bindings override earlier ones for the same column.
    pub fn compile(self) -> LayoutResult<Layout> {
        if self.columns.is_empty() {
            return Err(LayoutError::NoColumns(self.name));
        }

        let mut declared = HashSet::new();
        for column in &self.columns {
            if !declared.insert(column.as_str()) {
                return Err(LayoutError::DuplicateColumn(column.clone()));
            }
        }

        let mut registry = HandlerRegistry::new();
        for binding in self.bindings {
            if let Some(unknown) = binding.columns.iter().find(|c| !declared.contains(c.as_str())) {
                return Err(LayoutError::UnknownColumn(unknown.clone()));
            }
            let Some(first) = binding.columns.first() else {
                continue;
            };

            let label = if binding.operations.is_empty() {
                Operation::Identity.kind().to_string()
            } else {
                binding
                    .operations
                    .iter()
                    .map(Operation::kind)
                    .collect::<Vec<_>>()
                    .join("+")
            };
            let chain: Arc<[CompiledOperation]> = binding
                .operations
                .into_iter()
                .map(|op| op.compile(first))
                .collect::<LayoutResult<Vec<_>>>()?
                .into();

            let handler = Handler::new(label, move |value: &str| apply_chain(&chain, value));
            for column in binding.columns {
                registry.bind(column, handler.clone());
            }
        }

        Ok(Layout {
            name: self.name,
            description: self.description,
            columns: self.columns,
            has_header: self.has_header,
            source_prefix: self.source_prefix,
            registry,
        })
    }
}

/// The NYS layout expressed with operations, as a starting point for new
/// layout files.
pub fn example_layout() -> LayoutFile {
    LayoutFile {
        version: default_version(),
        name: "nys-ops".to_string(),
        description: "NYS voter file, declarative bindings".to_string(),
        columns: nys::COLUMNS.iter().map(|c| c.to_string()).collect(),
        has_header: false,
        source_prefix: Some(nys::SOURCE_PREFIX.to_string()),
        bindings: vec![
            Binding {
                columns: vec!["first_name".to_string(), "last_name".to_string()],
                operations: vec![Operation::Identity],
            },
            Binding {
                columns: nys::DATE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                operations: vec![Operation::Date {
                    input_formats: vec!["%Y%m%d".to_string()],
                    output_format: "%Y-%m-%d".to_string(),
                }],
            },
            Binding {
                columns: vec!["registration_status".to_string()],
                operations: vec![Operation::SkipIf {
                    values: vec!["P".to_string()],
                    case_insensitive: false,
                }],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::io::Write;

    #[test]
    fn test_builtin() {
        let layout = builtin("nys").unwrap();
        assert_eq!(layout.name, "nys");
        assert!(matches!(builtin("ohio"), Err(LayoutError::UnknownLayout(ref n)) if n == "ohio"));
    }

    #[test]
    fn test_layout_serialization() {
        let file = example_layout();
        let json = file.to_json().unwrap();
        let parsed = LayoutFile::from_json(&json).unwrap();
        assert_eq!(parsed.columns, file.columns);
        assert_eq!(parsed.bindings.len(), 3);
    }

    #[test]
    fn test_example_matches_builtin() {
        let compiled = example_layout().compile().unwrap();
        let builtin = nys::layout();

        assert_eq!(compiled.columns, builtin.columns);
        assert_eq!(compiled.registry.columns(), builtin.registry.columns());

        let status = compiled.registry.resolve("registration_status").unwrap();
        assert_eq!(status.call("P"), Err(HandlerError::Skip));
        let dob = compiled.registry.resolve("date_of_birth").unwrap();
        assert_eq!(dob.call("19800101").unwrap(), "1980-01-01");
        assert_eq!(dob.name(), "date");
    }

    #[test]
    fn test_compile_rejects_bad_layouts() {
        let empty = LayoutFile::from_json(r#"{"name": "empty", "columns": []}"#).unwrap();
        assert!(matches!(empty.compile(), Err(LayoutError::NoColumns(_))));

        let dup = LayoutFile::from_json(r#"{"name": "dup", "columns": ["a", "b", "a"]}"#).unwrap();
        assert!(matches!(dup.compile(), Err(LayoutError::DuplicateColumn(ref c)) if c == "a"));

        let unknown = LayoutFile::from_json(
            r#"{"name": "u", "columns": ["a"], "bindings": [{"columns": ["b"], "operations": [{"type": "trim"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(unknown.compile(), Err(LayoutError::UnknownColumn(ref c)) if c == "b"));

        let bad_op = LayoutFile::from_json(
            r#"{"name": "r", "columns": ["a"], "bindings": [{"columns": ["a"], "operations": [{"type": "replace", "pattern": "["}]}]}"#,
        )
        .unwrap();
        assert!(matches!(bad_op.compile(), Err(LayoutError::InvalidOperation { .. })));
    }

    #[test]
    fn test_later_binding_wins() {
        let layout = LayoutFile::from_json(
            r#"{
                "name": "t",
                "columns": ["party"],
                "bindings": [
                    {"columns": ["party"], "operations": [{"type": "lowercase"}]},
                    {"columns": ["party"], "operations": [{"type": "trim"}, {"type": "uppercase"}]}
                ]
            }"#,
        )
        .unwrap()
        .compile()
        .unwrap();

        let handler = layout.registry.resolve("party").unwrap();
        assert_eq!(handler.name(), "trim+uppercase");
        assert_eq!(handler.call(" dem ").unwrap(), "DEM");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "mini", "columns": ["id", "status"], "has_header": true,
                "bindings": [{{"columns": ["status"], "operations": [{{"type": "skip_if_empty"}}]}}]}}"#
        )
        .unwrap();

        let layout = LayoutFile::load(file.path()).unwrap().compile().unwrap();
        assert!(layout.has_header);
        assert_eq!(layout.registry.len(), 1);
    }

    #[test]
    fn test_describe() {
        let description = nys::layout().describe();
        assert_eq!(description["name"], "nys");
        assert_eq!(description["columns"].as_array().unwrap().len(), 47);
        assert_eq!(description["handlers"]["purge_date"], "date");
        assert_eq!(description["handlers"]["registration_status"], "registration_status");
    }
}
