//! Declarative column operations
//!
//! A layout file binds columns to a chain of these operations. Each one takes
//! a field value and returns the new value, a skip, or a fault.

use std::collections::HashMap;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HandlerError, HandlerResult, LayoutError, LayoutResult};

/// All available field operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Leave the value untouched
    Identity,

    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Uppercase,

    /// Convert to lowercase
    Lowercase,

    /// Replace using regex pattern
    Replace {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Pad string at start to reach target length
    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Pad string at end to reach target length
    PadEnd {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Ensure string starts with given prefix
    EnsurePrefix { value: String },

    /// Ensure string ends with given suffix
    EnsureSuffix { value: String },

    /// Map values using a lookup table
    Map {
        mapping: HashMap<String, String>,
        #[serde(default)]
        case_insensitive: bool,
        /// Replacement for unmapped values. Unmapped values pass through when unset.
        #[serde(default)]
        default_unmapped: Option<String>,
    },

    /// Take `length` characters from `start`
    Substring {
        start: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    /// Remove all non-alphanumeric characters
    Alphanumeric,

    /// Remove all non-digit characters
    DigitsOnly,

    /// Reformat a date. Empty values pass through.
    Date {
        #[serde(default = "default_input_formats")]
        input_formats: Vec<String>,
        #[serde(default = "default_output_format")]
        output_format: String,
    },

    /// Drop the whole record when the value is one of `values`
    SkipIf {
        values: Vec<String>,
        #[serde(default)]
        case_insensitive: bool,
    },

    /// Drop the whole record when the value is blank
    SkipIfEmpty,

    /// Fault when the value is blank
    Required,
}

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_input_formats() -> Vec<String> {
    vec!["%Y%m%d".to_string()]
}

fn default_output_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Operation {
    /// The `type` tag of this operation.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Identity => "identity",
            Operation::Trim => "trim",
            Operation::Uppercase => "uppercase",
            Operation::Lowercase => "lowercase",
            Operation::Replace { .. } => "replace",
            Operation::PadStart { .. } => "pad_start",
            Operation::PadEnd { .. } => "pad_end",
            Operation::EnsurePrefix { .. } => "ensure_prefix",
            Operation::EnsureSuffix { .. } => "ensure_suffix",
            Operation::Map { .. } => "map",
            Operation::Substring { .. } => "substring",
            Operation::Alphanumeric => "alphanumeric",
            Operation::DigitsOnly => "digits_only",
            Operation::Date { .. } => "date",
            Operation::SkipIf { .. } => "skip_if",
            Operation::SkipIfEmpty => "skip_if_empty",
            Operation::Required => "required",
        }
    }

    /// Validate parameters and precompile what can be precompiled.
    pub fn compile(self, column: &str) -> LayoutResult<CompiledOperation> {
        let invalid = |message: String| LayoutError::InvalidOperation {
            column: column.to_string(),
            message,
        };

        let regex = match &self {
            Operation::Replace { pattern, .. } => Some(
                Regex::new(pattern).map_err(|e| invalid(format!("bad pattern '{}': {}", pattern, e)))?,
            ),
            _ => None,
        };

        match &self {
            Operation::PadStart { char, .. } | Operation::PadEnd { char, .. } if char.is_empty() => {
                return Err(invalid("pad character is empty".to_string()));
            }
            Operation::Date {
                input_formats,
                output_format,
            } => {
                if input_formats.is_empty() {
                    return Err(invalid("date needs at least one input format".to_string()));
                }
                for format in input_formats.iter().chain(std::iter::once(output_format)) {
                    if !is_valid_format(format) {
                        return Err(invalid(format!("bad date format '{}'", format)));
                    }
                }
            }
            _ => {}
        }

        Ok(CompiledOperation { op: self, regex })
    }
}

fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// An [`Operation`] ready to run.
#[derive(Debug, Clone)]
pub struct CompiledOperation {
    op: Operation,
    regex: Option<Regex>,
}

impl CompiledOperation {
    pub fn operation(&self) -> &Operation {
        &self.op
    }

    /// Apply this operation to a value
    pub fn apply(&self, value: &str) -> HandlerResult {
        match &self.op {
            Operation::Identity => Ok(value.to_string()),
            Operation::Trim => Ok(value.trim().to_string()),
            Operation::Uppercase => Ok(value.to_uppercase()),
            Operation::Lowercase => Ok(value.to_lowercase()),
            Operation::Replace { value: replacement, .. } => Ok(self.apply_replace(value, replacement)),
            Operation::PadStart { length, char } => Ok(apply_pad(value, *length, char, true)),
            Operation::PadEnd { length, char } => Ok(apply_pad(value, *length, char, false)),
            Operation::EnsurePrefix { value: prefix } => Ok(if value.starts_with(prefix.as_str()) {
                value.to_string()
            } else {
                format!("{}{}", prefix, value)
            }),
            Operation::EnsureSuffix { value: suffix } => Ok(if value.ends_with(suffix.as_str()) {
                value.to_string()
            } else {
                format!("{}{}", value, suffix)
            }),
            Operation::Map {
                mapping,
                case_insensitive,
                default_unmapped,
            } => Ok(apply_map(value, mapping, *case_insensitive, default_unmapped.as_deref())),
            Operation::Substring { start, length } => Ok(apply_substring(value, *start, *length)),
            Operation::Alphanumeric => Ok(value.chars().filter(|c| c.is_alphanumeric()).collect()),
            Operation::DigitsOnly => Ok(value.chars().filter(|c| c.is_ascii_digit()).collect()),
            Operation::Date {
                input_formats,
                output_format,
            } => apply_date(value, input_formats, output_format),
            Operation::SkipIf {
                values,
                case_insensitive,
            } => {
                let hit = if *case_insensitive {
                    values.iter().any(|v| v.eq_ignore_ascii_case(value))
                } else {
                    values.iter().any(|v| v == value)
                };
                if hit {
                    Err(HandlerError::Skip)
                } else {
                    Ok(value.to_string())
                }
            }
            Operation::SkipIfEmpty => {
                if value.trim().is_empty() {
                    Err(HandlerError::Skip)
                } else {
                    Ok(value.to_string())
                }
            }
            Operation::Required => {
                if value.trim().is_empty() {
                    Err(HandlerError::fault("required value is empty"))
                } else {
                    Ok(value.to_string())
                }
            }
        }
    }

    fn apply_replace(&self, value: &str, replacement: &str) -> String {
        match &self.regex {
            Some(re) => re.replace_all(value, replacement).into_owned(),
            None => value.to_string(),
        }
    }
}

/// Run a chain of operations, stopping at the first skip or fault.
pub fn apply_chain(chain: &[CompiledOperation], value: &str) -> HandlerResult {
    let mut current = value.to_string();
    for op in chain {
        current = op.apply(&current)?;
    }
    Ok(current)
}

fn apply_pad(value: &str, length: usize, pad_char: &str, at_start: bool) -> String {
    let len = value.chars().count();
    if len >= length {
        return value.to_string();
    }
    let pad = pad_char.chars().next().unwrap_or('0');
    let padding: String = std::iter::repeat(pad).take(length - len).collect();
    if at_start {
        format!("{}{}", padding, value)
    } else {
        format!("{}{}", value, padding)
    }
}

fn apply_map(
    value: &str,
    mapping: &HashMap<String, String>,
    case_insensitive: bool,
    default_unmapped: Option<&str>,
) -> String {
    let found = if case_insensitive {
        mapping
            .iter()
            .find(|(k, _)| k.to_lowercase() == value.to_lowercase())
            .map(|(_, v)| v)
    } else {
        mapping.get(value)
    };

    match (found, default_unmapped) {
        (Some(mapped), _) => mapped.clone(),
        (None, Some(default)) => default.to_string(),
        (None, None) => value.to_string(),
    }
}

fn apply_substring(value: &str, start: usize, length: Option<usize>) -> String {
    let chars = value.chars().skip(start);
    match length {
        Some(length) => chars.take(length).collect(),
        None => chars.collect(),
    }
}

/// Reformat a date from the first input format that parses it.
///
/// A value already in the output format is re-emitted as is, so running a
/// normalized file through the same layout again changes nothing.
fn apply_date(value: &str, input_formats: &[String], output_format: &str) -> HandlerResult {
    if value.is_empty() {
        return Ok(String::new());
    }

    let parsed = input_formats
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(output_format))
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok());

    match parsed {
        Some(date) => Ok(date.format(output_format).to_string()),
        None => Err(HandlerError::fault(format!(
            "invalid date, expected {}",
            input_formats.join(" or ")
        ))),
    }
}

/// Get a description of all available operations
pub fn operations_description() -> String {
    r#"Available column operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| identity | Keep the value as is | - |
| trim | Remove leading/trailing whitespace | - |
| uppercase | Convert to uppercase | - |
| lowercase | Convert to lowercase | - |
| replace | Regex pattern replacement | pattern: regex, value: replacement |
| pad_start | Pad string at start | length: target length, char: pad character (default "0") |
| pad_end | Pad string at end | length: target length, char: pad character (default "0") |
| ensure_prefix | Add prefix if not present | value: prefix string |
| ensure_suffix | Add suffix if not present | value: suffix string |
| map | Map values using lookup table | mapping: {source: target}, case_insensitive: bool, default_unmapped: optional |
| substring | Extract substring | start: start index, length: optional length |
| alphanumeric | Keep only alphanumeric chars | - |
| digits_only | Keep only digits | - |
| date | Reformat a date, empty passes | input_formats: strftime list (default ["%Y%m%d"]), output_format (default "%Y-%m-%d") |
| skip_if | Drop the record on a listed value | values: list, case_insensitive: bool |
| skip_if_empty | Drop the record on a blank value | - |
| required | Fail the record on a blank value | - |

Operations run in order; a skip or failure stops the chain.

Example binding in JSON:
{
  "columns": ["registration_status"],
  "operations": [
    {"type": "trim"},
    {"type": "skip_if", "values": ["P"]},
    {"type": "map", "mapping": {"A": "ACTIVE", "I": "INACTIVE"}}
  ]
}"#
    .to_string()
}
