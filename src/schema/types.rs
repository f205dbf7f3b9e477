//! Field descriptor definitions
//!
//! Supported kinds:
//! - Text: UTF-8 string, optionally required
//! - Boolean: JSON `true` / `false`
//! - Enum: one of a fixed set of string options
//! - Numerical: finite number with optional min / max / step
//! - Misc: bookkeeping columns owned by ingestion (`ID`, `File`, `Basename`)

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag of a field.
///
/// The declaration order is the presentation order used when listing
/// addable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Enum,
    Numerical,
    Boolean,
    Misc,
}

impl FieldKind {
    /// Returns the kind name for messages
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "Text",
            FieldKind::Enum => "Enum",
            FieldKind::Numerical => "Numerical",
            FieldKind::Boolean => "Boolean",
            FieldKind::Misc => "Misc",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One selectable option of an Enum field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    /// Stored cell value
    pub value: String,
    /// Label shown by editors
    pub label: String,
}

impl EnumOption {
    /// Create an option
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Create an option whose label equals its value
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Kind-specific constraints, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldConstraints {
    Text {
        #[serde(default)]
        required: bool,
    },
    Boolean,
    Enum {
        options: Vec<EnumOption>,
    },
    Numerical {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Misc,
}

impl FieldConstraints {
    /// Returns the kind tag
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldConstraints::Text { .. } => FieldKind::Text,
            FieldConstraints::Boolean => FieldKind::Boolean,
            FieldConstraints::Enum { .. } => FieldKind::Enum,
            FieldConstraints::Numerical { .. } => FieldKind::Numerical,
            FieldConstraints::Misc => FieldKind::Misc,
        }
    }
}

/// Type contract of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Unique field name
    pub name: String,
    /// Kind and constraints
    #[serde(flatten)]
    pub constraints: FieldConstraints,
    /// Value placed in every row when the column is added
    #[serde(default, rename = "default")]
    pub default_value: Value,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    fn with(name: impl Into<String>, constraints: FieldConstraints, default_value: Value) -> Self {
        Self {
            name: name.into(),
            constraints,
            default_value,
            description: None,
        }
    }

    /// Create a Text field
    pub fn text(name: impl Into<String>, required: bool, default: impl Into<String>) -> Self {
        Self::with(
            name,
            FieldConstraints::Text { required },
            Value::String(default.into()),
        )
    }

    /// Create a Boolean field
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::with(name, FieldConstraints::Boolean, Value::Bool(default))
    }

    /// Create an Enum field
    pub fn enumeration(
        name: impl Into<String>,
        options: Vec<EnumOption>,
        default: impl Into<String>,
    ) -> Self {
        Self::with(
            name,
            FieldConstraints::Enum { options },
            Value::String(default.into()),
        )
    }

    /// Create a Numerical field
    pub fn numerical(
        name: impl Into<String>,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        default: f64,
    ) -> Self {
        Self::with(
            name,
            FieldConstraints::Numerical { min, max, step },
            serde_json::Number::from_f64(default)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        )
    }

    /// Create a Misc field
    pub fn misc(name: impl Into<String>) -> Self {
        Self::with(name, FieldConstraints::Misc, Value::Null)
    }

    /// Attach a description
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the kind tag
    pub fn kind(&self) -> FieldKind {
        self.constraints.kind()
    }

    /// Returns whether this is a Misc (protected) field
    pub fn is_misc(&self) -> bool {
        self.kind() == FieldKind::Misc
    }

    /// Validates the descriptor itself (not a value)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("field name must not be empty".into());
        }

        match &self.constraints {
            FieldConstraints::Text { .. } | FieldConstraints::Boolean | FieldConstraints::Misc => {}
            FieldConstraints::Enum { options } => {
                if options.is_empty() {
                    return Err(format!("enum field '{}' has no options", self.name));
                }
                for (i, option) in options.iter().enumerate() {
                    if options[..i].iter().any(|o| o.value == option.value) {
                        return Err(format!(
                            "enum field '{}' repeats option '{}'",
                            self.name, option.value
                        ));
                    }
                }
            }
            FieldConstraints::Numerical { min, max, step } => {
                for (label, bound) in [("min", min), ("max", max), ("step", step)] {
                    if let Some(v) = bound {
                        if !v.is_finite() {
                            return Err(format!("numerical field '{}' has non-finite {}", self.name, label));
                        }
                    }
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("numerical field '{}' has min > max", self.name));
                    }
                }
                if let Some(s) = step {
                    if *s <= 0.0 {
                        return Err(format!("numerical field '{}' step must be > 0", self.name));
                    }
                }
            }
        }

        Ok(())
    }
}
