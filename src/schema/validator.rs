//! Row validator
//!
//! Validation semantics:
//! - Each field is checked against its own descriptor only
//! - No cross-field or cross-row constraints
//! - No implicit coercion (`"true"` is not a Boolean, `"3"` is not a number)
//! - Missing cells are checked as JSON null
//! - Misc fields are owned by ingestion and always pass
//!
//! Validation is deterministic and never mutates its input.

use serde_json::Value;

use crate::core::{GridResult, Row};

use super::registry::FieldRegistry;
use super::types::{EnumOption, FieldConstraints, FieldDescriptor};
use super::violation::{FieldResults, RowResults, ValidationResult, ViolationKind};

/// Relative tolerance for step alignment
const STEP_TOLERANCE: f64 = 1e-9;

/// Schema validator bound to a registry.
pub struct RowValidator<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> RowValidator<'a> {
    /// Creates a new validator backed by the given registry.
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    /// Validates one value against one descriptor.
    pub fn validate_field(descriptor: &FieldDescriptor, value: &Value) -> ValidationResult {
        let name = descriptor.name.as_str();
        match &descriptor.constraints {
            FieldConstraints::Text { required } => validate_text(name, *required, value),
            FieldConstraints::Boolean => validate_boolean(name, value),
            FieldConstraints::Enum { options } => validate_enum(name, options, value),
            FieldConstraints::Numerical { min, max, step } => {
                validate_numerical(name, *min, *max, *step, value)
            }
            FieldConstraints::Misc => ValidationResult::Valid,
        }
    }

    /// Validates one named field of a row.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the name is not registered.
    pub fn validate_cell(&self, field: &str, row: &Row) -> GridResult<ValidationResult> {
        let descriptor = self.registry.describe(field)?;
        Ok(Self::validate_field(
            descriptor,
            row.get(field).unwrap_or(&Value::Null),
        ))
    }

    /// Validates every field of `columns` for one row.
    ///
    /// Iterates the column set rather than the row's keys, so stale keys on
    /// the row are ignored and missing ones are reported.
    pub fn validate_row<S: AsRef<str>>(&self, columns: &[S], row: &Row) -> GridResult<FieldResults> {
        let mut results = FieldResults::new();
        for column in columns {
            let field = column.as_ref();
            results.insert(field.to_string(), self.validate_cell(field, row)?);
        }
        Ok(results)
    }

    /// Validates many rows. Rows are independent of each other.
    pub fn validate_rows<'r, S, I>(&self, columns: &[S], rows: I) -> GridResult<RowResults>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = &'r Row>,
    {
        let mut results = RowResults::new();
        for row in rows {
            results.insert(row.id(), self.validate_row(columns, row)?);
        }
        Ok(results)
    }
}

fn validate_text(name: &str, required: bool, value: &Value) -> ValidationResult {
    match value {
        Value::String(s) if required && s.trim().is_empty() => {
            ValidationResult::invalid(ViolationKind::RequiredField, format!("{} is required", name))
        }
        Value::String(_) => ValidationResult::Valid,
        Value::Null if required => {
            ValidationResult::invalid(ViolationKind::RequiredField, format!("{} is required", name))
        }
        Value::Null => ValidationResult::Valid,
        other => type_mismatch(name, "text", other),
    }
}

fn validate_boolean(name: &str, value: &Value) -> ValidationResult {
    match value {
        Value::Bool(_) => ValidationResult::Valid,
        other => type_mismatch(name, "true or false", other),
    }
}

fn validate_enum(name: &str, options: &[EnumOption], value: &Value) -> ValidationResult {
    let allowed = || {
        options
            .iter()
            .map(|o| o.value.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match value {
        Value::String(s) if options.iter().any(|o| &o.value == s) => ValidationResult::Valid,
        Value::String(s) => ValidationResult::invalid(
            ViolationKind::InvalidOption,
            format!("{} must be one of: {} (got '{}')", name, allowed(), s),
        ),
        Value::Null => ValidationResult::invalid(
            ViolationKind::InvalidOption,
            format!("{} must be one of: {}", name, allowed()),
        ),
        other => type_mismatch(name, "one of the listed options", other),
    }
}

fn validate_numerical(
    name: &str,
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
    value: &Value,
) -> ValidationResult {
    let number = match value.as_f64() {
        Some(n) if n.is_finite() => n,
        _ => return type_mismatch(name, "a finite number", value),
    };

    let below = min.map_or(false, |lo| number < lo);
    let above = max.map_or(false, |hi| number > hi);
    if below || above {
        let bounds = match (min, max) {
            (Some(lo), Some(hi)) => format!("between {} and {}", lo, hi),
            (Some(lo), None) => format!("at least {}", lo),
            (None, Some(hi)) => format!("at most {}", hi),
            (None, None) => "within range".to_string(),
        };
        return ValidationResult::invalid(
            ViolationKind::OutOfRange,
            format!("{} must be {} (got {})", name, bounds, number),
        );
    }

    if let Some(step) = step {
        let base = min.unwrap_or(0.0);
        let steps = (number - base) / step;
        if (steps - steps.round()).abs() > STEP_TOLERANCE * steps.abs().max(1.0) {
            return ValidationResult::invalid(
                ViolationKind::InvalidStep,
                format!(
                    "{} must be {} plus a multiple of {} (got {})",
                    name, base, step, number
                ),
            );
        }
    }

    ValidationResult::Valid
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn type_mismatch(name: &str, expected: &str, actual: &Value) -> ValidationResult {
    ValidationResult::invalid(
        ViolationKind::TypeMismatch,
        format!("{} must be {}, got {}", name, expected, json_type_name(actual)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RowId;
    use crate::schema::EnumOption;
    use serde_json::json;

    fn registry() -> FieldRegistry {
        FieldRegistry::new(vec![
            FieldDescriptor::misc("ID"),
            FieldDescriptor::misc("File"),
            FieldDescriptor::numerical("Age", Some(0.0), Some(120.0), Some(1.0), 30.0),
            FieldDescriptor::numerical("Field", Some(0.5), Some(14.0), Some(0.5), 3.0),
            FieldDescriptor::numerical("Delay", None, None, None, 0.0),
            FieldDescriptor::enumeration(
                "Sex",
                vec![EnumOption::plain("M"), EnumOption::plain("F")],
                "M",
            ),
            FieldDescriptor::text("Site", true, ""),
            FieldDescriptor::text("Notes", false, ""),
            FieldDescriptor::boolean("Excluded", false),
        ])
        .unwrap()
    }

    fn check(field: &str, value: Value) -> ValidationResult {
        let registry = registry();
        RowValidator::validate_field(registry.describe(field).unwrap(), &value)
    }

    fn kind_of(result: &ValidationResult) -> Option<ViolationKind> {
        result.violation().map(|v| v.kind)
    }

    #[test]
    fn test_text_rules() {
        assert!(check("Site", json!("Leiden")).is_valid());
        assert_eq!(kind_of(&check("Site", json!("  "))), Some(ViolationKind::RequiredField));
        assert_eq!(kind_of(&check("Site", Value::Null)), Some(ViolationKind::RequiredField));
        assert!(check("Notes", json!("")).is_valid());
        assert_eq!(kind_of(&check("Notes", json!(4))), Some(ViolationKind::TypeMismatch));
    }

    #[test]
    fn test_boolean_has_no_coercion() {
        assert!(check("Excluded", json!(true)).is_valid());
        assert!(check("Excluded", json!(false)).is_valid());
        for value in [json!("true"), json!(1), json!(0), Value::Null] {
            assert_eq!(kind_of(&check("Excluded", value)), Some(ViolationKind::TypeMismatch));
        }
    }

    #[test]
    fn test_enum_is_exact_and_case_sensitive() {
        assert!(check("Sex", json!("F")).is_valid());
        let result = check("Sex", json!("f"));
        assert_eq!(kind_of(&result), Some(ViolationKind::InvalidOption));
        assert!(result.message().unwrap().contains("M, F"));
    }

    #[test]
    fn test_numerical_range() {
        assert!(check("Age", json!(0)).is_valid());
        assert!(check("Age", json!(120)).is_valid());
        let result = check("Age", json!(150));
        assert_eq!(kind_of(&result), Some(ViolationKind::OutOfRange));
        assert!(result.message().unwrap().contains("between 0 and 120"));
        assert_eq!(kind_of(&check("Age", json!(-1))), Some(ViolationKind::OutOfRange));
    }

    #[test]
    fn test_numerical_type() {
        assert_eq!(kind_of(&check("Age", json!("40"))), Some(ViolationKind::TypeMismatch));
        assert_eq!(kind_of(&check("Delay", Value::Null)), Some(ViolationKind::TypeMismatch));
    }

    #[test]
    fn test_numerical_step_from_min() {
        assert_eq!(kind_of(&check("Age", json!(40.5))), Some(ViolationKind::InvalidStep));
        assert!(check("Field", json!(3)).is_valid());
        assert!(check("Field", json!(1.5)).is_valid());
        assert_eq!(kind_of(&check("Field", json!(1.2))), Some(ViolationKind::InvalidStep));
    }

    #[test]
    fn test_step_tolerates_float_noise() {
        let registry = FieldRegistry::new(vec![
            FieldDescriptor::misc("ID"),
            FieldDescriptor::numerical("Dose", Some(0.0), Some(1.0), Some(0.1), 0.0),
        ])
        .unwrap();
        let dose = registry.describe("Dose").unwrap();
        assert!(RowValidator::validate_field(dose, &json!(0.1 + 0.2)).is_valid());
        assert!(RowValidator::validate_field(dose, &json!(0.7)).is_valid());
    }

    #[test]
    fn test_unbounded_numerical_accepts_any_finite() {
        assert!(check("Delay", json!(-1e9)).is_valid());
        assert!(check("Delay", json!(2.25)).is_valid());
    }

    #[test]
    fn test_misc_always_valid() {
        assert!(check("File", Value::Null).is_valid());
        assert!(check("ID", json!("not a number")).is_valid());
    }

    #[test]
    fn test_validate_row_iterates_columns_not_keys() {
        let registry = registry();
        let validator = RowValidator::new(&registry);
        let row = Row::new(RowId::new(1))
            .with("Age", json!(30))
            .unwrap()
            .with("Stale", json!("ignored"))
            .unwrap();

        let results = validator.validate_row(&["ID", "Age", "Sex"], &row).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results["Age"].is_valid());
        assert!(!results["Sex"].is_valid());
        assert!(!results.contains_key("Stale"));
    }

    #[test]
    fn test_validate_row_unknown_column() {
        let registry = registry();
        let validator = RowValidator::new(&registry);
        let row = Row::new(RowId::new(1));
        assert!(validator.validate_row(&["Weight"], &row).is_err());
    }

    #[test]
    fn test_validate_rows_keyed_by_id() {
        let registry = registry();
        let validator = RowValidator::new(&registry);
        let rows = vec![
            Row::new(RowId::new(1)).with("Age", json!(30)).unwrap(),
            Row::new(RowId::new(2)).with("Age", json!(300)).unwrap(),
        ];
        let results = validator.validate_rows(&["Age"], &rows).unwrap();
        assert!(results[&RowId::new(1)]["Age"].is_valid());
        assert!(!results[&RowId::new(2)]["Age"].is_valid());
    }

    #[test]
    fn test_validation_is_deterministic() {
        let registry = registry();
        let validator = RowValidator::new(&registry);
        let row = Row::new(RowId::new(1))
            .with("Age", json!(150))
            .unwrap()
            .with("Sex", json!("X"))
            .unwrap();
        let columns = ["ID", "Age", "Sex", "Site"];
        let first = validator.validate_row(&columns, &row).unwrap();
        for _ in 0..100 {
            assert_eq!(validator.validate_row(&columns, &row).unwrap(), first);
        }
    }
}
