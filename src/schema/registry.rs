//! Field schema registry
//!
//! Static mapping from field name to its descriptor. Built once at process
//! start, either from the built-in BIDS field set or from a JSON file:
//!
//! ```json
//! { "fields": [ { "name": "ID", "type": "Misc" }, ... ] }
//! ```
//!
//! The registry is never mutated after construction.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{GridError, GridResult};

use super::types::{FieldDescriptor, FieldKind};

/// Name of the mandatory row identifier field.
pub const ID_FIELD: &str = "ID";

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    fields: Vec<FieldDescriptor>,
}

/// Registry of every field a table may carry.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    /// Descriptors in declaration order
    fields: Vec<FieldDescriptor>,
    /// Position of each descriptor by name
    by_name: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Builds a registry from descriptors.
    ///
    /// Every descriptor must be structurally valid, names must be unique and
    /// the `ID` field must be declared as Misc.
    pub fn new(fields: Vec<FieldDescriptor>) -> GridResult<Self> {
        let mut by_name = HashMap::with_capacity(fields.len());

        for (position, field) in fields.iter().enumerate() {
            field.validate_structure().map_err(GridError::registry)?;
            if by_name.insert(field.name.clone(), position).is_some() {
                return Err(GridError::registry(format!(
                    "field '{}' declared twice",
                    field.name
                )));
            }
        }

        match by_name.get(ID_FIELD).map(|&i| &fields[i]) {
            None => {
                return Err(GridError::registry(format!(
                    "registry must declare an '{}' field",
                    ID_FIELD
                )))
            }
            Some(id) if !id.is_misc() => {
                return Err(GridError::registry(format!(
                    "'{}' field must be Misc",
                    ID_FIELD
                )))
            }
            Some(_) => {}
        }

        Ok(Self { fields, by_name })
    }

    /// Parses a registry from a JSON document.
    pub fn from_json_str(content: &str) -> GridResult<Self> {
        let document: RegistryDocument = serde_json::from_str(content)
            .map_err(|e| GridError::registry(format!("Invalid registry JSON: {}", e)))?;
        Self::new(document.fields)
    }

    /// Loads a registry from a JSON file.
    pub fn load(path: &Path) -> GridResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GridError::registry(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Serializes the registry to the JSON document format.
    pub fn to_json_string(&self) -> GridResult<String> {
        let document = RegistryDocument {
            fields: self.fields.clone(),
        };
        serde_json::to_string_pretty(&document).map_err(|e| GridError::internal(e.to_string()))
    }

    /// Resolves a field name to its descriptor.
    pub fn describe(&self, name: &str) -> GridResult<&FieldDescriptor> {
        self.get(name)
            .ok_or_else(|| GridError::unknown_field(name))
    }

    /// Gets a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Checks if a field is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Checks if a field is registered as Misc.
    pub fn is_misc(&self, name: &str) -> bool {
        self.get(name).map_or(false, FieldDescriptor::is_misc)
    }

    /// Misc field names in declaration order.
    pub fn misc_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_misc())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// True iff the field exists, is not Misc and is not already a column.
    pub fn is_addable<S: AsRef<str>>(&self, name: &str, current_columns: &[S]) -> bool {
        match self.get(name) {
            Some(field) => {
                !field.is_misc() && !current_columns.iter().any(|c| c.as_ref() == name)
            }
            None => false,
        }
    }

    /// Addable descriptors ordered by kind then name, optionally of one kind.
    pub fn list_addable<S: AsRef<str>>(
        &self,
        current_columns: &[S],
        kind: Option<FieldKind>,
    ) -> Vec<&FieldDescriptor> {
        let mut addable: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| kind.map_or(true, |k| f.kind() == k))
            .filter(|f| self.is_addable(&f.name, current_columns))
            .collect();
        addable.sort_by(|a, b| a.kind().cmp(&b.kind()).then_with(|| a.name.cmp(&b.name)));
        addable
    }

    /// Addable descriptors grouped by kind. Kinds with nothing addable are omitted.
    pub fn addable_by_kind<S: AsRef<str>>(
        &self,
        current_columns: &[S],
    ) -> BTreeMap<FieldKind, Vec<&FieldDescriptor>> {
        let mut groups: BTreeMap<FieldKind, Vec<&FieldDescriptor>> = BTreeMap::new();
        for field in self.list_addable(current_columns, None) {
            groups.entry(field.kind()).or_default().push(field);
        }
        groups
    }

    /// All descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumOption;
    use tempfile::TempDir;

    fn sample_registry() -> FieldRegistry {
        FieldRegistry::new(vec![
            FieldDescriptor::misc("ID"),
            FieldDescriptor::misc("File"),
            FieldDescriptor::numerical("Age", Some(0.0), Some(120.0), Some(1.0), 30.0),
            FieldDescriptor::enumeration(
                "Sex",
                vec![EnumOption::plain("M"), EnumOption::plain("F")],
                "M",
            ),
            FieldDescriptor::text("Site", true, ""),
            FieldDescriptor::boolean("Excluded", false),
        ])
        .unwrap()
    }

    #[test]
    fn test_describe_known_and_unknown() {
        let registry = sample_registry();
        assert_eq!(registry.describe("Age").unwrap().kind(), FieldKind::Numerical);

        let err = registry.describe("Weight").unwrap_err();
        assert_eq!(err, GridError::UnknownField("Weight".into()));
    }

    #[test]
    fn test_is_addable() {
        let registry = sample_registry();
        let columns = ["ID", "File", "Age"];
        assert!(registry.is_addable("Sex", &columns));
        assert!(!registry.is_addable("Age", &columns));
        assert!(!registry.is_addable("ID", &columns));
        assert!(!registry.is_addable("Weight", &columns));
    }

    #[test]
    fn test_list_addable_orders_by_kind() {
        let registry = sample_registry();
        let columns = ["ID", "File"];
        let names: Vec<&str> = registry
            .list_addable(&columns, None)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["Site", "Sex", "Age", "Excluded"]);

        let booleans = registry.list_addable(&columns, Some(FieldKind::Boolean));
        assert_eq!(booleans.len(), 1);
        assert_eq!(booleans[0].name, "Excluded");

        assert!(registry.list_addable(&columns, Some(FieldKind::Misc)).is_empty());
    }

    #[test]
    fn test_addable_by_kind_omits_exhausted_kinds() {
        let registry = sample_registry();
        let groups = registry.addable_by_kind(&["ID", "File", "Site"]);
        assert!(!groups.contains_key(&FieldKind::Text));
        assert_eq!(groups[&FieldKind::Enum][0].name, "Sex");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = FieldRegistry::new(vec![
            FieldDescriptor::misc("ID"),
            FieldDescriptor::boolean("B", true),
            FieldDescriptor::boolean("B", false),
        ]);
        assert!(matches!(result, Err(GridError::Registry(_))));
    }

    #[test]
    fn test_id_field_required_and_misc() {
        let missing = FieldRegistry::new(vec![FieldDescriptor::boolean("B", true)]);
        assert!(missing.is_err());

        let not_misc = FieldRegistry::new(vec![FieldDescriptor::text("ID", true, "")]);
        assert!(not_misc.unwrap_err().to_string().contains("Misc"));
    }

    #[test]
    fn test_misc_fields_in_declaration_order() {
        let registry = sample_registry();
        assert_eq!(registry.misc_fields(), vec!["ID", "File"]);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fields.json");

        let registry = sample_registry();
        std::fs::write(&path, registry.to_json_string().unwrap()).unwrap();

        let loaded = FieldRegistry::load(&path).unwrap();
        assert_eq!(loaded.len(), registry.len());
        assert_eq!(loaded.describe("Sex").unwrap(), registry.describe("Sex").unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = FieldRegistry::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(GridError::Registry(_))));
    }
}
