use crate::core::{DataType, FieldValue, RegistryError, Result, Violation};
use crate::schema::constraint::Constraint;
use crate::schema::derive::Derivation;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

/// Declared shape of one stored attribute.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub data_type: DataType,
    pub required: bool,
    pub nullable: bool,
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn new(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            required: true,
            nullable: false,
            constraints: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn constrain(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Identifier spec: the payload field carrying the id and its pattern.
#[derive(Debug, Clone)]
pub struct IdSpec {
    pub field: &'static str,
    pub pattern: Regex,
}

impl IdSpec {
    pub fn new(field: &'static str, pattern: &str) -> Self {
        Self {
            field,
            pattern: Regex::new(pattern).expect("schema id patterns must compile"),
        }
    }
}

/// One validated, materialized record: identifier, stored attributes, and
/// derived attributes recomputed from the stored ones.
///
/// Records are immutable; an update constructs a fresh record from the
/// merge of prior stored attributes and a partial payload.
#[derive(Debug, Clone)]
pub struct Record {
    id: String,
    id_field: &'static str,
    stored: BTreeMap<String, FieldValue>,
    derived: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Looks a field up across stored and derived attributes.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.stored.get(name).or_else(|| self.derived.get(name))
    }

    pub fn stored(&self) -> &BTreeMap<String, FieldValue> {
        &self.stored
    }

    pub fn derived(&self) -> &BTreeMap<String, FieldValue> {
        &self.derived
    }

    /// Full client-facing projection: id plus stored plus derived.
    pub fn to_json(&self) -> JsonValue {
        let mut map = JsonMap::new();
        map.insert(self.id_field.to_string(), JsonValue::String(self.id.clone()));
        for (name, value) in &self.stored {
            map.insert(name.clone(), value.to_json());
        }
        for (name, value) in &self.derived {
            map.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }

    /// Persistence projection: stored attributes only. Derived values are
    /// recomputed on every load, so they never go stale on disk.
    pub fn stored_json(&self) -> JsonMap<String, JsonValue> {
        self.stored
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

/// Declarative schema for one entity: identifier, stored fields with
/// constraints, derivations, and the query-layer allow-lists.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub entity: &'static str,
    pub id: IdSpec,
    pub fields: Vec<FieldSpec>,
    pub derivations: Vec<Derivation>,
    pub sortable: Vec<&'static str>,
    pub searchable: Vec<&'static str>,
}

impl RecordSchema {
    /// Type of a stored or derived field, if declared.
    pub fn field_type(&self, name: &str) -> Option<DataType> {
        if let Some(spec) = self.fields.iter().find(|f| f.name == name) {
            return Some(spec.data_type);
        }
        self.derivations
            .iter()
            .find(|d| d.name() == name)
            .map(Derivation::data_type)
    }

    /// Validates an identifier against the schema pattern.
    pub fn check_id(&self, id: &str) -> Result<()> {
        if self.id.pattern.is_match(id) {
            Ok(())
        } else {
            Err(RegistryError::Validation(vec![Violation::new(
                self.id.field,
                format!("must match pattern {}", self.id.pattern.as_str()),
                JsonValue::String(id.to_string()),
            )]))
        }
    }

    /// Validates raw attributes and constructs the record, all-or-nothing.
    ///
    /// Every violated constraint is collected: missing required fields,
    /// nulls where the field is not nullable, type mismatches, failed
    /// constraints, unknown fields, and a malformed identifier. Derived
    /// attributes are computed only once validation has fully passed.
    pub fn validate_and_construct(&self, id: &str, raw: &JsonMap<String, JsonValue>) -> Result<Record> {
        let mut violations = Vec::new();

        if !self.id.pattern.is_match(id) {
            violations.push(Violation::new(
                self.id.field,
                format!("must match pattern {}", self.id.pattern.as_str()),
                JsonValue::String(id.to_string()),
            ));
        }

        let mut stored = BTreeMap::new();
        for spec in &self.fields {
            match raw.get(spec.name) {
                None => {
                    if spec.required {
                        violations.push(Violation::new(spec.name, "is required", JsonValue::Null));
                    }
                }
                Some(JsonValue::Null) => {
                    if spec.nullable {
                        stored.insert(spec.name.to_string(), FieldValue::Null);
                    } else {
                        violations.push(Violation::new(
                            spec.name,
                            "must not be null",
                            JsonValue::Null,
                        ));
                    }
                }
                Some(value) => match spec.data_type.convert(value) {
                    Err(msg) => violations.push(Violation::new(spec.name, msg, value.clone())),
                    Ok(converted) => {
                        for constraint in &spec.constraints {
                            if let Err(msg) = constraint.check(&converted) {
                                violations.push(Violation::new(spec.name, msg, value.clone()));
                            }
                        }
                        stored.insert(spec.name.to_string(), converted);
                    }
                },
            }
        }

        for (key, value) in raw {
            if key == self.id.field {
                continue;
            }
            if !self.fields.iter().any(|f| f.name == key) {
                violations.push(Violation::new(key, "unknown field", value.clone()));
            }
        }

        if !violations.is_empty() {
            return Err(RegistryError::Validation(violations));
        }

        let derived = self.derive_map(&stored);
        Ok(Record {
            id: id.to_string(),
            id_field: self.id.field,
            stored,
            derived,
        })
    }

    /// Recomputes every derived attribute from the record's current stored
    /// attributes. Pure; calling it twice yields an identical record.
    pub fn derive(&self, record: &Record) -> Record {
        Record {
            derived: self.derive_map(&record.stored),
            ..record.clone()
        }
    }

    /// Merges a partial payload over existing stored attributes and
    /// re-validates the whole result.
    ///
    /// A key present in the patch overrides, even when its value is an
    /// explicit `null`; absent keys carry over unchanged. The identifier
    /// cannot be changed through a patch.
    pub fn merge_partial(
        &self,
        id: &str,
        existing: &JsonMap<String, JsonValue>,
        patch: &JsonMap<String, JsonValue>,
    ) -> Result<Record> {
        if let Some(value) = patch.get(self.id.field) {
            return Err(RegistryError::Validation(vec![Violation::new(
                self.id.field,
                "identifier cannot be changed",
                value.clone(),
            )]));
        }

        let mut merged = existing.clone();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        self.validate_and_construct(id, &merged)
    }

    fn derive_map(&self, stored: &BTreeMap<String, FieldValue>) -> BTreeMap<String, FieldValue> {
        let mut derived = BTreeMap::new();
        for derivation in &self.derivations {
            let value = derivation.apply(stored, &derived);
            derived.insert(derivation.name().to_string(), value);
        }
        derived
    }
}
