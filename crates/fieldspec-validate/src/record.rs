//! # Typed-container materialization
//!
//! A [`Record`] packs validated data into one slot per field descriptor, in
//! registry order (regular fields, then derived fields). Slots of optional
//! fields that were absent stay empty, so unpacking with [`Record::to_map`]
//! reproduces the validated map exactly.

use std::sync::Arc;

use fieldspec_core::{shape_matches, DataMap, SchemaId};
use fieldspec_registry::FieldRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::InternalConsistencyFault;

/// One slot of a record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub derived: bool,
}

/// Fixed-shape container over a registry's full field set.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: SchemaId,
    layout: Arc<[Slot]>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Pack final pipeline data into the registry's layout.
    ///
    /// # Errors
    ///
    /// Fails when a required or derived slot has no value, or a value does
    /// not have its field's shape. Neither can happen for data that went
    /// through the pipeline, so either is reported as an engine fault.
    pub fn pack(registry: &FieldRegistry, data: &DataMap) -> Result<Self, InternalConsistencyFault> {
        let fault = |reason: String| InternalConsistencyFault {
            registry: registry.id().clone(),
            reason,
        };

        let mut layout = Vec::with_capacity(registry.fields().len());
        let mut values = Vec::with_capacity(registry.fields().len());
        for field in registry.fields() {
            let value = data.get(&field.name).cloned();
            match &value {
                None if field.required || field.derived => {
                    return Err(fault(format!("no value for slot '{}'", field.name)));
                }
                Some(v) if !shape_matches(&field.ty, v) => {
                    return Err(fault(format!(
                        "slot '{}' holds a value that is not a {}",
                        field.name, field.ty
                    )));
                }
                _ => {}
            }
            layout.push(Slot {
                name: field.name.clone(),
                derived: field.derived,
            });
            values.push(value);
        }

        Ok(Self {
            schema: registry.id().clone(),
            layout: layout.into(),
            values,
        })
    }

    pub fn schema(&self) -> &SchemaId {
        &self.schema
    }

    pub fn layout(&self) -> &[Slot] {
        &self.layout
    }

    /// Number of slots, filled or not.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a slot by position.
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Value of a slot by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let position = self.layout.iter().position(|s| s.name == name)?;
        self.get_at(position)
    }

    /// Slots in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&Slot, Option<&Value>)> {
        self.layout.iter().zip(self.values.iter().map(Option::as_ref))
    }

    /// Unpack into a plain map holding every filled slot, in layout order.
    pub fn to_map(&self) -> DataMap {
        self.iter()
            .filter_map(|(slot, value)| value.map(|v| (slot.name.clone(), v.clone())))
            .collect()
    }

    /// Materialize a caller-defined type from the record.
    ///
    /// # Errors
    ///
    /// The `serde_json` error when the record does not fit `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.to_map()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldspec_core::TypeExpr;
    use fieldspec_registry::{BuildOptions, FieldDef};
    use serde::Deserialize;
    use serde_json::json;

    fn registry() -> FieldRegistry {
        FieldRegistry::build(
            [
                FieldDef::new("id", "int"),
                FieldDef::new("note", "str").optional(),
                FieldDef::new("tags", TypeExpr::array_of(TypeExpr::string())),
            ],
            BuildOptions::new("Item").materialize(),
        )
        .unwrap()
    }

    fn map(v: Value) -> DataMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn empty_optional_slots_are_preserved_as_absent() {
        let data = map(json!({"id": 7, "tags": ["a"]}));
        let record = Record::pack(&registry(), &data).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("note"), None);
        assert_eq!(record.get_at(0), Some(&json!(7)));
        assert_eq!(record.to_map(), data);
    }

    #[test]
    fn missing_required_slot_is_a_fault() {
        let err = Record::pack(&registry(), &map(json!({"tags": []}))).unwrap_err();
        assert!(err.reason.contains("'id'"));
    }

    #[test]
    fn misshaped_slot_is_a_fault() {
        let err = Record::pack(&registry(), &map(json!({"id": "7", "tags": []}))).unwrap_err();
        assert!(err.reason.contains("'id'"));
    }

    #[test]
    fn deserializes_into_a_user_type() {
        #[derive(Deserialize)]
        struct Item {
            id: i64,
            note: Option<String>,
            tags: Vec<String>,
        }
        let record = Record::pack(&registry(), &map(json!({"id": 1, "tags": ["x", "y"]}))).unwrap();
        let item: Item = record.deserialize_into().unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(item.note, None);
        assert_eq!(item.tags, vec!["x", "y"]);
    }
}
