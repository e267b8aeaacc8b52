//! # Entity Module
//!
//! A materialized row of one table, with its relationship-valued fields.

use heck::ToLowerCamelCase;
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, ser::SerializeMap, Serialize, Serializer};

use crate::value::Value;

/// A relationship-valued field.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// Single nullable reference (`OneToOne`, `ManyToOne`).
    One(Option<Box<Entity>>),
    /// Ordered collection (`OneToMany`, `ManyToMany`).
    Many(Vec<Entity>),
}

/// A typed instance of one table's row.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    table: String,
    fields: IndexMap<String, Value>,
    relations: IndexMap<String, Related>,
}

impl Entity {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), fields: IndexMap::new(), relations: IndexMap::new() }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// The single related entity under `name`, if populated.
    pub fn one(&self, name: &str) -> Option<&Entity> {
        match self.relations.get(name) {
            Some(Related::One(Some(entity))) => Some(&**entity),
            _ => None,
        }
    }

    /// The related collection under `name`; empty when absent.
    pub fn many(&self, name: &str) -> &[Entity] {
        match self.relations.get(name) {
            Some(Related::Many(list)) => list,
            _ => &[],
        }
    }

    pub(crate) fn set_field(&mut self, column: impl Into<String>, value: Value) {
        self.fields.insert(column.into(), value);
    }

    pub(crate) fn set_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    /// JSON object with lowerCamelCase keys: columns, then relationships.
    pub fn to_json(&self) -> serde_json::Value {
        self.json_with_keys(|k| k.to_lower_camel_case())
    }

    /// Deserializes the entity into a caller-defined struct whose field names
    /// match the snake_case column and relationship names.
    pub fn into_model<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.json_with_keys(str::to_string))
    }

    fn json_with_keys(&self, key: impl Fn(&str) -> String + Copy) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.fields {
            map.insert(key(name), value.to_json());
        }
        for (name, related) in &self.relations {
            let json = match related {
                Related::One(Some(entity)) => entity.json_with_keys(key),
                Related::One(None) => serde_json::Value::Null,
                Related::Many(list) => list.iter().map(|e| e.json_with_keys(key)).collect(),
            };
            map.insert(key(name), json);
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.relations.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(&name.to_lower_camel_case(), value)?;
        }
        for (name, related) in &self.relations {
            let key = name.to_lower_camel_case();
            match related {
                Related::One(entity) => map.serialize_entry(&key, entity)?,
                Related::Many(list) => map.serialize_entry(&key, list)?,
            }
        }
        map.end()
    }
}
