// Parsed OCSF schema snapshot

use crate::error::{Error, Result};
use crate::types::{EntityRecord, Namespace};
use serde_json::Value;
use std::collections::BTreeMap;

/// Description reported for entities that carry none
pub const NO_DESCRIPTION: &str = "No description available";

/// One immutable OCSF schema version
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub version: String,
    classes: Vec<EntityRecord>,
    objects: Vec<EntityRecord>,
}

impl SchemaDocument {
    /// Parse the raw JSON text of a schema version
    pub fn parse(version: &str, text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text).map_err(|e| Error::MalformedSchema {
            version: version.to_string(),
            reason: e.to_string(),
        })?;

        let Value::Object(root) = root else {
            return Err(Error::MalformedSchema {
                version: version.to_string(),
                reason: "top-level value is not an object".to_string(),
            });
        };

        let classes = parse_namespace(version, Namespace::Classes, root.get("classes"))?;
        let objects = parse_namespace(version, Namespace::Objects, root.get("objects"))?;

        Ok(Self {
            version: version.to_string(),
            classes,
            objects,
        })
    }

    pub fn entities(&self, namespace: Namespace) -> &[EntityRecord] {
        match namespace {
            Namespace::Classes => &self.classes,
            Namespace::Objects => &self.objects,
        }
    }

    /// First entity whose id or name matches, ignoring case
    pub fn find(&self, namespace: Namespace, name_or_id: &str) -> Option<&EntityRecord> {
        self.entities(namespace)
            .iter()
            .find(|entity| entity.matches(name_or_id))
    }

    /// Event class names mapped to their descriptions
    pub fn class_descriptions(&self) -> BTreeMap<String, String> {
        self.classes
            .iter()
            .map(|class| {
                let description = class
                    .description
                    .clone()
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string());
                (class.name.clone(), description)
            })
            .collect()
    }
}

fn parse_namespace(
    version: &str,
    namespace: Namespace,
    value: Option<&Value>,
) -> Result<Vec<EntityRecord>> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            return Err(Error::MalformedSchema {
                version: version.to_string(),
                reason: format!("`{}` is not an object", namespace.key()),
            })
        }
    };

    let records = entries
        .iter()
        .map(|(id, data)| {
            let name = data
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(id.as_str())
                .to_string();
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            EntityRecord {
                id: id.clone(),
                name,
                description,
                data: data.clone(),
            }
        })
        .collect();

    Ok(records)
}
