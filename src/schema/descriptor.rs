//! Type descriptor store.
//!
//! Parses the declarative type document:
//!
//! ```json
//! {
//!   "team": {
//!     "description": "A club",
//!     "fields": {
//!       "name": "String",
//!       "captain": { "type": "player" },
//!       "players": { "type": "Array", "of": "player" }
//!     }
//!   },
//!   "player": { "type": "Object", "fields": { "name": { "type": "String" } } }
//! }
//! ```

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CqlError, Result};

const OBJECT_TAG: &str = "Object";
const ARRAY_TAG: &str = "Array";

/// What a descriptor denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Reference to a type by name (scalar or declared entity).
    ScalarRef,
    /// Composite entity with fields.
    Object,
    /// List of `element_type`.
    Array,
}

/// One node of the type document.
///
/// For entities `name` is the declared entity name; for field references it
/// is the name of the referenced type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: DescriptorKind,
    /// Fields in document order. Empty unless `kind` is `Object`.
    pub fields: Vec<(String, TypeDescriptor)>,
    pub element_type: Option<Box<TypeDescriptor>>,
    pub description: Option<String>,
}

impl TypeDescriptor {
    /// Reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::ScalarRef,
            fields: Vec::new(),
            element_type: None,
            description: None,
        }
    }

    /// List of `element`.
    pub fn array(element: TypeDescriptor) -> Self {
        Self {
            name: format!("[{}]", element.name),
            kind: DescriptorKind::Array,
            fields: Vec::new(),
            element_type: Some(Box::new(element)),
            description: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Parse a top-level entity entry.
    fn parse_entity(name: &str, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CqlError::descriptor(name, "entity must be a JSON object"))?;
        let description = parse_description(name, obj)?;

        let mut descriptor = match obj.get("type") {
            None => Self::object(name),
            Some(Value::String(tag)) if tag == OBJECT_TAG => Self::object(name),
            Some(Value::String(tag)) if tag == ARRAY_TAG => {
                let element = parse_array_element(name, obj)?;
                let mut array = Self::array(element);
                array.name = name.to_string();
                array
            }
            Some(other) => {
                let mut reference = Self::parse_reference(name, other)?;
                if reference.kind == DescriptorKind::ScalarRef {
                    // An alias entity keeps its own name; the target lives in the element slot.
                    let target = std::mem::replace(&mut reference.name, name.to_string());
                    reference.element_type = Some(Box::new(Self::named(target)));
                } else {
                    reference.name = name.to_string();
                }
                reference
            }
        };
        descriptor.description = description;

        match obj.get("fields") {
            None => {}
            Some(_) if descriptor.kind != DescriptorKind::Object => {
                warn!(entity = name, "ignoring `fields` on a non-object entity");
            }
            Some(Value::Object(fields)) => {
                for (field_name, field_value) in fields {
                    let context = format!("{}.{}", name, field_name);
                    let field = Self::parse_reference(&context, field_value)?;
                    descriptor.fields.push((field_name.clone(), field));
                }
            }
            Some(_) => {
                return Err(CqlError::descriptor(name, "`fields` must be a JSON object"));
            }
        }

        Ok(descriptor)
    }

    fn object(name: &str) -> Self {
        Self {
            kind: DescriptorKind::Object,
            ..Self::named(name)
        }
    }

    /// Parse a field-level type reference: a bare name, `{ "type": ... }`,
    /// or `{ "type": "Array", "of": ... }`.
    fn parse_reference(context: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(tag) if tag == ARRAY_TAG => Err(CqlError::descriptor(
                context,
                "array type needs an element type in `of`",
            )),
            Value::String(tag) if tag == OBJECT_TAG => Err(CqlError::descriptor(
                context,
                "inline object types are not supported; declare an entity instead",
            )),
            Value::String(name) => Ok(Self::named(name.as_str())),
            Value::Object(obj) => {
                let description = parse_description(context, obj)?;
                let mut descriptor = match obj.get("type") {
                    Some(Value::String(tag)) if tag == ARRAY_TAG => {
                        Self::array(parse_array_element(context, obj)?)
                    }
                    Some(inner) => Self::parse_reference(context, inner)?,
                    None => {
                        return Err(CqlError::descriptor(context, "missing `type`"));
                    }
                };
                if description.is_some() {
                    descriptor.description = description;
                }
                Ok(descriptor)
            }
            _ => Err(CqlError::descriptor(
                context,
                "type must be a name or a JSON object",
            )),
        }
    }
}

fn parse_description(context: &str, obj: &Map<String, Value>) -> Result<Option<String>> {
    match obj.get("description") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CqlError::descriptor(context, "`description` must be a string")),
    }
}

fn parse_array_element(context: &str, obj: &Map<String, Value>) -> Result<TypeDescriptor> {
    let of = obj.get("of").ok_or_else(|| {
        CqlError::descriptor(context, "array type needs an element type in `of`")
    })?;
    TypeDescriptor::parse_reference(context, of)
}

/// All declared entities, in document order.
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptorStore {
    entities: Vec<TypeDescriptor>,
}

impl TypeDescriptorStore {
    /// Read and parse a descriptor document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading type descriptors");
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| CqlError::descriptor(path.display().to_string(), e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CqlError::descriptor("<document>", e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let doc = value.as_object().ok_or_else(|| {
            CqlError::descriptor("<document>", "descriptor document must be a JSON object")
        })?;
        let entities = doc
            .iter()
            .map(|(name, entry)| TypeDescriptor::parse_entity(name, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entities })
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.entities.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
