//! Object type registry.
//!
//! Builds one named composite type per declared entity. Construction runs in
//! two passes so that field types may reference any entity regardless of
//! declaration order, including the entity itself:
//!
//! 1. index every object entity by name (type shells with empty field maps),
//! 2. resolve each shell's fields against the complete index.
//!
//! Object references are stored by declared name, never by pointer, so
//! mutually recursive types need no shared ownership.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::descriptor::{DescriptorKind, TypeDescriptor, TypeDescriptorStore};
use super::naming::camelize;
use super::scalar::ScalarType;
use crate::error::{CqlError, Result};

/// Root operation type names; an entity may not take one of these.
const ROOT_TYPE_NAMES: &[&str] = &["Query", "Mutation", "Subscription"];

/// Why `type_name` cannot name an object type, if it can't.
fn reserved_reason(type_name: &str) -> Option<&'static str> {
    if ROOT_TYPE_NAMES.contains(&type_name) {
        Some("is a root operation type")
    } else if ScalarType::from_name(type_name).is_some() {
        Some("is a built-in scalar")
    } else if type_name.starts_with("__") {
        Some("is reserved for introspection")
    } else {
        None
    }
}

/// Resolved type of an object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Declared name of a registered object type.
    Object(String),
    List(Box<FieldType>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(s) => write!(f, "{}", s),
            FieldType::Object(name) => write!(f, "{}", camelize(name)),
            FieldType::List(inner) => write!(f, "[{}]", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub name: String,
    pub field_type: FieldType,
    pub description: Option<String>,
}

/// A named composite type. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    /// Name as declared in the descriptor document.
    pub declared_name: String,
    /// Public (camel-cased) type name.
    pub type_name: String,
    pub description: Option<String>,
    fields: Vec<ObjectField>,
}

impl ObjectType {
    pub fn fields(&self) -> &[ObjectField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ObjectField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Declared entity name → object type.
#[derive(Debug, Clone, Default)]
pub struct ObjectTypeRegistry {
    types: HashMap<String, ObjectType>,
    /// Declaration order, for deterministic iteration.
    order: Vec<String>,
}

impl ObjectTypeRegistry {
    /// Build the registry from every object entity in `store`.
    ///
    /// Fails on the first field whose type is neither a scalar nor a
    /// registered object type.
    pub fn build(store: &TypeDescriptorStore) -> Result<Self> {
        let mut registry = Self::default();
        let mut public_names: HashMap<String, String> = HashMap::new();

        // Pass 1: shells.
        for descriptor in store.iter().filter(|d| d.kind == DescriptorKind::Object) {
            let type_name = camelize(&descriptor.name);
            if let Some(reason) = reserved_reason(&type_name) {
                return Err(CqlError::descriptor(
                    &descriptor.name,
                    format!("type name `{}` {}", type_name, reason),
                ));
            }
            if descriptor.fields.is_empty() {
                return Err(CqlError::descriptor(
                    &descriptor.name,
                    "object type must declare at least one field",
                ));
            }
            if let Some(existing) = public_names.insert(type_name.clone(), descriptor.name.clone()) {
                return Err(CqlError::descriptor(
                    &descriptor.name,
                    format!("type name `{}` is already used by `{}`", type_name, existing),
                ));
            }
            registry.order.push(descriptor.name.clone());
            registry.types.insert(
                descriptor.name.clone(),
                ObjectType {
                    declared_name: descriptor.name.clone(),
                    type_name,
                    description: descriptor.description.clone(),
                    fields: Vec::new(),
                },
            );
        }

        // Pass 2: field maps.
        for descriptor in store.iter().filter(|d| d.kind == DescriptorKind::Object) {
            let fields = descriptor
                .fields
                .iter()
                .map(|(field_name, field)| {
                    let field_type = registry.type_for_field(field).ok_or_else(|| {
                        CqlError::UnresolvedFieldType {
                            entity: descriptor.name.clone(),
                            field: field_name.clone(),
                            type_name: unresolved_name(field).to_string(),
                        }
                    })?;
                    Ok(ObjectField {
                        name: field_name.clone(),
                        field_type,
                        description: field.description.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if let Some(object) = registry.types.get_mut(&descriptor.name) {
                object.fields = fields;
            }
        }

        debug!(types = registry.len(), "object type registry built");
        Ok(registry)
    }

    /// Resolve a field descriptor: arrays recurse on their element, names try
    /// the scalar mapper (camel-cased) first, then the registry (raw name).
    pub fn type_for_field(&self, descriptor: &TypeDescriptor) -> Option<FieldType> {
        match descriptor.kind {
            DescriptorKind::Array => {
                let element = descriptor.element_type.as_deref()?;
                let inner = self.type_for_field(element)?;
                Some(FieldType::List(Box::new(inner)))
            }
            DescriptorKind::ScalarRef | DescriptorKind::Object => {
                if let Some(scalar) = ScalarType::from_name(&camelize(&descriptor.name)) {
                    return Some(FieldType::Scalar(scalar));
                }
                self.types
                    .contains_key(&descriptor.name)
                    .then(|| FieldType::Object(descriptor.name.clone()))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    /// Object types in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectType> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Innermost referenced name, for error reporting.
fn unresolved_name(descriptor: &TypeDescriptor) -> &str {
    match descriptor.element_type.as_deref() {
        Some(element) if descriptor.kind == DescriptorKind::Array => unresolved_name(element),
        _ => &descriptor.name,
    }
}
