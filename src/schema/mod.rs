//! Schema synthesis: descriptor document → named object types.

pub mod descriptor;
pub mod naming;
pub mod registry;
pub mod scalar;

pub use descriptor::{DescriptorKind, TypeDescriptor, TypeDescriptorStore};
pub use naming::{camelize, camelize_lower, is_graphql_name, singularize};
pub use registry::{FieldType, ObjectField, ObjectType, ObjectTypeRegistry};
pub use scalar::ScalarType;
