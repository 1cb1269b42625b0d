//! Object type definitions and inheritance lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::PropertyKind;

/// A declared property on an object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Property name.
    pub name: String,
    /// Declared kind.
    pub kind: PropertyKind,
}

/// One object type from the export's definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticyType {
    /// Type name as used by objects.
    pub technical_name: String,
    /// Base type, if any.
    pub parent: Option<String>,
    /// Declared properties.
    pub properties: Vec<PropertyInfo>,
    /// Names of template features.
    pub features: Vec<String>,
}

impl ArticyType {
    /// Create a type with no base, properties, or features.
    pub fn new(technical_name: impl Into<String>) -> Self {
        Self {
            technical_name: technical_name.into(),
            ..Self::default()
        }
    }

    /// Set the base type.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare a property.
    pub fn with_property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.push(PropertyInfo {
            name: name.into(),
            kind,
        });
        self
    }
}

/// All known object types, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TypeSystem {
    types: HashMap<String, ArticyType>,
}

impl TypeSystem {
    /// Create an empty type system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a type.
    pub fn add(&mut self, ty: ArticyType) {
        self.types.insert(ty.technical_name.clone(), ty);
    }

    /// Look up a type.
    pub fn get(&self, name: &str) -> Option<&ArticyType> {
        self.types.get(name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether `type_name` is `ancestor` or inherits from it.
    ///
    /// Unknown types only match themselves. Cycles in the parent chain stop
    /// the walk.
    pub fn is_a(&self, type_name: &str, ancestor: &str) -> bool {
        let mut current = Some(type_name);
        let mut steps = 0;
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.types.len() + 1 {
                tracing::warn!(type_name, "cycle in type hierarchy");
                return false;
            }
            current = self.types.get(name).and_then(|t| t.parent.as_deref());
        }
        false
    }

    /// Declared kind of a property, searching base types too.
    pub fn property_kind(&self, type_name: &str, property: &str) -> Option<PropertyKind> {
        let mut current = self.types.get(type_name);
        let mut steps = 0;
        while let Some(ty) = current {
            if let Some(info) = ty.properties.iter().find(|p| p.name == property) {
                return Some(info.kind);
            }
            steps += 1;
            if steps > self.types.len() {
                return None;
            }
            current = ty.parent.as_deref().and_then(|p| self.types.get(p));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_types() -> TypeSystem {
        let mut types = TypeSystem::new();
        types.add(ArticyType::new("Entity").with_property("DisplayName", PropertyKind::Text));
        types.add(ArticyType::new("Door").with_parent("Entity").with_property("IsOpen", PropertyKind::Bool));
        types
    }

    #[test]
    fn inheritance() {
        let types = test_types();
        assert!(types.is_a("Door", "Door"));
        assert!(types.is_a("Door", "Entity"));
        assert!(!types.is_a("Entity", "Door"));
        assert!(types.is_a("Unknown", "Unknown"));
        assert!(!types.is_a("Unknown", "Entity"));
    }

    #[test]
    fn inherited_property_kinds() {
        let types = test_types();
        assert_eq!(types.property_kind("Door", "IsOpen"), Some(PropertyKind::Bool));
        assert_eq!(types.property_kind("Door", "DisplayName"), Some(PropertyKind::Text));
        assert_eq!(types.property_kind("Door", "Missing"), None);
    }

    #[test]
    fn cycles_terminate() {
        let mut types = TypeSystem::new();
        types.add(ArticyType::new("A").with_parent("B"));
        types.add(ArticyType::new("B").with_parent("A"));
        assert!(!types.is_a("A", "C"));
        assert_eq!(types.property_kind("A", "X"), None);
    }
}
