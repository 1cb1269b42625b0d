//! Named, independently loadable groups of canonical objects.

use crate::id::ArticyId;
use crate::object::ArticyObject;

/// A package of canonical objects as imported from an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticyPackage {
    /// Package id.
    pub id: ArticyId,
    /// Unique package name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Loaded automatically when the database starts.
    pub is_default: bool,
    /// Canonical objects, in export order.
    pub objects: Vec<ArticyObject>,
}

impl ArticyPackage {
    /// Create an empty, non-default package.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ArticyId::NULL,
            name: name.into(),
            description: String::new(),
            is_default: false,
            objects: Vec::new(),
        }
    }

    /// Mark the package as default or not.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Add a canonical object.
    pub fn with_object(mut self, object: ArticyObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Whether an object with this technical name is part of the package.
    pub fn contains_name(&self, technical_name: &str) -> bool {
        self.objects.iter().any(|o| o.technical_name == technical_name)
    }

    /// Whether an object with this id is part of the package.
    pub fn contains_id(&self, id: ArticyId) -> bool {
        self.objects.iter().any(|o| o.id == id)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the package has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let pkg = ArticyPackage::new("Pkg")
            .with_object(ArticyObject::new(ArticyId::from(1), "Door", "Door"));
        assert!(pkg.contains_name("Door"));
        assert!(!pkg.contains_name("door"));
        assert!(pkg.contains_id(ArticyId::from(1)));
        assert!(!pkg.contains_id(ArticyId::from(2)));
        assert_eq!(pkg.len(), 1);
        assert!(!pkg.is_default);
    }
}
