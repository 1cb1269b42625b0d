//! Narrative objects and the duplicate primitive used for clones and shadows.

use crate::id::{ArticyId, CloneId};
use crate::property::{self, PropertyBag, PropertyValue};
use crate::value::ExpressoValue;

/// Deep copy used when seeding clones and shadow levels.
pub trait Duplicate {
    /// An independent copy sharing no mutable state with `self`.
    fn duplicate(&self) -> Self;

    /// Tag the copy with the clone it now belongs to.
    fn set_clone_id(&mut self, clone_id: CloneId);
}

/// One instance of a narrative object.
///
/// Parent and children are stored as ids and resolved through the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticyObject {
    /// Unique id of the canonical object.
    pub id: ArticyId,
    /// Which clone this instance belongs to.
    pub clone_id: CloneId,
    /// Designer-assigned name; not guaranteed unique.
    pub technical_name: String,
    /// Parent object, or null.
    pub parent: ArticyId,
    /// Child objects.
    pub children: Vec<ArticyId>,
    /// Export type name, resolved through the type system.
    pub type_name: String,
    /// Stored properties.
    pub properties: PropertyBag,
}

impl ArticyObject {
    /// Create an object with no properties.
    pub fn new(id: ArticyId, type_name: impl Into<String>, technical_name: impl Into<String>) -> Self {
        Self {
            id,
            clone_id: 0,
            technical_name: technical_name.into(),
            parent: ArticyId::NULL,
            children: Vec::new(),
            type_name: type_name.into(),
            properties: PropertyBag::new(),
        }
    }

    /// Set the parent id.
    pub fn with_parent(mut self, parent: ArticyId) -> Self {
        self.parent = parent;
        self
    }

    /// Add one property.
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// Replace all properties.
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = properties;
        self
    }

    /// Look up a property or `Feature.Property` path.
    pub fn property(&self, path: &str) -> Option<&PropertyValue> {
        property::resolve_path(&self.properties, path)
    }

    /// Read a property as a script value.
    pub fn get_value(&self, path: &str) -> ExpressoValue {
        ExpressoValue::from_property(self, path)
    }

    /// Write a script value into an existing property.
    pub fn set_value(&mut self, path: &str, value: &ExpressoValue) -> bool {
        value.set_on(self, path)
    }

    /// The `"<id>_<clone>"` handle for this instance.
    pub fn handle(&self) -> String {
        self.id.with_clone(self.clone_id)
    }
}

impl Duplicate for ArticyObject {
    fn duplicate(&self) -> Self {
        self.clone()
    }

    fn set_clone_id(&mut self, clone_id: CloneId) {
        self.clone_id = clone_id;
    }
}
