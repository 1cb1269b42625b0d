//! Object properties and the per-kind accessor registry.
//!
//! Every stored property carries its declared kind. Reading a property as an
//! [`ExpressoValue`] or writing one back goes through the accessor registered
//! for that kind, so scripts can reach any property by name without runtime
//! reflection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ArticyId;
use crate::value::ExpressoValue;

/// The declared storage kind of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// `bool`.
    Bool,
    /// `i8`.
    Int8,
    /// `i16`.
    Int16,
    /// `i32`.
    Int32,
    /// `i64`.
    Int64,
    /// `u8`.
    UInt8,
    /// `u16`.
    UInt16,
    /// `u32`.
    UInt32,
    /// `u64`.
    UInt64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// Plain string.
    String,
    /// Display text.
    Text,
    /// Interned-style name.
    Name,
    /// Reference to another object.
    Id,
    /// Nested property group from an object template.
    Feature,
}

impl PropertyKind {
    /// Map an export type name (`"bool"`, `"int32"`, `"ArticyId"`, ...) to a kind.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => PropertyKind::Bool,
            "int8" => PropertyKind::Int8,
            "int16" => PropertyKind::Int16,
            "int" | "int32" | "integer" => PropertyKind::Int32,
            "int64" | "long" => PropertyKind::Int64,
            "uint8" | "byte" => PropertyKind::UInt8,
            "uint16" => PropertyKind::UInt16,
            "uint32" | "uint" => PropertyKind::UInt32,
            "uint64" | "ulong" => PropertyKind::UInt64,
            "float" | "float32" => PropertyKind::Float32,
            "double" | "float64" => PropertyKind::Float64,
            "string" => PropertyKind::String,
            "text" | "localizedstring" => PropertyKind::Text,
            "name" => PropertyKind::Name,
            "id" | "articyid" | "ref" => PropertyKind::Id,
            "feature" | "template" => PropertyKind::Feature,
            _ => return None,
        };
        Some(kind)
    }
}

/// A stored property value, tagged with its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `bool`.
    Bool(bool),
    /// `i8`.
    Int8(i8),
    /// `i16`.
    Int16(i16),
    /// `i32`.
    Int32(i32),
    /// `i64`.
    Int64(i64),
    /// `u8`.
    UInt8(u8),
    /// `u16`.
    UInt16(u16),
    /// `u32`.
    UInt32(u32),
    /// `u64`.
    UInt64(u64),
    /// `f32`.
    Float32(f32),
    /// `f64`.
    Float64(f64),
    /// Plain string.
    String(String),
    /// Display text.
    Text(String),
    /// Name.
    Name(String),
    /// Object reference.
    Id(ArticyId),
    /// Nested property group.
    Feature(PropertyBag),
}

impl PropertyValue {
    /// The declared kind of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Int8(_) => PropertyKind::Int8,
            PropertyValue::Int16(_) => PropertyKind::Int16,
            PropertyValue::Int32(_) => PropertyKind::Int32,
            PropertyValue::Int64(_) => PropertyKind::Int64,
            PropertyValue::UInt8(_) => PropertyKind::UInt8,
            PropertyValue::UInt16(_) => PropertyKind::UInt16,
            PropertyValue::UInt32(_) => PropertyKind::UInt32,
            PropertyValue::UInt64(_) => PropertyKind::UInt64,
            PropertyValue::Float32(_) => PropertyKind::Float32,
            PropertyValue::Float64(_) => PropertyKind::Float64,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Text(_) => PropertyKind::Text,
            PropertyValue::Name(_) => PropertyKind::Name,
            PropertyValue::Id(_) => PropertyKind::Id,
            PropertyValue::Feature(_) => PropertyKind::Feature,
        }
    }

    /// The zero value for a declared kind.
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Bool => PropertyValue::Bool(false),
            PropertyKind::Int8 => PropertyValue::Int8(0),
            PropertyKind::Int16 => PropertyValue::Int16(0),
            PropertyKind::Int32 => PropertyValue::Int32(0),
            PropertyKind::Int64 => PropertyValue::Int64(0),
            PropertyKind::UInt8 => PropertyValue::UInt8(0),
            PropertyKind::UInt16 => PropertyValue::UInt16(0),
            PropertyKind::UInt32 => PropertyValue::UInt32(0),
            PropertyKind::UInt64 => PropertyValue::UInt64(0),
            PropertyKind::Float32 => PropertyValue::Float32(0.0),
            PropertyKind::Float64 => PropertyValue::Float64(0.0),
            PropertyKind::String => PropertyValue::String(String::new()),
            PropertyKind::Text => PropertyValue::Text(String::new()),
            PropertyKind::Name => PropertyValue::Name(String::new()),
            PropertyKind::Id => PropertyValue::Id(ArticyId::NULL),
            PropertyKind::Feature => PropertyValue::Feature(PropertyBag::new()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Id(id) => write!(f, "{}", id.to_hex()),
            PropertyValue::Feature(bag) => write!(f, "<feature: {} properties>", bag.len()),
            other => write!(f, "{}", ExpressoValue::from(other)),
        }
    }
}

/// An ordered set of named properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up a direct property.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Look up a direct property mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        self.values.get_mut(name)
    }

    /// Whether a direct property exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag has no properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Resolve `Property` or `Feature.Property` within a bag.
pub fn resolve_path<'a>(bag: &'a PropertyBag, path: &str) -> Option<&'a PropertyValue> {
    match path.split_once('.') {
        Some((feature, rest)) => match bag.get(feature) {
            Some(PropertyValue::Feature(inner)) => resolve_path(inner, rest),
            _ => {
                tracing::warn!(feature, path, "feature not found");
                None
            }
        },
        None => bag.get(path),
    }
}

/// Mutable twin of [`resolve_path`].
pub fn resolve_path_mut<'a>(bag: &'a mut PropertyBag, path: &str) -> Option<&'a mut PropertyValue> {
    match path.split_once('.') {
        Some((feature, rest)) => match bag.get_mut(feature) {
            Some(PropertyValue::Feature(inner)) => resolve_path_mut(inner, rest),
            _ => {
                tracing::warn!(feature, path, "feature not found");
                None
            }
        },
        None => bag.get_mut(path),
    }
}

// ---------------------------------------------------------------------------
// Accessor registry
// ---------------------------------------------------------------------------

/// Builds an [`ExpressoValue`] from a stored property.
pub type PropertyFactory = fn(&PropertyValue) -> ExpressoValue;

/// Writes an [`ExpressoValue`] into a stored property, keeping its kind.
pub type PropertySetter = fn(&mut PropertyValue, &ExpressoValue);

/// The factory/setter pair registered for one property kind.
#[derive(Debug, Clone, Copy)]
pub struct PropertyAccessor {
    /// Reads the property.
    pub factory: PropertyFactory,
    /// Writes the property.
    pub setter: PropertySetter,
}

/// Look up the accessor for a kind. Features have none.
pub fn accessor(kind: PropertyKind) -> Option<PropertyAccessor> {
    let (factory, setter): (PropertyFactory, PropertySetter) = match kind {
        PropertyKind::Bool => (read_bool, write_bool),
        PropertyKind::Int8
        | PropertyKind::Int16
        | PropertyKind::Int32
        | PropertyKind::Int64
        | PropertyKind::UInt8
        | PropertyKind::UInt16
        | PropertyKind::UInt32
        | PropertyKind::UInt64 => (read_int, write_int),
        PropertyKind::Float32 | PropertyKind::Float64 => (read_float, write_float),
        PropertyKind::String | PropertyKind::Text | PropertyKind::Name => (read_text, write_text),
        PropertyKind::Id => (read_id, write_id),
        PropertyKind::Feature => return None,
    };
    Some(PropertyAccessor { factory, setter })
}

fn read_bool(value: &PropertyValue) -> ExpressoValue {
    match value {
        PropertyValue::Bool(b) => ExpressoValue::Bool(*b),
        _ => ExpressoValue::Undefined,
    }
}

fn write_bool(slot: &mut PropertyValue, value: &ExpressoValue) {
    if let PropertyValue::Bool(b) = slot {
        *b = value.to_bool();
    }
}

fn read_int(value: &PropertyValue) -> ExpressoValue {
    match value {
        PropertyValue::Int8(v) => ExpressoValue::from(*v),
        PropertyValue::Int16(v) => ExpressoValue::from(*v),
        PropertyValue::Int32(v) => ExpressoValue::from(*v),
        PropertyValue::Int64(v) => ExpressoValue::from(*v),
        PropertyValue::UInt8(v) => ExpressoValue::from(*v),
        PropertyValue::UInt16(v) => ExpressoValue::from(*v),
        PropertyValue::UInt32(v) => ExpressoValue::from(*v),
        PropertyValue::UInt64(v) => ExpressoValue::from(*v),
        _ => ExpressoValue::Undefined,
    }
}

fn write_int(slot: &mut PropertyValue, value: &ExpressoValue) {
    let v = value.to_i64();
    match slot {
        PropertyValue::Int8(x) => *x = v as i8,
        PropertyValue::Int16(x) => *x = v as i16,
        PropertyValue::Int32(x) => *x = v as i32,
        PropertyValue::Int64(x) => *x = v,
        PropertyValue::UInt8(x) => *x = v as u8,
        PropertyValue::UInt16(x) => *x = v as u16,
        PropertyValue::UInt32(x) => *x = v as u32,
        PropertyValue::UInt64(x) => *x = v as u64,
        _ => {}
    }
}

fn read_float(value: &PropertyValue) -> ExpressoValue {
    match value {
        PropertyValue::Float32(v) => ExpressoValue::from(*v),
        PropertyValue::Float64(v) => ExpressoValue::from(*v),
        _ => ExpressoValue::Undefined,
    }
}

fn write_float(slot: &mut PropertyValue, value: &ExpressoValue) {
    match slot {
        PropertyValue::Float32(x) => *x = value.to_f32(),
        PropertyValue::Float64(x) => *x = value.to_f64(),
        _ => {}
    }
}

fn read_text(value: &PropertyValue) -> ExpressoValue {
    match value {
        PropertyValue::String(s) | PropertyValue::Text(s) | PropertyValue::Name(s) => {
            ExpressoValue::String(s.clone())
        }
        _ => ExpressoValue::Undefined,
    }
}

fn write_text(slot: &mut PropertyValue, value: &ExpressoValue) {
    match slot {
        PropertyValue::String(s) | PropertyValue::Text(s) | PropertyValue::Name(s) => {
            *s = value.to_string_value();
        }
        _ => {}
    }
}

fn read_id(value: &PropertyValue) -> ExpressoValue {
    match value {
        PropertyValue::Id(id) => ExpressoValue::from(*id),
        _ => ExpressoValue::Undefined,
    }
}

fn write_id(slot: &mut PropertyValue, value: &ExpressoValue) {
    if let PropertyValue::Id(id) = slot {
        *id = ArticyId::from(value.to_i64() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_but_feature_has_accessor() {
        for kind in [
            PropertyKind::Bool,
            PropertyKind::Int8,
            PropertyKind::UInt64,
            PropertyKind::Float32,
            PropertyKind::Text,
            PropertyKind::Name,
            PropertyKind::Id,
        ] {
            assert!(accessor(kind).is_some(), "{kind:?}");
        }
        assert!(accessor(PropertyKind::Feature).is_none());
    }

    #[test]
    fn setters_keep_declared_kind() {
        let mut slot = PropertyValue::UInt8(0);
        (accessor(PropertyKind::UInt8).unwrap().setter)(&mut slot, &ExpressoValue::Int(7));
        assert_eq!(slot, PropertyValue::UInt8(7));

        let mut slot = PropertyValue::Float32(0.0);
        (accessor(PropertyKind::Float32).unwrap().setter)(&mut slot, &ExpressoValue::Int(2));
        assert_eq!(slot, PropertyValue::Float32(2.0));

        let mut slot = PropertyValue::Text(String::new());
        (accessor(PropertyKind::Text).unwrap().setter)(&mut slot, &ExpressoValue::from("hi"));
        assert_eq!(slot, PropertyValue::Text("hi".into()));
    }

    #[test]
    fn id_reads_as_handle_and_writes_from_handle() {
        let value = PropertyValue::Id(ArticyId::from(42));
        assert_eq!(ExpressoValue::from(&value), ExpressoValue::from("42_0"));

        let mut slot = PropertyValue::Id(ArticyId::NULL);
        (accessor(PropertyKind::Id).unwrap().setter)(&mut slot, &ExpressoValue::from("43690_1"));
        assert_eq!(slot, PropertyValue::Id(ArticyId::from(43690)));
    }

    #[test]
    fn feature_paths() {
        let mut inner = PropertyBag::new();
        inner.insert("Damage", PropertyValue::Int32(3));
        let mut bag = PropertyBag::new();
        bag.insert("Weapon", PropertyValue::Feature(inner));
        bag.insert("Flat", PropertyValue::Bool(true));

        assert_eq!(resolve_path(&bag, "Weapon.Damage"), Some(&PropertyValue::Int32(3)));
        assert_eq!(resolve_path(&bag, "Flat"), Some(&PropertyValue::Bool(true)));
        assert!(resolve_path(&bag, "Flat.Damage").is_none());
        assert!(resolve_path(&bag, "Armor.Damage").is_none());

        if let Some(slot) = resolve_path_mut(&mut bag, "Weapon.Damage") {
            *slot = PropertyValue::Int32(9);
        }
        assert_eq!(resolve_path(&bag, "Weapon.Damage"), Some(&PropertyValue::Int32(9)));
    }

    #[test]
    fn type_names() {
        assert_eq!(PropertyKind::from_type_name("Boolean"), Some(PropertyKind::Bool));
        assert_eq!(PropertyKind::from_type_name("ArticyId"), Some(PropertyKind::Id));
        assert_eq!(PropertyKind::from_type_name("double"), Some(PropertyKind::Float64));
        assert_eq!(PropertyKind::from_type_name("Vector"), None);
    }

    #[test]
    fn display() {
        assert_eq!(PropertyValue::Bool(true).to_string(), "true");
        assert_eq!(PropertyValue::Id(ArticyId::from(0xAAAA)).to_string(), "0x000000000000AAAA");
        assert_eq!(PropertyValue::Float64(1.0).to_string(), "1.0");
    }
}
