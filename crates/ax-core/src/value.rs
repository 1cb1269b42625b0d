//! The expresso value: a closed sum over bool, int, float and string.
//!
//! Operators are defined only for specific operand combinations. Any other
//! combination is a contract violation: it is logged at `error` level and
//! yields [`ExpressoValue::Undefined`] (or `false`/`0` for comparisons and
//! conversions) instead of panicking.
//!
//! Ordering assumes a total order over every supported variant: `<=` is
//! `!(>)` and `>=` is `!(<)`. A variant with a partial order would break
//! this.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitXor, Div, Mul, Neg, Not, Rem, Sub};

use crate::id::{ArticyId, CloneId};
use crate::object::ArticyObject;
use crate::property::{self, PropertyValue};

/// The variant tag of an [`ExpressoValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value yet.
    Undefined,
    /// A boolean.
    Bool,
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit float.
    Float,
    /// A string.
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Undefined => "undefined",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A dynamically typed script value.
#[derive(Debug, Clone, Default)]
pub enum ExpressoValue {
    /// Transient default; never the result of a successful conversion.
    #[default]
    Undefined,
    /// A boolean.
    Bool(bool),
    /// Every integer width normalizes to this.
    Int(i64),
    /// Every float width normalizes to this.
    Float(f64),
    /// Every text-like input normalizes to this.
    String(String),
}

fn unsupported_unary(op: &str, value: &ExpressoValue) {
    tracing::error!(op, operand = %value.value_type(), "unsupported expresso operand");
}

fn unsupported(op: &str, lhs: &ExpressoValue, rhs: &ExpressoValue) {
    tracing::error!(
        op,
        lhs = %lhs.value_type(),
        rhs = %rhs.value_type(),
        "unsupported expresso operands"
    );
}

impl ExpressoValue {
    /// The variant tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            ExpressoValue::Undefined => ValueType::Undefined,
            ExpressoValue::Bool(_) => ValueType::Bool,
            ExpressoValue::Int(_) => ValueType::Int,
            ExpressoValue::Float(_) => ValueType::Float,
            ExpressoValue::String(_) => ValueType::String,
        }
    }

    /// Whether this is the transient undefined value.
    pub fn is_undefined(&self) -> bool {
        matches!(self, ExpressoValue::Undefined)
    }

    /// The handle string `"<id>_<clone>"` for an object, `"0_0"` for none.
    pub fn from_object(object: Option<&ArticyObject>) -> Self {
        match object {
            Some(obj) => ExpressoValue::String(obj.id.with_clone(obj.clone_id)),
            None => ExpressoValue::String(ArticyId::NULL.with_clone(0)),
        }
    }

    /// Read a property (or `Feature.Property` path) through its registered
    /// accessor.
    ///
    /// A missing property, a missing feature, or a kind without an accessor
    /// is logged and yields `Undefined`.
    pub fn from_property(object: &ArticyObject, path: &str) -> Self {
        let Some(value) = property::resolve_path(&object.properties, path) else {
            tracing::error!(object = %object.id, path, "property not found");
            return ExpressoValue::Undefined;
        };
        match property::accessor(value.kind()) {
            Some(accessor) => (accessor.factory)(value),
            None => {
                tracing::error!(path, kind = ?value.kind(), "no accessor registered for property kind");
                ExpressoValue::Undefined
            }
        }
    }

    /// Write this value into a property (or `Feature.Property` path) through
    /// the registered setter. Returns `false` when nothing was written.
    pub fn set_on(&self, object: &mut ArticyObject, path: &str) -> bool {
        let Some(slot) = property::resolve_path_mut(&mut object.properties, path) else {
            tracing::warn!(object = %object.id, path, "cannot set missing property");
            return false;
        };
        match property::accessor(slot.kind()) {
            Some(accessor) => {
                (accessor.setter)(slot, self);
                true
            }
            None => {
                tracing::error!(path, kind = ?slot.kind(), "no accessor registered for property kind");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    /// Requires `Bool`.
    pub fn to_bool(&self) -> bool {
        match self {
            ExpressoValue::Bool(b) => *b,
            other => {
                unsupported_unary("to_bool", other);
                false
            }
        }
    }

    /// Accepts `Int`, `Float` (truncating) or an object handle string, whose
    /// id segment is returned.
    pub fn to_i64(&self) -> i64 {
        match self {
            ExpressoValue::Int(i) => *i,
            ExpressoValue::Float(f) => *f as i64,
            ExpressoValue::String(s) => {
                let parts: Vec<&str> = s.split('_').collect();
                match parts.as_slice() {
                    [id, _] => match id.parse::<u64>() {
                        Ok(id) => id as i64,
                        Err(_) => {
                            tracing::error!(value = %s, "object handle has a non-numeric id");
                            0
                        }
                    },
                    _ => {
                        tracing::error!(value = %s, "string is not an object handle");
                        0
                    }
                }
            }
            other => {
                unsupported_unary("to_i64", other);
                0
            }
        }
    }

    /// Narrowing form of [`to_i64`](Self::to_i64).
    pub fn to_i32(&self) -> i32 {
        self.to_i64() as i32
    }

    /// Accepts `Float` or `Int`.
    pub fn to_f64(&self) -> f64 {
        match self {
            ExpressoValue::Float(f) => *f,
            ExpressoValue::Int(i) => *i as f64,
            other => {
                unsupported_unary("to_f64", other);
                0.0
            }
        }
    }

    /// Narrowing form of [`to_f64`](Self::to_f64).
    pub fn to_f32(&self) -> f32 {
        self.to_f64() as f32
    }

    /// Requires `String`.
    pub fn to_string_value(&self) -> String {
        match self {
            ExpressoValue::String(s) => s.clone(),
            other => {
                unsupported_unary("to_string_value", other);
                String::new()
            }
        }
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExpressoValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret this value as an object handle.
    pub fn as_handle(&self) -> Option<(ArticyId, CloneId)> {
        self.as_str().and_then(crate::id::parse_compound)
    }

    // -----------------------------------------------------------------------
    // Logical operators
    // -----------------------------------------------------------------------

    /// Logical AND. Ints and floats combine by truthiness and keep their type.
    pub fn and(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => ExpressoValue::Bool(*a && *b),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => {
                ExpressoValue::Int(i64::from(*a != 0 && *b != 0))
            }
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => {
                ExpressoValue::Float(if *a != 0.0 && *b != 0.0 { 1.0 } else { 0.0 })
            }
            _ => {
                unsupported("&&", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    /// Logical OR. Ints and floats combine by truthiness and keep their type.
    pub fn or(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => ExpressoValue::Bool(*a || *b),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => {
                ExpressoValue::Int(i64::from(*a != 0 || *b != 0))
            }
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => {
                ExpressoValue::Float(if *a != 0.0 || *b != 0.0 { 1.0 } else { 0.0 })
            }
            _ => {
                unsupported("||", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    /// Logical XOR for bools, bitwise for ints. Floats are unsupported.
    pub fn xor(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => ExpressoValue::Bool(a ^ b),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => ExpressoValue::Int(a ^ b),
            _ => {
                unsupported("^", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    fn negate(&self) -> ExpressoValue {
        match self {
            ExpressoValue::Bool(b) => ExpressoValue::Bool(!b),
            ExpressoValue::Int(i) => ExpressoValue::Int(i.wrapping_neg()),
            ExpressoValue::Float(f) => ExpressoValue::Float(-f),
            // Degenerate: negating a string empties it.
            ExpressoValue::String(_) => ExpressoValue::String(String::new()),
            ExpressoValue::Undefined => {
                unsupported_unary("-", self);
                ExpressoValue::Undefined
            }
        }
    }

    fn add_value(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => ExpressoValue::Bool(*a || *b),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => ExpressoValue::Int(a.wrapping_add(*b)),
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => ExpressoValue::Float(a + b),
            (ExpressoValue::String(a), ExpressoValue::String(b)) => {
                ExpressoValue::String(format!("{a}{b}"))
            }
            _ => {
                unsupported("+", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    fn mul_value(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => ExpressoValue::Bool(*a && *b),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => ExpressoValue::Int(a.wrapping_mul(*b)),
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => ExpressoValue::Float(a * b),
            _ => {
                unsupported("*", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    fn div_value(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => match a.checked_div(*b) {
                Some(q) => ExpressoValue::Int(q),
                None => {
                    tracing::error!(lhs = a, rhs = b, "integer division failed");
                    ExpressoValue::Undefined
                }
            },
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => ExpressoValue::Float(a / b),
            _ => {
                unsupported("/", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    /// Int remainder. For floats this is the fractional part of the left
    /// operand; the right operand only selects the float arm.
    fn rem_value(&self, other: &ExpressoValue) -> ExpressoValue {
        match (self, other) {
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => match a.checked_rem(*b) {
                Some(r) => ExpressoValue::Int(r),
                None => {
                    tracing::error!(lhs = a, rhs = b, "integer remainder failed");
                    ExpressoValue::Undefined
                }
            },
            (ExpressoValue::Float(a), ExpressoValue::Float(_)) => ExpressoValue::Float(a.fract()),
            _ => {
                unsupported("%", self, other);
                ExpressoValue::Undefined
            }
        }
    }

    fn compare(&self, other: &ExpressoValue, op: &str) -> Option<Ordering> {
        match (self, other) {
            (ExpressoValue::Bool(a), ExpressoValue::Bool(b)) => Some(a.cmp(b)),
            (ExpressoValue::Int(a), ExpressoValue::Int(b)) => Some(a.cmp(b)),
            (ExpressoValue::Int(a), ExpressoValue::Float(b)) => (*a as f64).partial_cmp(b),
            (ExpressoValue::Float(a), ExpressoValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (ExpressoValue::Float(a), ExpressoValue::Float(b)) => a.partial_cmp(b),
            (ExpressoValue::String(a), ExpressoValue::String(b)) => Some(a.cmp(b)),
            _ => {
                unsupported(op, self, other);
                None
            }
        }
    }
}

impl fmt::Display for ExpressoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressoValue::Undefined => Ok(()),
            ExpressoValue::Bool(b) => write!(f, "{b}"),
            ExpressoValue::Int(i) => write!(f, "{i}"),
            ExpressoValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            ExpressoValue::Float(v) => write!(f, "{v}"),
            ExpressoValue::String(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ExpressoValue {
            fn from(value: $t) -> Self {
                ExpressoValue::Int(value as i64)
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<bool> for ExpressoValue {
    fn from(value: bool) -> Self {
        ExpressoValue::Bool(value)
    }
}

impl From<f32> for ExpressoValue {
    fn from(value: f32) -> Self {
        ExpressoValue::Float(f64::from(value))
    }
}

impl From<f64> for ExpressoValue {
    fn from(value: f64) -> Self {
        ExpressoValue::Float(value)
    }
}

impl From<String> for ExpressoValue {
    fn from(value: String) -> Self {
        ExpressoValue::String(value)
    }
}

impl From<&str> for ExpressoValue {
    fn from(value: &str) -> Self {
        ExpressoValue::String(value.to_string())
    }
}

impl From<ArticyId> for ExpressoValue {
    fn from(id: ArticyId) -> Self {
        ExpressoValue::String(id.with_clone(0))
    }
}

impl From<&PropertyValue> for ExpressoValue {
    fn from(value: &PropertyValue) -> Self {
        match property::accessor(value.kind()) {
            Some(accessor) => (accessor.factory)(value),
            None => ExpressoValue::Undefined,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

impl PartialEq for ExpressoValue {
    /// Same-type equality plus cross int/float comparison. `Undefined`
    /// equals only itself; other mismatches are logged and unequal.
    fn eq(&self, other: &Self) -> bool {
        if self.is_undefined() && other.is_undefined() {
            return true;
        }
        self.compare(other, "==") == Some(Ordering::Equal)
    }
}

impl PartialOrd for ExpressoValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other, "<=>")
    }

    fn lt(&self, other: &Self) -> bool {
        self.compare(other, "<") == Some(Ordering::Less)
    }

    fn gt(&self, other: &Self) -> bool {
        self.compare(other, ">") == Some(Ordering::Greater)
    }

    fn le(&self, other: &Self) -> bool {
        !self.gt(other)
    }

    fn ge(&self, other: &Self) -> bool {
        !self.lt(other)
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Neg for &ExpressoValue {
    type Output = ExpressoValue;

    fn neg(self) -> ExpressoValue {
        self.negate()
    }
}

impl Neg for ExpressoValue {
    type Output = ExpressoValue;

    fn neg(self) -> ExpressoValue {
        self.negate()
    }
}

impl Not for &ExpressoValue {
    type Output = ExpressoValue;

    fn not(self) -> ExpressoValue {
        self.negate()
    }
}

impl Not for ExpressoValue {
    type Output = ExpressoValue;

    fn not(self) -> ExpressoValue {
        self.negate()
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $body:expr) => {
        impl $trait<&ExpressoValue> for &ExpressoValue {
            type Output = ExpressoValue;

            fn $method(self, rhs: &ExpressoValue) -> ExpressoValue {
                let f: fn(&ExpressoValue, &ExpressoValue) -> ExpressoValue = $body;
                f(self, rhs)
            }
        }

        impl $trait for ExpressoValue {
            type Output = ExpressoValue;

            fn $method(self, rhs: ExpressoValue) -> ExpressoValue {
                (&self).$method(&rhs)
            }
        }
    };
}

binary_op!(Add, add, |a, b| a.add_value(b));
binary_op!(Sub, sub, |a, b| a.add_value(&b.negate()));
binary_op!(Mul, mul, |a, b| a.mul_value(b));
binary_op!(Div, div, |a, b| a.div_value(b));
binary_op!(Rem, rem, |a, b| a.rem_value(b));
binary_op!(BitXor, bitxor, |a, b| a.xor(b));
