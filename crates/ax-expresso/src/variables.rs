//! Global variables: namespaced, typed, shadow-aware script state.
//!
//! Every variable keeps a stack of `(level, value)` pairs. A write at a
//! deeper shadow level pushes a new pair; popping the level drops it. Seen
//! counters and fallback flags are whole maps pushed and popped in lockstep.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use ax_core::import::{NamespaceDef, VariableDef, VariableKind};
use ax_core::{ArticyId, ExpressoValue, ShadowState, ShadowStateManager};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ExpressoError, ExpressoResult};

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// A fully qualified variable name, `Namespace.Variable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GvName {
    namespace: String,
    variable: String,
}

impl GvName {
    /// Build from its two parts.
    pub fn new(namespace: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            variable: variable.into(),
        }
    }

    /// Split `Namespace.Variable` at the first dot. Both parts must be non-empty.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (namespace, variable) = full_name.split_once('.')?;
        if namespace.is_empty() || variable.is_empty() {
            return None;
        }
        Some(Self::new(namespace, variable))
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The variable part.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// `Namespace.Variable`.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.variable)
    }
}

impl FromStr for GvName {
    type Err = ExpressoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GvName::parse(s).ok_or_else(|| ExpressoError::InvalidName(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

fn kind_name(kind: VariableKind) -> &'static str {
    match kind {
        VariableKind::Boolean => "bool",
        VariableKind::Integer => "int",
        VariableKind::String => "string",
    }
}

/// Coerce `value` to the variable's type. Ints accept floats (truncated).
fn coerce(kind: VariableKind, value: &ExpressoValue) -> Option<ExpressoValue> {
    match (kind, value) {
        (VariableKind::Boolean, ExpressoValue::Bool(_))
        | (VariableKind::Integer, ExpressoValue::Int(_))
        | (VariableKind::String, ExpressoValue::String(_)) => Some(value.clone()),
        (VariableKind::Integer, ExpressoValue::Float(f)) => Some(ExpressoValue::Int(*f as i64)),
        _ => None,
    }
}

/// Interpret an exported initial value. A missing value is the type's zero.
fn default_from_json(kind: VariableKind, value: &Value) -> Option<ExpressoValue> {
    match (kind, value) {
        (VariableKind::Boolean, Value::Null) => Some(ExpressoValue::Bool(false)),
        (VariableKind::Integer, Value::Null) => Some(ExpressoValue::Int(0)),
        (VariableKind::String, Value::Null) => Some(ExpressoValue::String(String::new())),
        (VariableKind::Boolean, Value::Bool(b)) => Some(ExpressoValue::Bool(*b)),
        (VariableKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(ExpressoValue::Bool(true)),
            "false" => Some(ExpressoValue::Bool(false)),
            _ => None,
        },
        (VariableKind::Integer, Value::Number(n)) => n.as_i64().map(ExpressoValue::Int),
        (VariableKind::Integer, Value::String(s)) => s.trim().parse().ok().map(ExpressoValue::Int),
        (VariableKind::String, Value::String(s)) => Some(ExpressoValue::String(s.clone())),
        (VariableKind::String, other) => Some(ExpressoValue::String(other.to_string())),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Variable {
    kind: VariableKind,
    default: ExpressoValue,
    description: String,
    // Never empty; the first entry is level 0.
    values: Vec<(u32, ExpressoValue)>,
}

impl Variable {
    fn new(kind: VariableKind, default: ExpressoValue, description: String) -> Self {
        Self {
            kind,
            values: vec![(0, default.clone())],
            default,
            description,
        }
    }

    fn current(&self) -> &ExpressoValue {
        match self.values.last() {
            Some((_, value)) => value,
            None => &self.default,
        }
    }

    fn write(&mut self, level: u32, value: ExpressoValue) {
        match self.values.last_mut() {
            Some((top, slot)) if *top == level => *slot = value,
            _ => self.values.push((level, value)),
        }
    }

    fn discard_above(&mut self, level: u32) {
        self.values.retain(|(l, _)| *l <= level);
    }
}

/// The variables of one namespace.
#[derive(Debug, Clone, Default)]
pub struct VariableSet {
    description: String,
    variables: BTreeMap<String, Variable>,
}

impl VariableSet {
    /// Designer description of the namespace.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Variable names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the namespace declares no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// A serializable view of one variable's current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSnapshot {
    /// `Namespace.Variable`.
    pub name: String,
    /// `bool`, `int` or `string`.
    pub kind: &'static str,
    /// Current value at the active shadow level.
    pub value: Value,
    /// Designer description.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Global variables
// ---------------------------------------------------------------------------

/// All global variable namespaces plus seen counters and fallback flags.
#[derive(Debug)]
pub struct GlobalVariables {
    namespaces: BTreeMap<String, VariableSet>,
    shadow: ShadowState,
    log_access: bool,

    // One map per shadow level; the last is current.
    seen: Vec<HashMap<ArticyId, i32>>,
    fallback: Vec<HashMap<ArticyId, bool>>,
}

impl Default for GlobalVariables {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalVariables {
    /// An empty set with no namespaces.
    pub fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            shadow: ShadowState::new(),
            log_access: false,
            seen: vec![HashMap::new()],
            fallback: vec![HashMap::new()],
        }
    }

    /// Build from exported namespace definitions.
    pub fn from_definitions(definitions: &[NamespaceDef]) -> ExpressoResult<Self> {
        let mut variables = Self::new();
        for namespace in definitions {
            variables.add_namespace(&namespace.namespace, &namespace.description);
            for def in &namespace.variables {
                variables.declare_from(&namespace.namespace, def)?;
            }
        }
        tracing::debug!(namespaces = variables.namespaces.len(), "built global variables");
        Ok(variables)
    }

    fn declare_from(&mut self, namespace: &str, def: &VariableDef) -> ExpressoResult<()> {
        let name = GvName::new(namespace, &def.variable);
        let default = default_from_json(def.kind, &def.value).ok_or_else(|| {
            ExpressoError::InvalidDefault {
                name: name.full_name(),
                value: def.value.to_string(),
            }
        })?;
        self.insert_variable(name, def.kind, default, def.description.clone())
    }

    /// Add an empty namespace. Existing namespaces are kept.
    pub fn add_namespace(&mut self, namespace: &str, description: &str) {
        self.namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| VariableSet {
                description: description.to_string(),
                variables: BTreeMap::new(),
            });
    }

    /// Declare a variable, creating its namespace when needed.
    pub fn declare(
        &mut self,
        name: &GvName,
        kind: VariableKind,
        default: ExpressoValue,
    ) -> ExpressoResult<()> {
        let default = coerce(kind, &default).ok_or_else(|| ExpressoError::InvalidDefault {
            name: name.full_name(),
            value: default.to_string(),
        })?;
        self.insert_variable(name.clone(), kind, default, String::new())
    }

    fn insert_variable(
        &mut self,
        name: GvName,
        kind: VariableKind,
        default: ExpressoValue,
        description: String,
    ) -> ExpressoResult<()> {
        let set = self.namespaces.entry(name.namespace.clone()).or_default();
        if set.variables.contains_key(&name.variable) {
            return Err(ExpressoError::DuplicateVariable(name.full_name()));
        }
        set.variables
            .insert(name.variable, Variable::new(kind, default, description));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// Namespace names, sorted.
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// One namespace.
    pub fn namespace(&self, namespace: &str) -> Option<&VariableSet> {
        self.namespaces.get(namespace)
    }

    /// Whether the variable is declared.
    pub fn contains(&self, name: &GvName) -> bool {
        self.variable(name).is_some()
    }

    /// Declared type of a variable.
    pub fn kind_of(&self, name: &GvName) -> Option<VariableKind> {
        self.variable(name).map(|v| v.kind)
    }

    /// Every variable name, sorted by namespace then variable.
    pub fn names(&self) -> Vec<GvName> {
        self.namespaces
            .iter()
            .flat_map(|(ns, set)| set.variables.keys().map(move |v| GvName::new(ns, v)))
            .collect()
    }

    fn variable(&self, name: &GvName) -> Option<&Variable> {
        self.namespaces
            .get(&name.namespace)
            .and_then(|set| set.variables.get(&name.variable))
    }

    fn variable_mut(&mut self, name: &GvName) -> Option<&mut Variable> {
        self.namespaces
            .get_mut(&name.namespace)
            .and_then(|set| set.variables.get_mut(&name.variable))
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Current value at the active shadow level.
    pub fn get(&self, name: &GvName) -> Option<ExpressoValue> {
        match self.variable(name) {
            Some(variable) => {
                let value = variable.current().clone();
                if self.log_access {
                    tracing::debug!(variable = %name, %value, "read global variable");
                }
                Some(value)
            }
            None => {
                if !self.namespaces.contains_key(&name.namespace) {
                    tracing::error!(namespace = name.namespace(), "global variable namespace not found");
                } else {
                    tracing::error!(variable = %name, "global variable not found");
                }
                None
            }
        }
    }

    /// Write at the active shadow level. Fails on unknown names and type
    /// mismatches; ints accept floats by truncation.
    pub fn set(&mut self, name: &GvName, value: &ExpressoValue) -> bool {
        let level = self.shadow.shadow_level();
        let log_access = self.log_access;
        let Some(variable) = self.variable_mut(name) else {
            tracing::error!(variable = %name, "cannot set unknown global variable");
            return false;
        };
        let Some(value) = coerce(variable.kind, value) else {
            tracing::error!(
                variable = %name,
                expected = kind_name(variable.kind),
                found = %value.value_type(),
                "global variable type mismatch"
            );
            return false;
        };
        if log_access {
            tracing::debug!(variable = %name, %value, level, "set global variable");
        }
        variable.write(level, value);
        true
    }

    /// Read a bool variable.
    pub fn get_bool_variable(&self, name: &GvName) -> Option<bool> {
        match self.get(name)? {
            ExpressoValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Read an int variable.
    pub fn get_int_variable(&self, name: &GvName) -> Option<i64> {
        match self.get(name)? {
            ExpressoValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Read a string variable.
    pub fn get_string_variable(&self, name: &GvName) -> Option<String> {
        match self.get(name)? {
            ExpressoValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Write a bool variable.
    pub fn set_bool_variable(&mut self, name: &GvName, value: bool) -> bool {
        self.set(name, &ExpressoValue::Bool(value))
    }

    /// Write an int variable.
    pub fn set_int_variable(&mut self, name: &GvName, value: i64) -> bool {
        self.set(name, &ExpressoValue::Int(value))
    }

    /// Write a string variable.
    pub fn set_string_variable(&mut self, name: &GvName, value: impl Into<String>) -> bool {
        self.set(name, &ExpressoValue::String(value.into()))
    }

    /// Log a variable's current value at info level. Returns whether it exists.
    pub fn print_variable(&self, name: &GvName) -> bool {
        match self.variable(name) {
            Some(variable) => {
                let value = variable.current();
                tracing::info!("{}::{} = {}", name.namespace, name.variable, value);
                true
            }
            None => {
                tracing::error!("unable to find variable: {}::{}", name.namespace, name.variable);
                false
            }
        }
    }

    /// Write every variable's declared default at the active shadow level.
    pub fn reset_to_defaults(&mut self) {
        let level = self.shadow.shadow_level();
        for set in self.namespaces.values_mut() {
            for variable in set.variables.values_mut() {
                let default = variable.default.clone();
                variable.write(level, default);
            }
        }
        tracing::debug!(level, "reset global variables to defaults");
    }

    /// Current values of every variable.
    pub fn snapshot(&self) -> Vec<VariableSnapshot> {
        self.namespaces
            .iter()
            .flat_map(|(ns, set)| {
                set.variables.iter().map(move |(name, variable)| VariableSnapshot {
                    name: format!("{ns}.{name}"),
                    kind: kind_name(variable.kind),
                    value: match variable.current() {
                        ExpressoValue::Bool(b) => Value::Bool(*b),
                        ExpressoValue::Int(i) => Value::from(*i),
                        ExpressoValue::String(s) => Value::String(s.clone()),
                        ExpressoValue::Float(f) => Value::from(*f),
                        ExpressoValue::Undefined => Value::Null,
                    },
                    description: variable.description.clone(),
                })
            })
            .collect()
    }

    /// Log reads and writes at debug level.
    pub fn enable_debug_logging(&mut self) {
        self.log_access = true;
    }

    /// Stop logging reads and writes.
    pub fn disable_debug_logging(&mut self) {
        self.log_access = false;
    }

    /// Whether reads and writes are logged.
    pub fn is_debug_logging(&self) -> bool {
        self.log_access
    }

    // -----------------------------------------------------------------------
    // Shadow levels
    // -----------------------------------------------------------------------

    /// Current shadow level.
    pub fn shadow_level(&self) -> u32 {
        self.shadow.shadow_level()
    }

    /// Enter a shadow level. Seen counters and fallback flags are copied.
    pub fn push_state(&mut self) {
        self.shadow.push_state();
        let seen = self.seen.last().cloned().unwrap_or_default();
        self.seen.push(seen);
        let fallback = self.fallback.last().cloned().unwrap_or_default();
        self.fallback.push(fallback);
    }

    /// Leave a shadow level, discarding everything written inside it.
    pub fn pop_state(&mut self) {
        let level = self.shadow.shadow_level();
        if level == 0 {
            tracing::error!("global variables popped at shadow level 0");
            return;
        }
        self.shadow.pop_state();
        let remaining = level - 1;
        for set in self.namespaces.values_mut() {
            for variable in set.variables.values_mut() {
                variable.discard_above(remaining);
            }
        }
        if self.seen.len() > 1 {
            self.seen.pop();
        }
        if self.fallback.len() > 1 {
            self.fallback.pop();
        }
    }

    // -----------------------------------------------------------------------
    // Seen counters and fallback
    // -----------------------------------------------------------------------

    fn seen_top(&mut self) -> &mut HashMap<ArticyId, i32> {
        if self.seen.is_empty() {
            self.seen.push(HashMap::new());
        }
        let last = self.seen.len() - 1;
        &mut self.seen[last]
    }

    fn fallback_top(&mut self) -> &mut HashMap<ArticyId, bool> {
        if self.fallback.is_empty() {
            self.fallback.push(HashMap::new());
        }
        let last = self.fallback.len() - 1;
        &mut self.fallback[last]
    }

    /// How often `id` was seen at the active level.
    pub fn seen_counter(&self, id: ArticyId) -> i32 {
        self.seen
            .last()
            .and_then(|counters| counters.get(&id).copied())
            .unwrap_or(0)
    }

    /// Overwrite the counter for `id`. Returns the new value.
    pub fn set_seen_counter(&mut self, id: ArticyId, value: i32) -> i32 {
        self.seen_top().insert(id, value);
        value
    }

    /// Bump the counter for `id`. Returns the new value.
    pub fn increment_seen_counter(&mut self, id: ArticyId) -> i32 {
        let counter = self.seen_top().entry(id).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Forget every seen counter at the active level.
    ///
    /// Lower levels keep their counters and come back when this level is
    /// popped.
    pub fn reset_visited(&mut self) {
        self.seen_top().clear();
    }

    /// The fallback flag for `id`, or whether any flag is set when `None`.
    pub fn fallback(&self, id: Option<ArticyId>) -> bool {
        let Some(flags) = self.fallback.last() else {
            return false;
        };
        match id {
            Some(id) => flags.get(&id).copied().unwrap_or(false),
            None => flags.values().any(|set| *set),
        }
    }

    /// Set the fallback flag for `id` at the active level.
    pub fn set_fallback_evaluation(&mut self, id: ArticyId, value: bool) {
        self.fallback_top().insert(id, value);
    }
}
