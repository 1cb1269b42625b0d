//! Compiled script fragments and the context they run in.
//!
//! [`ExpressoScripts`] maps fragment hashes to compiled closures. Every
//! [`evaluate`](ExpressoScripts::evaluate) or
//! [`execute`](ExpressoScripts::execute) call builds a fresh
//! [`EvaluationContext`] borrowing the database, the variables, and the
//! method provider for exactly that call.

use std::collections::HashMap;
use std::fmt;

use ax_core::id::parse_compound;
use ax_core::{ArticyDatabase, ArticyId, CloneId, ExpressoValue, ObjectRef, ScriptKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compiler::Compiler;
use crate::error::ExpressoResult;
use crate::fragment::{EMPTY_FRAGMENT_HASH, ScriptFragment};
use crate::variables::GlobalVariables;

/// A compiled condition.
pub type Condition = Box<dyn Fn(&mut EvaluationContext<'_>) -> bool>;

/// A compiled instruction.
pub type Instruction = Box<dyn Fn(&mut EvaluationContext<'_>)>;

/// Host-provided functions callable from scripts by name.
pub trait UserMethodsProvider {
    /// Run `name` with `args`. `None` means the method is not provided.
    fn call(&mut self, name: &str, args: &[ExpressoValue]) -> Option<ExpressoValue>;
}

impl<F> UserMethodsProvider for F
where
    F: FnMut(&str, &[ExpressoValue]) -> Option<ExpressoValue>,
{
    fn call(&mut self, name: &str, args: &[ExpressoValue]) -> Option<ExpressoValue> {
        self(name, args)
    }
}

// ---------------------------------------------------------------------------
// Evaluation context
// ---------------------------------------------------------------------------

/// Everything a compiled fragment may touch during one call.
pub struct EvaluationContext<'a> {
    database: &'a ArticyDatabase,
    variables: &'a mut GlobalVariables,
    methods: Option<&'a mut dyn UserMethodsProvider>,
    self_object: Option<ObjectRef>,
    speaker: Option<ObjectRef>,
    rng: &'a mut StdRng,
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("shadow_level", &self.variables.shadow_level())
            .field("has_methods", &self.methods.is_some())
            .field("self_object", &self.self_object.as_ref().map(|o| o.borrow().handle()))
            .finish()
    }
}

fn object_id(object: &ObjectRef) -> ArticyId {
    object.borrow().id
}

impl<'a> EvaluationContext<'a> {
    /// A context with no method provider and no `self`/`speaker`.
    pub fn new(
        database: &'a ArticyDatabase,
        variables: &'a mut GlobalVariables,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            database,
            variables,
            methods: None,
            self_object: None,
            speaker: None,
            rng,
        }
    }

    /// Dispatch user methods to `methods`.
    pub fn with_methods(mut self, methods: &'a mut dyn UserMethodsProvider) -> Self {
        self.methods = Some(methods);
        self
    }

    /// Bind the `self` object.
    pub fn with_self(mut self, object: Option<ObjectRef>) -> Self {
        self.self_object = object;
        self
    }

    /// Bind the `speaker` object.
    pub fn with_speaker(mut self, speaker: Option<ObjectRef>) -> Self {
        self.speaker = speaker;
        self
    }

    /// The object database.
    pub fn database(&self) -> &ArticyDatabase {
        self.database
    }

    /// The active global variables.
    pub fn variables(&self) -> &GlobalVariables {
        self.variables
    }

    /// The active global variables, for writing.
    pub fn variables_mut(&mut self) -> &mut GlobalVariables {
        self.variables
    }

    /// The object the fragment belongs to.
    pub fn self_object(&self) -> Option<&ObjectRef> {
        self.self_object.as_ref()
    }

    /// The current speaker.
    pub fn speaker(&self) -> Option<&ObjectRef> {
        self.speaker.as_ref()
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Look up by `0x` hex id, decimal id, or technical name, in that order.
    pub fn get_obj(&self, name_or_id: &str, clone_id: CloneId) -> Option<ObjectRef> {
        if let Some(hex) = name_or_id.strip_prefix("0x") {
            let id = u64::from_str_radix(hex, 16).ok()?;
            return self.database.get_object(ArticyId::from(id), clone_id);
        }
        if !name_or_id.is_empty() && name_or_id.bytes().all(|b| b.is_ascii_digit()) {
            let id = name_or_id.parse::<u64>().ok()?;
            return self.database.get_object(ArticyId::from(id), clone_id);
        }
        self.database.get_object_by_name(name_or_id, clone_id)
    }

    /// Look up a `"<id>_<clone>"` handle through
    /// [`ArticyDatabase::get_object_from_string_representation`]. Only
    /// strings are accepted.
    pub fn get_obj_compound(&self, handle: &ExpressoValue) -> Option<ObjectRef> {
        let Some(text) = handle.as_str() else {
            tracing::error!(value = %handle, "object handles must be strings");
            return None;
        };
        self.database.get_object_from_string_representation(text)
    }

    /// Resolve a script value naming an object: a handle, an id, or a
    /// technical name.
    pub fn resolve_object(&self, value: &ExpressoValue) -> Option<ObjectRef> {
        match value {
            ExpressoValue::String(text) => match parse_compound(text) {
                Some((id, clone_id)) => self.database.get_object(id, clone_id),
                None => self.get_obj(text, 0),
            },
            ExpressoValue::Int(id) => self.database.get_object(ArticyId::from(*id as u64), 0),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    /// Read a property. A missing object yields `Undefined`.
    pub fn get_prop(object: Option<&ObjectRef>, property: &str) -> ExpressoValue {
        match object {
            Some(object) => object.borrow().get_value(property),
            None => {
                tracing::error!(property, "getProp on a missing object");
                ExpressoValue::Undefined
            }
        }
    }

    /// Write a property. Returns whether it was written.
    pub fn set_prop(object: Option<&ObjectRef>, property: &str, value: &ExpressoValue) -> bool {
        match object {
            Some(object) => object.borrow_mut().set_value(property, value),
            None => {
                tracing::error!(property, "setProp on a missing object");
                false
            }
        }
    }

    /// [`get_prop`](Self::get_prop) through a handle.
    pub fn get_prop_compound(&self, handle: &ExpressoValue, property: &str) -> ExpressoValue {
        Self::get_prop(self.get_obj_compound(handle).as_ref(), property)
    }

    /// [`set_prop`](Self::set_prop) through a handle.
    pub fn set_prop_compound(
        &self,
        handle: &ExpressoValue,
        property: &str,
        value: &ExpressoValue,
    ) -> bool {
        Self::set_prop(self.get_obj_compound(handle).as_ref(), property, value)
    }

    /// Add `delta` to a numeric property, keeping its type.
    pub fn increment_prop(object: Option<&ObjectRef>, property: &str, delta: f64) -> bool {
        let next = match Self::get_prop(object, property) {
            ExpressoValue::Int(i) => ExpressoValue::Int((i as f64 + delta) as i64),
            ExpressoValue::Float(f) => ExpressoValue::Float(f + delta),
            other => {
                tracing::error!(property, value = %other, "cannot step a non-numeric property");
                return false;
            }
        };
        Self::set_prop(object, property, &next)
    }

    /// Subtract `delta` from a numeric property, keeping its type.
    pub fn decrement_prop(object: Option<&ObjectRef>, property: &str, delta: f64) -> bool {
        Self::increment_prop(object, property, -delta)
    }

    /// Inclusive numeric range test.
    pub fn is_in_range(value: f64, lower: f64, upper: f64) -> bool {
        value >= lower && value <= upper
    }

    /// Inclusive, case-sensitive lexicographic range test.
    pub fn is_in_string_range(value: &str, lower: &str, upper: &str) -> bool {
        value >= lower && value <= upper
    }

    /// Range test on a property. String bounds compare lexicographically,
    /// anything else numerically.
    pub fn is_prop_in_range(
        object: Option<&ObjectRef>,
        property: &str,
        lower: &ExpressoValue,
        upper: &ExpressoValue,
    ) -> bool {
        let value = Self::get_prop(object, property);
        match (lower, upper) {
            (ExpressoValue::String(lo), ExpressoValue::String(hi)) => {
                Self::is_in_string_range(&value.to_string_value(), lo, hi)
            }
            _ => Self::is_in_range(value.to_f64(), lower.to_f64(), upper.to_f64()),
        }
    }

    // -----------------------------------------------------------------------
    // Seen counters and fallback
    // -----------------------------------------------------------------------

    /// Seen counter of `object`, or of `self` when `None`.
    pub fn get_seen_counter(&self, object: Option<&ObjectRef>) -> i32 {
        match object.or(self.self_object.as_ref()) {
            Some(object) => self.variables.seen_counter(object_id(object)),
            None => 0,
        }
    }

    /// Set the seen counter of `object`, or of `self` when `None`.
    pub fn set_seen_counter(&mut self, object: Option<&ObjectRef>, value: i32) -> i32 {
        let id = match object.or(self.self_object.as_ref()) {
            Some(object) => object_id(object),
            None => return 0,
        };
        self.variables.set_seen_counter(id, value)
    }

    /// Forget every seen counter.
    pub fn reset_all_seen_counters(&mut self) {
        self.variables.reset_visited();
    }

    /// Fallback flag of `object`, or whether any flag is set when `None`.
    pub fn fallback(&self, object: Option<&ObjectRef>) -> bool {
        self.variables.fallback(object.map(object_id))
    }

    // -----------------------------------------------------------------------
    // Randomness and output
    // -----------------------------------------------------------------------

    /// Uniform integer in `[min, max]`. Reversed bounds are swapped.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.random_range(lo..=hi)
    }

    /// Uniform float in `[min, max)`. An empty range yields `min`.
    pub fn random_float(&mut self, min: f64, max: f64) -> f64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        if lo < hi && (hi - lo).is_finite() {
            self.rng.random_range(lo..hi)
        } else {
            lo
        }
    }

    /// Random value between two bounds of the same numeric type.
    pub fn random_value(&mut self, min: &ExpressoValue, max: &ExpressoValue) -> ExpressoValue {
        match (min, max) {
            (ExpressoValue::Int(lo), ExpressoValue::Int(hi)) => {
                ExpressoValue::Int(self.random_int(*lo, *hi))
            }
            (ExpressoValue::Float(lo), ExpressoValue::Float(hi)) => {
                ExpressoValue::Float(self.random_float(*lo, *hi))
            }
            _ => {
                tracing::error!(
                    min = %min.value_type(),
                    max = %max.value_type(),
                    "random needs two ints or two floats"
                );
                ExpressoValue::Undefined
            }
        }
    }

    /// Substitute `{0}`, `{1}`, … with `args` and log the result at info level.
    pub fn print(message: &str, args: &[ExpressoValue]) -> String {
        let text = args
            .iter()
            .enumerate()
            .fold(message.to_string(), |text, (i, arg)| {
                text.replace(&format!("{{{i}}}"), &arg.to_string())
            });
        tracing::info!(target: "expresso", "{text}");
        text
    }

    /// Call a user method. Missing providers and methods yield `Undefined`.
    pub fn call_method(&mut self, name: &str, args: &[ExpressoValue]) -> ExpressoValue {
        let Some(methods) = self.methods.as_deref_mut() else {
            tracing::warn!(method = name, "no user methods provider bound");
            return ExpressoValue::Undefined;
        };
        match methods.call(name, args) {
            Some(value) => value,
            None => {
                tracing::warn!(method = name, "user method not provided");
                ExpressoValue::Undefined
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Script registry
// ---------------------------------------------------------------------------

/// Every compiled condition and instruction, keyed by fragment hash.
pub struct ExpressoScripts {
    conditions: HashMap<i32, Condition>,
    instructions: HashMap<i32, Instruction>,
    fragments: HashMap<i32, ScriptFragment>,
    compiler: Compiler,
    default_methods: Option<Box<dyn UserMethodsProvider>>,
    self_object: Option<ObjectRef>,
    speaker: Option<ObjectRef>,
    rng: StdRng,
}

impl fmt::Debug for ExpressoScripts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressoScripts")
            .field("conditions", &self.conditions.len())
            .field("instructions", &self.instructions.len())
            .field("has_default_methods", &self.default_methods.is_some())
            .finish()
    }
}

impl Default for ExpressoScripts {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExpressoScripts {
    /// An empty registry. `seed` makes `random` reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut scripts = Self {
            conditions: HashMap::new(),
            instructions: HashMap::new(),
            fragments: HashMap::new(),
            compiler: Compiler::new(),
            default_methods: None,
            self_object: None,
            speaker: None,
            rng,
        };
        // The empty fragment is always true / a no-op.
        scripts.add_condition(EMPTY_FRAGMENT_HASH, |_| true);
        scripts.add_instruction(EMPTY_FRAGMENT_HASH, |_| {});
        scripts
    }

    /// Use `compiler` for [`register_source`](Self::register_source).
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// The compiler used for source registration.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Register a condition under `hash`, replacing any previous one.
    pub fn add_condition(
        &mut self,
        hash: i32,
        condition: impl Fn(&mut EvaluationContext<'_>) -> bool + 'static,
    ) {
        self.conditions.insert(hash, Box::new(condition));
    }

    /// Register an instruction under `hash`, replacing any previous one.
    pub fn add_instruction(
        &mut self,
        hash: i32,
        instruction: impl Fn(&mut EvaluationContext<'_>) + 'static,
    ) {
        self.instructions.insert(hash, Box::new(instruction));
    }

    /// Whether a condition is registered under `hash`.
    pub fn has_condition(&self, hash: i32) -> bool {
        self.conditions.contains_key(&hash)
    }

    /// Whether an instruction is registered under `hash`.
    pub fn has_instruction(&self, hash: i32) -> bool {
        self.instructions.contains_key(&hash)
    }

    /// Number of registered conditions, the empty one included.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Number of registered instructions, the empty one included.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Source text registered for `hash`, if it came from
    /// [`register_source`](Self::register_source).
    pub fn fragment(&self, hash: i32) -> Option<&ScriptFragment> {
        self.fragments.get(&hash)
    }

    /// Compile `text` and register it under its fragment hash.
    ///
    /// Already registered fragments are not compiled again.
    pub fn register_source(&mut self, kind: ScriptKind, text: &str) -> ExpressoResult<i32> {
        let fragment = ScriptFragment::new(text);
        let hash = fragment.hash();
        match kind {
            ScriptKind::Condition => {
                if !self.has_condition(hash) {
                    let condition = self.compiler.compile_condition(text)?;
                    self.conditions.insert(hash, condition);
                }
            }
            ScriptKind::Instruction => {
                if !self.has_instruction(hash) {
                    let instruction = self.compiler.compile_instruction(text)?;
                    self.instructions.insert(hash, instruction);
                }
            }
        }
        if !fragment.is_empty() {
            self.fragments.insert(hash, fragment);
        }
        Ok(hash)
    }

    /// Provider used when a call passes none.
    pub fn set_default_user_methods_provider(&mut self, provider: Box<dyn UserMethodsProvider>) {
        self.default_methods = Some(provider);
    }

    /// Remove the default provider.
    pub fn clear_default_user_methods_provider(&mut self) {
        self.default_methods = None;
    }

    /// Whether a default provider is set.
    pub fn has_default_user_methods_provider(&self) -> bool {
        self.default_methods.is_some()
    }

    /// Bind `self` for subsequent calls.
    pub fn set_current_object(&mut self, object: Option<ObjectRef>) {
        self.self_object = object;
    }

    /// Bind `speaker` for subsequent calls.
    pub fn set_speaker(&mut self, speaker: Option<ObjectRef>) {
        self.speaker = speaker;
    }

    /// Run the condition registered under `hash`.
    ///
    /// An unknown hash is an authoring error: it is logged and yields `false`.
    pub fn evaluate(
        &mut self,
        hash: i32,
        database: &ArticyDatabase,
        variables: &mut GlobalVariables,
        methods: Option<&mut dyn UserMethodsProvider>,
    ) -> bool {
        let Some(condition) = self.conditions.get(&hash) else {
            tracing::error!(hash, "no condition registered for fragment hash");
            return false;
        };
        let methods: Option<&mut dyn UserMethodsProvider> = match methods {
            Some(provider) => Some(provider),
            None => match &mut self.default_methods {
                Some(provider) => Some(provider.as_mut()),
                None => None,
            },
        };
        let mut ctx = EvaluationContext {
            database,
            variables,
            methods,
            self_object: self.self_object.clone(),
            speaker: self.speaker.clone(),
            rng: &mut self.rng,
        };
        condition(&mut ctx)
    }

    /// Run the instruction registered under `hash`. Returns whether it ran.
    pub fn execute(
        &mut self,
        hash: i32,
        database: &ArticyDatabase,
        variables: &mut GlobalVariables,
        methods: Option<&mut dyn UserMethodsProvider>,
    ) -> bool {
        let Some(instruction) = self.instructions.get(&hash) else {
            tracing::error!(hash, "no instruction registered for fragment hash");
            return false;
        };
        let methods: Option<&mut dyn UserMethodsProvider> = match methods {
            Some(provider) => Some(provider),
            None => match &mut self.default_methods {
                Some(provider) => Some(provider.as_mut()),
                None => None,
            },
        };
        let mut ctx = EvaluationContext {
            database,
            variables,
            methods,
            self_object: self.self_object.clone(),
            speaker: self.speaker.clone(),
            rng: &mut self.rng,
        };
        instruction(&mut ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::variables::GvName;
    use ax_core::import::VariableKind;
    use ax_core::{ArticyObject, ArticyPackage, DatabaseConfig, PropertyValue};

    fn database() -> ArticyDatabase {
        let chest = ArticyObject::new(ArticyId::from(0x2A), "Chest", "Chest")
            .with_property("Coins", PropertyValue::Int32(3));
        // A technical name made of digits only still resolves as an id.
        let decoy = ArticyObject::new(ArticyId::from(7), "Chest", "42")
            .with_property("Coins", PropertyValue::Int32(0));
        let package = ArticyPackage::new("Main")
            .with_default(true)
            .with_object(chest)
            .with_object(decoy);
        ArticyDatabase::new(vec![package], DatabaseConfig::default())
    }

    fn variables() -> GlobalVariables {
        let mut variables = GlobalVariables::new();
        variables
            .declare(
                &GvName::new("GameState", "awake"),
                VariableKind::Boolean,
                ExpressoValue::Bool(false),
            )
            .unwrap();
        variables
    }

    #[test]
    fn get_obj_prefers_hex_then_decimal_then_name() {
        let db = database();
        let mut vars = variables();
        let mut rng = StdRng::seed_from_u64(1);
        let ctx = EvaluationContext::new(&db, &mut vars, &mut rng);

        let by_hex = ctx.get_obj("0x2A", 0).unwrap();
        assert_eq!(by_hex.borrow().technical_name, "Chest");
        let by_decimal = ctx.get_obj("42", 0).unwrap();
        assert_eq!(by_decimal.borrow().id, ArticyId::from(0x2A));
        let by_name = ctx.get_obj("Chest", 0).unwrap();
        assert!(Rc::ptr_eq(&by_hex, &by_name));
        assert!(ctx.get_obj("0xZZ", 0).is_none());
        assert!(ctx.get_obj("Missing", 0).is_none());
    }

    #[test]
    fn compound_handles() {
        let db = database();
        let mut vars = variables();
        let mut rng = StdRng::seed_from_u64(1);
        let ctx = EvaluationContext::new(&db, &mut vars, &mut rng);

        let handle = ExpressoValue::from("42_0");
        assert_eq!(ctx.get_prop_compound(&handle, "Coins"), ExpressoValue::Int(3));
        assert!(ctx.set_prop_compound(&handle, "Coins", &ExpressoValue::Int(9)));
        assert_eq!(ctx.get_prop_compound(&handle, "Coins"), ExpressoValue::Int(9));

        assert!(ctx.get_obj_compound(&ExpressoValue::Int(42)).is_none());
        assert!(ctx.get_obj_compound(&ExpressoValue::from("42")).is_none());
        assert!(ctx.get_obj_compound(&ExpressoValue::from("42_5")).is_none());
    }

    #[test]
    fn compound_handles_match_database_parsing() {
        let db = database();
        let mut vars = variables();
        let mut rng = StdRng::seed_from_u64(1);
        let ctx = EvaluationContext::new(&db, &mut vars, &mut rng);

        for handle in ["42_0", "42_0_0", "0x2A_0", "Chest_0", "42_x"] {
            let ours = ctx.get_obj_compound(&ExpressoValue::from(handle));
            let theirs = db.get_object_from_string_representation(handle);
            assert_eq!(ours.is_some(), theirs.is_some(), "{handle}");
        }
        let chest = ctx.get_obj_compound(&ExpressoValue::from("42_x")).unwrap();
        assert_eq!(chest.borrow().technical_name, "Chest");
    }

    #[test]
    fn increment_keeps_property_type() {
        let db = database();
        let chest = db.get_object_by_name("Chest", 0);
        assert!(EvaluationContext::increment_prop(chest.as_ref(), "Coins", 1.9));
        assert_eq!(
            EvaluationContext::get_prop(chest.as_ref(), "Coins"),
            ExpressoValue::Int(4)
        );
        assert!(EvaluationContext::decrement_prop(chest.as_ref(), "Coins", 4.0));
        assert_eq!(
            EvaluationContext::get_prop(chest.as_ref(), "Coins"),
            ExpressoValue::Int(0)
        );
        assert!(!EvaluationContext::increment_prop(chest.as_ref(), "Missing", 1.0));
        assert!(!EvaluationContext::increment_prop(None, "Coins", 1.0));
    }

    #[test]
    fn ranges_are_inclusive() {
        assert!(EvaluationContext::is_in_range(1.0, 1.0, 2.0));
        assert!(EvaluationContext::is_in_range(2.0, 1.0, 2.0));
        assert!(!EvaluationContext::is_in_range(2.5, 1.0, 2.0));
        assert!(EvaluationContext::is_in_string_range("apple", "apple", "banana"));
        assert!(!EvaluationContext::is_in_string_range("Apple", "apple", "banana"));
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let db = database();
        let mut vars = variables();
        let draw = |seed: u64, vars: &mut GlobalVariables| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ctx = EvaluationContext::new(&db, vars, &mut rng);
            (0..8).map(|_| ctx.random_int(1, 6)).collect::<Vec<_>>()
        };
        let first = draw(99, &mut vars);
        let second = draw(99, &mut vars);
        assert_eq!(first, second);
        assert!(first.iter().all(|n| (1..=6).contains(n)));
    }

    #[test]
    fn random_bounds() {
        let db = database();
        let mut vars = variables();
        let mut rng = StdRng::seed_from_u64(5);
        let mut ctx = EvaluationContext::new(&db, &mut vars, &mut rng);
        for _ in 0..20 {
            let n = ctx.random_int(6, 1);
            assert!((1..=6).contains(&n));
        }
        assert_eq!(ctx.random_int(3, 3), 3);
        assert_eq!(ctx.random_float(2.0, 2.0), 2.0);
        assert_eq!(
            ctx.random_value(&ExpressoValue::Int(1), &ExpressoValue::from("x")),
            ExpressoValue::Undefined
        );
    }

    #[test]
    fn print_substitutes_arguments() {
        let text = EvaluationContext::print(
            "{0} has {1} coins, {0}!",
            &[ExpressoValue::from("Ann"), ExpressoValue::Int(3)],
        );
        assert_eq!(text, "Ann has 3 coins, Ann!");
        assert_eq!(EvaluationContext::print("{2} stays", &[]), "{2} stays");
    }

    #[test]
    fn empty_fragment_is_preregistered() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        assert!(scripts.has_condition(EMPTY_FRAGMENT_HASH));
        assert!(scripts.has_instruction(EMPTY_FRAGMENT_HASH));
        assert!(scripts.evaluate(EMPTY_FRAGMENT_HASH, &db, &mut vars, None));
        assert!(scripts.execute(EMPTY_FRAGMENT_HASH, &db, &mut vars, None));
    }

    #[test]
    fn missing_hash_is_false() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        assert!(!scripts.evaluate(12345, &db, &mut vars, None));
        assert!(!scripts.execute(12345, &db, &mut vars, None));
    }

    #[test]
    fn registered_condition_sees_variable_changes() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        let awake = GvName::new("GameState", "awake");
        scripts.add_condition(12345, move |ctx| {
            ctx.variables().get(&awake) == Some(ExpressoValue::Bool(true))
        });

        assert!(!scripts.evaluate(12345, &db, &mut vars, None));
        vars.set_bool_variable(&GvName::new("GameState", "awake"), true);
        assert!(scripts.evaluate(12345, &db, &mut vars, None));
    }

    #[test]
    fn register_source_compiles_once() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        let hash = scripts
            .register_source(ScriptKind::Instruction, "GameState.awake = true")
            .unwrap();
        let again = scripts
            .register_source(ScriptKind::Instruction, "GameState.awake = true")
            .unwrap();
        assert_eq!(hash, again);
        assert_eq!(scripts.instruction_count(), 2);
        assert_eq!(
            scripts.fragment(hash).map(ScriptFragment::text),
            Some("GameState.awake = true")
        );

        assert!(scripts.execute(hash, &db, &mut vars, None));
        assert_eq!(
            vars.get_bool_variable(&GvName::new("GameState", "awake")),
            Some(true)
        );

        assert_eq!(
            scripts.register_source(ScriptKind::Condition, "").unwrap(),
            EMPTY_FRAGMENT_HASH
        );
        assert!(scripts.register_source(ScriptKind::Condition, "(").is_err());
    }

    #[test]
    fn explicit_provider_overrides_default() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        scripts.add_condition(1, |ctx| ctx.call_method("answer", &[]) == ExpressoValue::Int(1));

        assert!(!scripts.evaluate(1, &db, &mut vars, None));

        scripts.set_default_user_methods_provider(Box::new(|name: &str, _: &[ExpressoValue]| {
            (name == "answer").then_some(ExpressoValue::Int(1))
        }));
        assert!(scripts.has_default_user_methods_provider());
        assert!(scripts.evaluate(1, &db, &mut vars, None));

        let mut explicit = |_: &str, _: &[ExpressoValue]| Some(ExpressoValue::Int(2));
        assert!(!scripts.evaluate(1, &db, &mut vars, Some(&mut explicit)));

        scripts.clear_default_user_methods_provider();
        assert!(!scripts.evaluate(1, &db, &mut vars, None));
    }

    #[test]
    fn current_object_binds_self() {
        let db = database();
        let mut vars = variables();
        let mut scripts = ExpressoScripts::new(Some(1));
        scripts.add_instruction(2, |ctx| {
            ctx.set_seen_counter(None, 3);
        });
        scripts.add_condition(3, |ctx| ctx.get_seen_counter(None) == 3);

        scripts.set_current_object(db.get_object_by_name("Chest", 0));
        assert!(scripts.execute(2, &db, &mut vars, None));
        assert!(scripts.evaluate(3, &db, &mut vars, None));
        assert_eq!(vars.seen_counter(ArticyId::from(0x2A)), 3);

        scripts.set_current_object(None);
        assert!(!scripts.evaluate(3, &db, &mut vars, None));
    }
}
