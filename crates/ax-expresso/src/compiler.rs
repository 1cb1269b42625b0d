//! Turns parsed fragments into closures over an [`EvaluationContext`].

use std::collections::{BTreeMap, BTreeSet};

use ax_core::{ExpressoValue, ObjectRef, ScriptKind};
use ax_script::ast::{BinaryOp, Expr, Literal, Span, Spanned, Stmt, UnaryOp};

use crate::error::{ExpressoError, ExpressoResult};
use crate::scripts::{Condition, EvaluationContext, Instruction};
use crate::variables::{GlobalVariables, GvName};

type Ctx<'a> = EvaluationContext<'a>;
type Eval = Box<dyn Fn(&mut Ctx<'_>) -> ExpressoValue>;
type Effect = Box<dyn Fn(&mut Ctx<'_>)>;

/// Functions every fragment can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    GetObj,
    GetProp,
    SetProp,
    IncrementProp,
    DecrementProp,
    IsInRange,
    IsPropInRange,
    GetSeenCounter,
    SetSeenCounter,
    ResetAllSeenCounters,
    Fallback,
    Random,
    Print,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "getObj" => Builtin::GetObj,
            "getProp" => Builtin::GetProp,
            "setProp" => Builtin::SetProp,
            "incrementProp" => Builtin::IncrementProp,
            "decrementProp" => Builtin::DecrementProp,
            "isInRange" => Builtin::IsInRange,
            "isPropInRange" => Builtin::IsPropInRange,
            "getSeenCounter" => Builtin::GetSeenCounter,
            "setSeenCounter" => Builtin::SetSeenCounter,
            "resetAllSeenCounters" => Builtin::ResetAllSeenCounters,
            "fallback" => Builtin::Fallback,
            "random" => Builtin::Random,
            "print" => Builtin::Print,
            _ => return None,
        })
    }

    /// Accepted argument counts, inclusive.
    fn arity(self) -> (usize, usize) {
        match self {
            Builtin::GetObj => (1, 2),
            Builtin::GetProp => (2, 2),
            Builtin::SetProp => (3, 3),
            Builtin::IncrementProp | Builtin::DecrementProp => (2, 3),
            Builtin::IsInRange => (3, 3),
            Builtin::IsPropInRange => (4, 4),
            Builtin::GetSeenCounter | Builtin::Fallback => (0, 1),
            Builtin::SetSeenCounter => (0, 2),
            Builtin::ResetAllSeenCounters => (0, 0),
            Builtin::Random => (1, 2),
            Builtin::Print => (1, usize::MAX),
        }
    }

    fn apply(self, ctx: &mut EvaluationContext<'_>, args: &[ExpressoValue]) -> ExpressoValue {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let text = |i: usize| match args.get(i) {
            Some(ExpressoValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        match self {
            Builtin::GetObj => {
                let clone_id = args.get(1).map_or(0, ExpressoValue::to_i32);
                handle_of(ctx.get_obj(&text(0), clone_id).as_ref())
            }
            Builtin::GetProp => {
                let object = ctx.resolve_object(&arg(0));
                EvaluationContext::get_prop(object.as_ref(), &text(1))
            }
            Builtin::SetProp => {
                let object = ctx.resolve_object(&arg(0));
                EvaluationContext::set_prop(object.as_ref(), &text(1), &arg(2));
                ExpressoValue::Undefined
            }
            Builtin::IncrementProp | Builtin::DecrementProp => {
                let object = ctx.resolve_object(&arg(0));
                let delta = args.get(2).map_or(1.0, ExpressoValue::to_f64);
                if self == Builtin::IncrementProp {
                    EvaluationContext::increment_prop(object.as_ref(), &text(1), delta);
                } else {
                    EvaluationContext::decrement_prop(object.as_ref(), &text(1), delta);
                }
                ExpressoValue::Undefined
            }
            Builtin::IsInRange => ExpressoValue::Bool(match (arg(0), arg(1), arg(2)) {
                (
                    ExpressoValue::String(value),
                    ExpressoValue::String(lo),
                    ExpressoValue::String(hi),
                ) => EvaluationContext::is_in_string_range(&value, &lo, &hi),
                (value, lo, hi) => {
                    EvaluationContext::is_in_range(value.to_f64(), lo.to_f64(), hi.to_f64())
                }
            }),
            Builtin::IsPropInRange => {
                let object = ctx.resolve_object(&arg(0));
                ExpressoValue::Bool(EvaluationContext::is_prop_in_range(
                    object.as_ref(),
                    &text(1),
                    &arg(2),
                    &arg(3),
                ))
            }
            Builtin::GetSeenCounter => {
                let object = args.first().and_then(|v| ctx.resolve_object(v));
                ExpressoValue::Int(i64::from(ctx.get_seen_counter(object.as_ref())))
            }
            Builtin::SetSeenCounter => {
                let (object, value) = match args {
                    [] => (None, 1),
                    [value] => (None, value.to_i32()),
                    [object, value, ..] => (ctx.resolve_object(object), value.to_i32()),
                };
                ExpressoValue::Int(i64::from(ctx.set_seen_counter(object.as_ref(), value)))
            }
            Builtin::ResetAllSeenCounters => {
                ctx.reset_all_seen_counters();
                ExpressoValue::Undefined
            }
            Builtin::Fallback => {
                let object = args.first().and_then(|v| ctx.resolve_object(v));
                ExpressoValue::Bool(ctx.fallback(object.as_ref()))
            }
            Builtin::Random => match args {
                [max] => {
                    let min = match max {
                        ExpressoValue::Float(_) => ExpressoValue::Float(0.0),
                        _ => ExpressoValue::Int(0),
                    };
                    ctx.random_value(&min, max)
                }
                [min, max, ..] => ctx.random_value(min, max),
                [] => ExpressoValue::Undefined,
            },
            Builtin::Print => {
                let message = text(0);
                EvaluationContext::print(&message, args.get(1..).unwrap_or_default());
                ExpressoValue::Undefined
            }
        }
    }
}

fn handle_of(object: Option<&ObjectRef>) -> ExpressoValue {
    match object {
        Some(object) => ExpressoValue::from_object(Some(&*object.borrow())),
        None => ExpressoValue::from_object(None),
    }
}

fn literal_value(literal: &Literal) -> ExpressoValue {
    match literal {
        Literal::Bool(b) => ExpressoValue::Bool(*b),
        Literal::Int(i) => ExpressoValue::Int(*i),
        Literal::Float(f) => ExpressoValue::Float(*f),
        Literal::String(s) => ExpressoValue::String(s.clone()),
    }
}

/// Apply a non-short-circuiting binary operator.
fn apply_binary(op: BinaryOp, lhs: &ExpressoValue, rhs: &ExpressoValue) -> ExpressoValue {
    match op {
        BinaryOp::Or => lhs.or(rhs),
        BinaryOp::And => lhs.and(rhs),
        BinaryOp::Xor => lhs ^ rhs,
        BinaryOp::Eq => ExpressoValue::Bool(lhs == rhs),
        BinaryOp::Ne => ExpressoValue::Bool(lhs != rhs),
        BinaryOp::Lt => ExpressoValue::Bool(lhs < rhs),
        BinaryOp::Gt => ExpressoValue::Bool(lhs > rhs),
        BinaryOp::Le => ExpressoValue::Bool(lhs <= rhs),
        BinaryOp::Ge => ExpressoValue::Bool(lhs >= rhs),
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => lhs / rhs,
        BinaryOp::Rem => lhs % rhs,
    }
}

/// A condition's result as a boolean: ints and floats count when positive.
fn condition_or_true(value: &ExpressoValue) -> bool {
    match value {
        ExpressoValue::Bool(b) => *b,
        ExpressoValue::Int(i) => *i > 0,
        ExpressoValue::Float(f) => *f > 0.0,
        ExpressoValue::Undefined => false,
        ExpressoValue::String(s) => {
            tracing::error!(value = %s, "condition produced a string");
            false
        }
    }
}

/// Compiles fragment text into closures.
///
/// With a variable schema, references to undeclared global variables are
/// compile errors; without one they are looked up (and logged) at runtime.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    schema: Option<BTreeMap<String, BTreeSet<String>>>,
}

impl Compiler {
    /// A compiler that checks no variable names.
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler that checks variable names against `variables`.
    pub fn with_variables(variables: &GlobalVariables) -> Self {
        let mut schema: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for namespace in variables.namespace_names() {
            schema.entry(namespace.to_string()).or_default();
        }
        for name in variables.names() {
            schema
                .entry(name.namespace().to_string())
                .or_default()
                .insert(name.variable().to_string());
        }
        Self {
            schema: Some(schema),
        }
    }

    /// Compile a condition fragment. Empty text is always true.
    pub fn compile_condition(&self, source: &str) -> ExpressoResult<Condition> {
        let parsed = ax_script::parse_condition(source)?;
        let eval = self.expr(&parsed)?;
        Ok(Box::new(move |ctx: &mut Ctx<'_>| condition_or_true(&eval(ctx))))
    }

    /// Compile an instruction fragment. Empty text does nothing.
    pub fn compile_instruction(&self, source: &str) -> ExpressoResult<Instruction> {
        let statements = ax_script::parse_instruction(source)?;
        let effects = statements
            .iter()
            .map(|s| self.stmt(s))
            .collect::<ExpressoResult<Vec<Effect>>>()?;
        Ok(Box::new(move |ctx: &mut Ctx<'_>| {
            for effect in &effects {
                effect(ctx);
            }
        }))
    }

    /// Compile and discard, reporting the first error.
    pub fn check(&self, kind: ScriptKind, source: &str) -> ExpressoResult<()> {
        match kind {
            ScriptKind::Condition => self.compile_condition(source).map(|_| ()),
            ScriptKind::Instruction => self.compile_instruction(source).map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    fn variable(&self, path: &[String], span: &Span) -> ExpressoResult<GvName> {
        let [namespace, variable] = path else {
            return Err(ExpressoError::compile(
                span.clone(),
                format!("\"{}\" is not a Namespace.Variable name", path.join(".")),
            ));
        };
        if let Some(schema) = &self.schema {
            match schema.get(namespace) {
                None => {
                    return Err(ExpressoError::compile(
                        span.clone(),
                        format!("unknown namespace \"{namespace}\""),
                    ));
                }
                Some(vars) if !vars.contains(variable) => {
                    return Err(ExpressoError::compile(
                        span.clone(),
                        format!("unknown variable \"{namespace}.{variable}\""),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(GvName::new(namespace, variable))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&self, expr: &Spanned<Expr>) -> ExpressoResult<Eval> {
        match &expr.node {
            Expr::Literal(literal) => {
                let value = literal_value(literal);
                Ok(Box::new(move |_: &mut Ctx<'_>| value.clone()))
            }
            Expr::Path(path) => self.path(path, &expr.span),
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand)?;
                Ok(match op {
                    UnaryOp::Not => Box::new(move |ctx: &mut Ctx<'_>| !operand(ctx)),
                    UnaryOp::Neg => Box::new(move |ctx: &mut Ctx<'_>| -operand(ctx)),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                Ok(match op {
                    BinaryOp::And => Box::new(move |ctx: &mut Ctx<'_>| match lhs(ctx) {
                        ExpressoValue::Bool(false) => ExpressoValue::Bool(false),
                        left => left.and(&rhs(ctx)),
                    }),
                    BinaryOp::Or => Box::new(move |ctx: &mut Ctx<'_>| match lhs(ctx) {
                        ExpressoValue::Bool(true) => ExpressoValue::Bool(true),
                        left => left.or(&rhs(ctx)),
                    }),
                    _ => Box::new(move |ctx: &mut Ctx<'_>| {
                        let left = lhs(ctx);
                        let right = rhs(ctx);
                        apply_binary(op, &left, &right)
                    }),
                })
            }
            Expr::Call { name, args } => self.call(name, args, &expr.span),
        }
    }

    fn path(&self, path: &[String], span: &Span) -> ExpressoResult<Eval> {
        if let [name] = path {
            return match name.as_str() {
                "self" => Ok(Box::new(|ctx: &mut Ctx<'_>| handle_of(ctx.self_object()))),
                "speaker" => Ok(Box::new(|ctx: &mut Ctx<'_>| handle_of(ctx.speaker()))),
                "seen" => Ok(Box::new(|ctx: &mut Ctx<'_>| {
                    ExpressoValue::Bool(ctx.get_seen_counter(None) > 0)
                })),
                "unseen" => Ok(Box::new(|ctx: &mut Ctx<'_>| {
                    ExpressoValue::Bool(ctx.get_seen_counter(None) == 0)
                })),
                other => Err(ExpressoError::compile(
                    span.clone(),
                    format!("unknown name \"{other}\""),
                )),
            };
        }
        let name = self.variable(path, span)?;
        Ok(Box::new(move |ctx: &mut Ctx<'_>| ctx.variables().get(&name).unwrap_or_default()))
    }

    fn call(&self, name: &str, args: &[Spanned<Expr>], span: &Span) -> ExpressoResult<Eval> {
        let compiled = args
            .iter()
            .map(|a| self.expr(a))
            .collect::<ExpressoResult<Vec<Eval>>>()?;

        match Builtin::lookup(name) {
            Some(builtin) => {
                let (min, max) = builtin.arity();
                if args.len() < min || args.len() > max {
                    let expected = if min == max {
                        min.to_string()
                    } else if max == usize::MAX {
                        format!("at least {min}")
                    } else {
                        format!("{min} to {max}")
                    };
                    return Err(ExpressoError::compile(
                        span.clone(),
                        format!("{name} expects {expected} arguments, found {}", args.len()),
                    ));
                }
                Ok(Box::new(move |ctx: &mut Ctx<'_>| {
                    let values: Vec<ExpressoValue> = compiled.iter().map(|a| a(ctx)).collect();
                    builtin.apply(ctx, &values)
                }))
            }
            None => {
                let name = name.to_string();
                Ok(Box::new(move |ctx: &mut Ctx<'_>| {
                    let values: Vec<ExpressoValue> = compiled.iter().map(|a| a(ctx)).collect();
                    ctx.call_method(&name, &values)
                }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn stmt(&self, stmt: &Spanned<Stmt>) -> ExpressoResult<Effect> {
        match &stmt.node {
            Stmt::Expr(expr) => {
                let eval = self.expr(expr)?;
                Ok(Box::new(move |ctx: &mut Ctx<'_>| {
                    eval(ctx);
                }))
            }
            Stmt::Assign { target, op, value } => {
                let name = self.variable(&target.node, &target.span)?;
                let value = self.expr(value)?;
                Ok(match op.binary_op() {
                    None => Box::new(move |ctx: &mut Ctx<'_>| {
                        let v = value(ctx);
                        ctx.variables_mut().set(&name, &v);
                    }),
                    Some(op) => Box::new(move |ctx: &mut Ctx<'_>| {
                        let rhs = value(ctx);
                        let lhs = ctx.variables().get(&name).unwrap_or_default();
                        let v = apply_binary(op, &lhs, &rhs);
                        ctx.variables_mut().set(&name, &v);
                    }),
                })
            }
            Stmt::Step { target, delta } => {
                let name = self.variable(&target.node, &target.span)?;
                let delta = ExpressoValue::Int(*delta);
                Ok(Box::new(move |ctx: &mut Ctx<'_>| {
                    let current = ctx.variables().get(&name).unwrap_or_default();
                    let v = &current + &delta;
                    ctx.variables_mut().set(&name, &v);
                }))
            }
        }
    }
}
