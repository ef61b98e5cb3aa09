//! Tree-walking evaluator for compiled predicates.
//!
//! Values follow JavaScript semantics closely enough for the predicates an
//! oracle writes: truthiness, `typeof`, loose and strict equality, `%` as
//! remainder, string concatenation with `+`. Arrays and objects compare
//! structurally under `===` since predicate inputs are plain JSON data.
//!
//! There are no loops, assignments or named functions, so evaluation always
//! terminates; a step budget additionally bounds work over very large inputs.

use serde_json::Value;

use super::parser::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::PredicateError;

/// Upper bound on evaluated nodes per predicate call.
pub const MAX_STEPS: usize = 1_000_000;

/// Upper bound on nested closure calls.
const MAX_CALL_DEPTH: usize = 32;

/// Whitelisted global namespaces and conversion functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Number,
    Math,
    Array,
    Object,
    String,
    Boolean,
}

/// Whitelisted global functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    NumberIsInteger,
    NumberIsFinite,
    NumberIsNaN,
    NumberIsSafeInteger,
    ArrayIsArray,
    ObjectKeys,
    GlobalIsNaN,
    MathAbs,
    MathFloor,
    MathCeil,
    MathRound,
    MathTrunc,
    MathSqrt,
    MathSign,
    MathMin,
    MathMax,
    MathPow,
}

/// Runtime value.
#[derive(Debug, Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<JsValue>),
    Object(Vec<(String, JsValue)>),
    Closure {
        param: String,
        body: Box<Expr>,
        scope: Vec<(String, JsValue)>,
    },
    Builtin(Builtin),
    Namespace(Namespace),
    Method {
        receiver: Box<JsValue>,
        name: String,
    },
}

impl From<&Value> for JsValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Bool(*b),
            Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => JsValue::Str(s.clone()),
            Value::Array(items) => JsValue::Array(items.iter().map(JsValue::from).collect()),
            Value::Object(map) => JsValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl JsValue {
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::Str(_) => "string",
            JsValue::Array(_) | JsValue::Object(_) => "object",
            JsValue::Namespace(Namespace::Math) => "object",
            JsValue::Closure { .. }
            | JsValue::Builtin(_)
            | JsValue::Namespace(_)
            | JsValue::Method { .. } => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            JsValue::Number(n) => *n,
            JsValue::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    match trimmed {
                        "Infinity" | "+Infinity" => f64::INFINITY,
                        "-Infinity" => f64::NEG_INFINITY,
                        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
                    }
                }
            }
            JsValue::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => format_number(*n),
            JsValue::Str(s) => s.clone(),
            JsValue::Array(items) => items
                .iter()
                .map(|v| match v {
                    JsValue::Undefined | JsValue::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            JsValue::Object(_) => "[object Object]".to_string(),
            _ => "function".to_string(),
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            JsValue::Undefined
                | JsValue::Null
                | JsValue::Bool(_)
                | JsValue::Number(_)
                | JsValue::Str(_)
        )
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// `===` semantics.
pub fn strict_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Bool(x), JsValue::Bool(y)) => x == y,
        (JsValue::Number(x), JsValue::Number(y)) => x == y,
        (JsValue::Str(x), JsValue::Str(y)) => x == y,
        (JsValue::Array(x), JsValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| strict_equals(l, r))
        }
        (JsValue::Object(x), JsValue::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| {
                    y.iter()
                        .find(|(k2, _)| k2 == k)
                        .is_some_and(|(_, v2)| strict_equals(v, v2))
                })
        }
        _ => false,
    }
}

/// `==` semantics.
pub fn loose_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => {
            false
        }
        (JsValue::Number(_), JsValue::Str(_)) | (JsValue::Str(_), JsValue::Number(_)) => {
            a.to_number() == b.to_number()
        }
        (JsValue::Bool(_), _) => loose_equals(&JsValue::Number(a.to_number()), b),
        (_, JsValue::Bool(_)) => loose_equals(a, &JsValue::Number(b.to_number())),
        (x, y) if x.is_primitive() != y.is_primitive() => {
            let (prim, other) = if x.is_primitive() { (x, y) } else { (y, x) };
            loose_equals(prim, &JsValue::Str(other.to_js_string()))
        }
        _ => strict_equals(a, b),
    }
}

/// SameValueZero, used by `includes`.
fn same_value_zero(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// Evaluator state for one predicate call.
pub struct Evaluator {
    scope: Vec<(String, JsValue)>,
    steps: usize,
    call_depth: usize,
}

impl Evaluator {
    pub fn new(param: &str, argument: JsValue) -> Self {
        Self {
            scope: vec![(param.to_string(), argument)],
            steps: 0,
            call_depth: 0,
        }
    }

    fn error(message: impl Into<String>) -> PredicateError {
        PredicateError::eval(message)
    }

    fn lookup(&self, name: &str) -> Result<JsValue, PredicateError> {
        if let Some((_, value)) = self.scope.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        let global = match name {
            "Number" => JsValue::Namespace(Namespace::Number),
            "Math" => JsValue::Namespace(Namespace::Math),
            "Array" => JsValue::Namespace(Namespace::Array),
            "Object" => JsValue::Namespace(Namespace::Object),
            "String" => JsValue::Namespace(Namespace::String),
            "Boolean" => JsValue::Namespace(Namespace::Boolean),
            "isNaN" => JsValue::Builtin(Builtin::GlobalIsNaN),
            "NaN" => JsValue::Number(f64::NAN),
            "Infinity" => JsValue::Number(f64::INFINITY),
            _ => return Err(Self::error(format!("{} is not defined", name))),
        };
        Ok(global)
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<JsValue, PredicateError> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Err(Self::error("evaluation step budget exceeded"));
        }

        match expr {
            Expr::Number(n) => Ok(JsValue::Number(*n)),
            Expr::Str(s) => Ok(JsValue::Str(s.clone())),
            Expr::Bool(b) => Ok(JsValue::Bool(*b)),
            Expr::Null => Ok(JsValue::Null),
            Expr::Undefined => Ok(JsValue::Undefined),
            Expr::Ident(name) => self.lookup(name),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JsValue::Array(values))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => JsValue::Bool(!value.truthy()),
                    UnaryOp::Neg => JsValue::Number(-value.to_number()),
                    UnaryOp::Plus => JsValue::Number(value.to_number()),
                    UnaryOp::Typeof => JsValue::Str(value.type_of().to_string()),
                })
            }
            Expr::Logical { op, left, right } => {
                let lhs = self.eval(left)?;
                match (op, lhs.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(right),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Member { object, property } => {
                let target = self.eval(object)?;
                self.member(target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let key = self.eval(index)?;
                self.index(target, key)
            }
            Expr::Call { callee, args } => {
                let function = self.eval(callee)?;
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(function, values)
            }
            Expr::Arrow { param, body } => Ok(JsValue::Closure {
                param: param.clone(),
                body: body.clone(),
                scope: self.scope.clone(),
            }),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: JsValue, rhs: JsValue) -> Result<JsValue, PredicateError> {
        let value = match op {
            BinaryOp::Add => {
                let stringy = |v: &JsValue| matches!(v, JsValue::Str(_) | JsValue::Array(_) | JsValue::Object(_));
                if stringy(&lhs) || stringy(&rhs) {
                    JsValue::Str(format!("{}{}", lhs.to_js_string(), rhs.to_js_string()))
                } else {
                    JsValue::Number(lhs.to_number() + rhs.to_number())
                }
            }
            BinaryOp::Sub => JsValue::Number(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => JsValue::Number(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => JsValue::Number(lhs.to_number() / rhs.to_number()),
            BinaryOp::Rem => JsValue::Number(lhs.to_number() % rhs.to_number()),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                JsValue::Bool(compare(op, &lhs, &rhs))
            }
            BinaryOp::StrictEq => JsValue::Bool(strict_equals(&lhs, &rhs)),
            BinaryOp::StrictNotEq => JsValue::Bool(!strict_equals(&lhs, &rhs)),
            BinaryOp::LooseEq => JsValue::Bool(loose_equals(&lhs, &rhs)),
            BinaryOp::LooseNotEq => JsValue::Bool(!loose_equals(&lhs, &rhs)),
            BinaryOp::In => {
                let key = lhs.to_js_string();
                match &rhs {
                    JsValue::Object(fields) => JsValue::Bool(fields.iter().any(|(k, _)| *k == key)),
                    JsValue::Array(items) => JsValue::Bool(
                        key == "length"
                            || key.parse::<usize>().is_ok_and(|idx| idx < items.len()),
                    ),
                    other => {
                        return Err(Self::error(format!(
                            "cannot use 'in' to search for '{}' in {}",
                            key,
                            other.type_of()
                        )))
                    }
                }
            }
        };
        Ok(value)
    }

    fn member(&self, target: JsValue, property: &str) -> Result<JsValue, PredicateError> {
        match &target {
            JsValue::Undefined | JsValue::Null => Err(Self::error(format!(
                "cannot read property '{}' of {}",
                property,
                target.to_js_string()
            ))),
            JsValue::Str(s) => Ok(match property {
                "length" => JsValue::Number(s.chars().count() as f64),
                "includes" | "startsWith" | "endsWith" | "trim" | "toLowerCase"
                | "toUpperCase" | "indexOf" | "charAt" => JsValue::Method {
                    receiver: Box::new(target.clone()),
                    name: property.to_string(),
                },
                _ => JsValue::Undefined,
            }),
            JsValue::Array(items) => Ok(match property {
                "length" => JsValue::Number(items.len() as f64),
                "includes" | "every" | "some" | "indexOf" => JsValue::Method {
                    receiver: Box::new(target.clone()),
                    name: property.to_string(),
                },
                _ => JsValue::Undefined,
            }),
            JsValue::Object(fields) => Ok(fields
                .iter()
                .find(|(k, _)| k == property)
                .map(|(_, v)| v.clone())
                .unwrap_or(JsValue::Undefined)),
            JsValue::Namespace(ns) => Ok(namespace_member(*ns, property)),
            _ => Ok(JsValue::Undefined),
        }
    }

    fn index(&self, target: JsValue, key: JsValue) -> Result<JsValue, PredicateError> {
        match (&target, &key) {
            (JsValue::Array(items), JsValue::Number(n)) => {
                if *n >= 0.0 && n.fract() == 0.0 {
                    Ok(items.get(*n as usize).cloned().unwrap_or(JsValue::Undefined))
                } else {
                    Ok(JsValue::Undefined)
                }
            }
            (JsValue::Str(s), JsValue::Number(n)) => {
                if *n >= 0.0 && n.fract() == 0.0 {
                    Ok(s.chars()
                        .nth(*n as usize)
                        .map(|c| JsValue::Str(c.to_string()))
                        .unwrap_or(JsValue::Undefined))
                } else {
                    Ok(JsValue::Undefined)
                }
            }
            _ => self.member(target.clone(), &key.to_js_string()),
        }
    }

    fn call(&mut self, function: JsValue, args: Vec<JsValue>) -> Result<JsValue, PredicateError> {
        let first = args.first().cloned().unwrap_or(JsValue::Undefined);
        match function {
            JsValue::Closure { param, body, scope } => {
                self.call_depth += 1;
                if self.call_depth > MAX_CALL_DEPTH {
                    return Err(Self::error("call depth exceeded"));
                }
                let saved = std::mem::replace(&mut self.scope, scope);
                self.scope.push((param, first));
                let result = self.eval(&body);
                self.scope = saved;
                self.call_depth -= 1;
                result
            }
            JsValue::Builtin(builtin) => Ok(apply_builtin(builtin, &args)),
            JsValue::Namespace(Namespace::Number) => Ok(JsValue::Number(first.to_number())),
            JsValue::Namespace(Namespace::String) => Ok(JsValue::Str(first.to_js_string())),
            JsValue::Namespace(Namespace::Boolean) => Ok(JsValue::Bool(first.truthy())),
            JsValue::Method { receiver, name } => self.call_method(*receiver, &name, args),
            other => Err(Self::error(format!("{} is not a function", other.type_of()))),
        }
    }

    fn call_method(
        &mut self,
        receiver: JsValue,
        name: &str,
        args: Vec<JsValue>,
    ) -> Result<JsValue, PredicateError> {
        let first = args.first().cloned().unwrap_or(JsValue::Undefined);
        match (receiver, name) {
            (JsValue::Str(s), "includes") => Ok(JsValue::Bool(s.contains(&first.to_js_string()))),
            (JsValue::Str(s), "startsWith") => {
                Ok(JsValue::Bool(s.starts_with(&first.to_js_string())))
            }
            (JsValue::Str(s), "endsWith") => Ok(JsValue::Bool(s.ends_with(&first.to_js_string()))),
            (JsValue::Str(s), "trim") => Ok(JsValue::Str(s.trim().to_string())),
            (JsValue::Str(s), "toLowerCase") => Ok(JsValue::Str(s.to_lowercase())),
            (JsValue::Str(s), "toUpperCase") => Ok(JsValue::Str(s.to_uppercase())),
            (JsValue::Str(s), "indexOf") => {
                let needle = first.to_js_string();
                Ok(JsValue::Number(match s.find(&needle) {
                    Some(byte_idx) => s[..byte_idx].chars().count() as f64,
                    None => -1.0,
                }))
            }
            (JsValue::Str(s), "charAt") => {
                let idx = first.to_number();
                let idx = if idx.is_nan() { 0.0 } else { idx.trunc() };
                Ok(JsValue::Str(if idx >= 0.0 {
                    s.chars()
                        .nth(idx as usize)
                        .map(|c| c.to_string())
                        .unwrap_or_default()
                } else {
                    String::new()
                }))
            }
            (JsValue::Array(items), "includes") => Ok(JsValue::Bool(
                items.iter().any(|item| same_value_zero(item, &first)),
            )),
            (JsValue::Array(items), "indexOf") => Ok(JsValue::Number(
                items
                    .iter()
                    .position(|item| strict_equals(item, &first))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            )),
            (JsValue::Array(items), "every") => {
                for item in items {
                    if !self.call(first.clone(), vec![item])?.truthy() {
                        return Ok(JsValue::Bool(false));
                    }
                }
                Ok(JsValue::Bool(true))
            }
            (JsValue::Array(items), "some") => {
                for item in items {
                    if self.call(first.clone(), vec![item])?.truthy() {
                        return Ok(JsValue::Bool(true));
                    }
                }
                Ok(JsValue::Bool(false))
            }
            (receiver, name) => Err(Self::error(format!(
                "{}.{} is not a function",
                receiver.type_of(),
                name
            ))),
        }
    }
}

fn namespace_member(ns: Namespace, property: &str) -> JsValue {
    let builtin = match (ns, property) {
        (Namespace::Number, "isInteger") => Builtin::NumberIsInteger,
        (Namespace::Number, "isFinite") => Builtin::NumberIsFinite,
        (Namespace::Number, "isNaN") => Builtin::NumberIsNaN,
        (Namespace::Number, "isSafeInteger") => Builtin::NumberIsSafeInteger,
        (Namespace::Number, "MAX_SAFE_INTEGER") => return JsValue::Number(9_007_199_254_740_991.0),
        (Namespace::Number, "MIN_SAFE_INTEGER") => {
            return JsValue::Number(-9_007_199_254_740_991.0)
        }
        (Namespace::Array, "isArray") => Builtin::ArrayIsArray,
        (Namespace::Object, "keys") => Builtin::ObjectKeys,
        (Namespace::Math, "abs") => Builtin::MathAbs,
        (Namespace::Math, "floor") => Builtin::MathFloor,
        (Namespace::Math, "ceil") => Builtin::MathCeil,
        (Namespace::Math, "round") => Builtin::MathRound,
        (Namespace::Math, "trunc") => Builtin::MathTrunc,
        (Namespace::Math, "sqrt") => Builtin::MathSqrt,
        (Namespace::Math, "sign") => Builtin::MathSign,
        (Namespace::Math, "min") => Builtin::MathMin,
        (Namespace::Math, "max") => Builtin::MathMax,
        (Namespace::Math, "pow") => Builtin::MathPow,
        (Namespace::Math, "PI") => return JsValue::Number(std::f64::consts::PI),
        (Namespace::Math, "E") => return JsValue::Number(std::f64::consts::E),
        _ => return JsValue::Undefined,
    };
    JsValue::Builtin(builtin)
}

fn is_integer(value: &JsValue) -> bool {
    matches!(value, JsValue::Number(n) if n.is_finite() && n.fract() == 0.0)
}

fn apply_builtin(builtin: Builtin, args: &[JsValue]) -> JsValue {
    let first = args.first().cloned().unwrap_or(JsValue::Undefined);
    let num = || first.to_number();

    match builtin {
        Builtin::NumberIsInteger => JsValue::Bool(is_integer(&first)),
        Builtin::NumberIsFinite => JsValue::Bool(matches!(first, JsValue::Number(n) if n.is_finite())),
        Builtin::NumberIsNaN => JsValue::Bool(matches!(first, JsValue::Number(n) if n.is_nan())),
        Builtin::NumberIsSafeInteger => JsValue::Bool(
            is_integer(&first) && num().abs() <= 9_007_199_254_740_991.0,
        ),
        Builtin::ArrayIsArray => JsValue::Bool(matches!(first, JsValue::Array(_))),
        Builtin::ObjectKeys => JsValue::Array(match &first {
            JsValue::Object(fields) => fields.iter().map(|(k, _)| JsValue::Str(k.clone())).collect(),
            JsValue::Array(items) => (0..items.len()).map(|i| JsValue::Str(i.to_string())).collect(),
            JsValue::Str(s) => (0..s.chars().count())
                .map(|i| JsValue::Str(i.to_string()))
                .collect(),
            _ => Vec::new(),
        }),
        Builtin::GlobalIsNaN => JsValue::Bool(num().is_nan()),
        Builtin::MathAbs => JsValue::Number(num().abs()),
        Builtin::MathFloor => JsValue::Number(num().floor()),
        Builtin::MathCeil => JsValue::Number(num().ceil()),
        Builtin::MathRound => JsValue::Number((num() + 0.5).floor()),
        Builtin::MathTrunc => JsValue::Number(num().trunc()),
        Builtin::MathSqrt => JsValue::Number(num().sqrt()),
        Builtin::MathSign => {
            let n = num();
            JsValue::Number(if n.is_nan() || n == 0.0 { n } else { n.signum() })
        }
        Builtin::MathMin => JsValue::Number(
            args.iter()
                .map(JsValue::to_number)
                .fold(f64::INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) }),
        ),
        Builtin::MathMax => JsValue::Number(
            args.iter()
                .map(JsValue::to_number)
                .fold(f64::NEG_INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) }),
        ),
        Builtin::MathPow => {
            let exponent = args.get(1).map(JsValue::to_number).unwrap_or(f64::NAN);
            JsValue::Number(num().powf(exponent))
        }
    }
}

fn compare(op: BinaryOp, lhs: &JsValue, rhs: &JsValue) -> bool {
    if let (JsValue::Str(a), JsValue::Str(b)) = (lhs, rhs) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (lhs.to_number(), rhs.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!JsValue::Number(0.0).truthy());
        assert!(!JsValue::Number(f64::NAN).truthy());
        assert!(!JsValue::Str(String::new()).truthy());
        assert!(JsValue::Array(vec![]).truthy());
        assert!(JsValue::Object(vec![]).truthy());
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals(&JsValue::Null, &JsValue::Undefined));
        assert!(loose_equals(
            &JsValue::Number(1.0),
            &JsValue::Str("1".into())
        ));
        assert!(loose_equals(&JsValue::Bool(true), &JsValue::Number(1.0)));
        assert!(!loose_equals(&JsValue::Null, &JsValue::Number(0.0)));
        assert!(!strict_equals(
            &JsValue::Number(1.0),
            &JsValue::Str("1".into())
        ));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(JsValue::Number(102.0).to_js_string(), "102");
        assert_eq!(JsValue::Number(1.5).to_js_string(), "1.5");
        assert_eq!(JsValue::Number(f64::NAN).to_js_string(), "NaN");
    }

    #[test]
    fn test_math_round_matches_half_up() {
        assert_eq!(
            apply_builtin(Builtin::MathRound, &[JsValue::Number(2.5)]).to_number(),
            3.0
        );
        assert_eq!(
            apply_builtin(Builtin::MathRound, &[JsValue::Number(-2.5)]).to_number(),
            -2.0
        );
    }
}
