//! eval.rs - Side-effect free evaluation of snippets.
//!
//! Models the part of Python the bypass strategies produce: integer, string
//! and bytes arithmetic, containers, slicing, `%` and `str.format`
//! formatting, and the pure builtins. Anything with effects (imports,
//! `exec`, unknown names, attribute access on modules) evaluates to an
//! opaque value that remembers how it was reached, so two snippets that
//! reach the same thing by different spellings still compare equal.
//!
//! Names and attribute names are compared after identifier normalization,
//! the way the interpreter sees them.
//!
//! License: MIT OR Apache-2.0

use std::fmt;

use crate::catalog::homoglyph::normalize_identifier;
use crate::catalog::name::BUILTINS;
use crate::errors::EvalError;
use crate::syntax::literal::{bytes_repr, py_repr};
use crate::syntax::{
    parse_expression, parse_snippet, BinOperator, BoolOperator, CmpOperator, ConstantKind, NodeId, NodeKind,
    SyntaxTree, UnaryOperator,
};

/// Upper bound on the length of any string, bytes or list the evaluator builds.
const MAX_SEQUENCE: usize = 1 << 20;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    /// Insertion-ordered.
    Dict(Vec<(Value, Value)>),
    None,
    /// A pure builtin function, by name.
    Builtin(String),
    /// A method looked up on a value, not yet called.
    BoundMethod(Box<Value>, String),
    /// `vars(x)` or `x.__dict__` of an opaque object.
    ObjDict(String),
    /// An iterator; `next` takes from the front.
    Iter(Vec<Value>),
    /// Something with effects or identity, described by the path that reached it.
    Opaque(String),
}

fn fail<T>(message: impl Into<String>) -> Result<T, EvalError> {
    Err(EvalError(message.into()))
}

fn checked_len(len: usize) -> Result<(), EvalError> {
    if len > MAX_SEQUENCE {
        return fail("sequence too long");
    }
    Ok(())
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::None => "NoneType",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::BoundMethod(..) => "method",
            Value::ObjDict(_) => "mappingproxy",
            Value::Iter(_) => "iterator",
            Value::Opaque(_) => "object",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Tuple(v) | Value::List(v) | Value::Iter(v) => !v.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::None => false,
            _ => true,
        }
    }

    /// The value as an integer, with `bool` coerced the way Python does.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn expect_int(&self) -> Result<i64, EvalError> {
        self.as_int()
            .ok_or_else(|| EvalError(format!("expected int, got {}", self.type_name())))
    }

    fn expect_str(&self) -> Result<&str, EvalError> {
        match self {
            Value::Str(s) => Ok(s),
            other => fail(format!("expected str, got {}", other.type_name())),
        }
    }

    /// Elements when iterated.
    fn iterate(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Bytes(b) => Ok(b.iter().map(|&x| Value::Int(i64::from(x))).collect()),
            Value::Tuple(v) | Value::List(v) | Value::Iter(v) => Ok(v.clone()),
            Value::Dict(d) => Ok(d.iter().map(|(k, _)| k.clone()).collect()),
            other => fail(format!("'{}' object is not iterable", other.type_name())),
        }
    }

    /// `str(value)`.
    pub fn py_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.py_repr(),
        }
    }

    /// `repr(value)`.
    pub fn py_repr(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Str(s) => py_repr(s),
            Value::Bytes(b) => bytes_repr(b),
            Value::Tuple(v) if v.len() == 1 => format!("({},)", v[0].py_repr()),
            Value::Tuple(v) => format!("({})", join_reprs(v)),
            Value::List(v) => format!("[{}]", join_reprs(v)),
            Value::Dict(d) => {
                let parts: Vec<String> = d.iter().map(|(k, v)| format!("{}: {}", k.py_repr(), v.py_repr())).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::None => "None".into(),
            Value::Builtin(name) => format!("<built-in function {name}>"),
            Value::BoundMethod(obj, name) => format!("<method {name} of {}>", obj.type_name()),
            Value::ObjDict(path) => format!("vars({path})"),
            Value::Iter(_) => "<iterator>".into(),
            Value::Opaque(path) => path.clone(),
        }
    }
}

fn join_reprs(values: &[Value]) -> String {
    values.iter().map(Value::py_repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.py_repr())
    }
}

/// `==` with Python's numeric tower: `True == 1`.
pub fn py_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        return x == y;
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) | (Value::List(x), Value::List(y)) | (Value::Iter(x), Value::Iter(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| py_eq(p, q))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.iter().any(|(k2, v2)| py_eq(k, k2) && py_eq(v, v2)))
        }
        (Value::None, Value::None) => true,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::BoundMethod(o1, n1), Value::BoundMethod(o2, n2)) => n1 == n2 && py_eq(o1, o2),
        (Value::ObjDict(x), Value::ObjDict(y)) | (Value::Opaque(x), Value::Opaque(y)) => x == y,
        _ => false,
    }
}

/// Evaluates one expression.
pub fn evaluate(source: &str) -> Result<Value, EvalError> {
    let tree = parse_expression(source).map_err(|e| EvalError(e.to_string()))?;
    Evaluator { tree: &tree }.eval(tree.root())
}

/// Evaluates every statement of a snippet, in order.
pub fn evaluate_snippet(source: &str) -> Result<Vec<Value>, EvalError> {
    let tree = parse_snippet(source).map_err(|e| EvalError(e.to_string()))?;
    let eval = Evaluator { tree: &tree };
    match tree.kind(tree.root()) {
        NodeKind::Module { body, .. } => body.iter().map(|&id| eval.eval(id)).collect(),
        _ => Ok(vec![eval.eval(tree.root())?]),
    }
}

/// True if both snippets evaluate, statement by statement, to equal values.
pub fn equivalent(original: &str, candidate: &str) -> bool {
    match (evaluate_snippet(original), evaluate_snippet(candidate)) {
        (Ok(a), Ok(b)) => a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| py_eq(x, y)),
        _ => false,
    }
}

/// Integer value of an expression, if it has one.
pub fn eval_int(source: &str) -> Option<i64> {
    evaluate(source).ok().and_then(|v| v.as_int())
}

/// String value of an expression, if it has one.
pub fn eval_str(source: &str) -> Option<String> {
    match evaluate(source) {
        Ok(Value::Str(s)) => Some(s),
        _ => None,
    }
}

struct Evaluator<'t> {
    tree: &'t SyntaxTree,
}

impl Evaluator<'_> {
    fn eval(&self, id: NodeId) -> Result<Value, EvalError> {
        match self.tree.kind(id) {
            NodeKind::Module { body, .. } => {
                let mut last = Value::None;
                for &stmt in body {
                    last = self.eval(stmt)?;
                }
                Ok(last)
            }
            NodeKind::Int(v) => Ok(Value::Int(*v)),
            NodeKind::BigInt => fail("integers beyond 64 bits are not modelled"),
            NodeKind::Float => fail("floats are not modelled"),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Bytes(b) => Ok(Value::Bytes(b.clone())),
            NodeKind::Constant(ConstantKind::True) => Ok(Value::Bool(true)),
            NodeKind::Constant(ConstantKind::False) => Ok(Value::Bool(false)),
            NodeKind::Constant(ConstantKind::None) => Ok(Value::None),
            NodeKind::Constant(ConstantKind::Ellipsis) => Ok(Value::Opaque("Ellipsis".into())),
            NodeKind::Name(name) => Ok(lookup_name(&normalize_identifier(name))),
            NodeKind::Attribute { value, attr } => get_attr(self.eval(*value)?, &normalize_identifier(attr)),
            NodeKind::Call { func, args } => {
                let callee = self.eval(*func)?;
                let (positional, keywords) = self.arguments(args)?;
                call(callee, positional, keywords)
            }
            NodeKind::Keyword { .. } | NodeKind::Starred { .. } => fail("argument outside a call"),
            NodeKind::Subscript { value, slice } => {
                let target = self.eval(*value)?;
                if let NodeKind::Slice { lower, upper, step } = self.tree.kind(*slice) {
                    let bound = |b: &Option<NodeId>| -> Result<Option<i64>, EvalError> {
                        b.map(|id| self.eval(id)?.expect_int()).transpose()
                    };
                    slice_value(&target, bound(lower)?, bound(upper)?, bound(step)?)
                } else {
                    subscript(&target, &self.eval(*slice)?)
                }
            }
            NodeKind::Slice { .. } => fail("slice outside a subscript"),
            NodeKind::BinOp { left, op, right } => binop(*op, self.eval(*left)?, self.eval(*right)?),
            NodeKind::UnaryOp { op, operand } => unary(*op, self.eval(*operand)?),
            NodeKind::BoolOp { op, values } => {
                let mut last = Value::None;
                for &v in values {
                    last = self.eval(v)?;
                    let decided = match op {
                        BoolOperator::And => !last.truthy(),
                        BoolOperator::Or => last.truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
            NodeKind::Compare { left, ops, comparators } => {
                let mut lhs = self.eval(*left)?;
                for (op, &c) in ops.iter().zip(comparators) {
                    let rhs = self.eval(c)?;
                    if !compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            NodeKind::IfExp { test, body, orelse } => {
                if self.eval(*test)?.truthy() {
                    self.eval(*body)
                } else {
                    self.eval(*orelse)
                }
            }
            NodeKind::Tuple(elts) => Ok(Value::Tuple(self.elements(elts)?)),
            NodeKind::List(elts) => Ok(Value::List(self.elements(elts)?)),
            NodeKind::Set(_) => fail("sets are not modelled"),
            NodeKind::Dict(entries) => {
                let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    dict_insert(&mut out, self.eval(*k)?, self.eval(*v)?);
                }
                Ok(Value::Dict(out))
            }
        }
    }

    fn elements(&self, ids: &[NodeId]) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.tree.kind(id) {
                NodeKind::Starred { value, double: false } => out.extend(self.eval(*value)?.iterate()?),
                _ => out.push(self.eval(id)?),
            }
        }
        Ok(out)
    }

    fn arguments(&self, args: &[NodeId]) -> Result<(Vec<Value>, Vec<(String, Value)>), EvalError> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for &arg in args {
            match self.tree.kind(arg) {
                NodeKind::Keyword { arg: name, value } => {
                    keywords.push((normalize_identifier(name), self.eval(*value)?));
                }
                NodeKind::Starred { value, double: false } => positional.extend(self.eval(*value)?.iterate()?),
                NodeKind::Starred { value, double: true } => match self.eval(*value)? {
                    Value::Dict(entries) => {
                        for (k, v) in entries {
                            keywords.push((k.expect_str()?.to_string(), v));
                        }
                    }
                    other => return fail(format!("** over {}", other.type_name())),
                },
                _ => positional.push(self.eval(arg)?),
            }
        }
        Ok((positional, keywords))
    }
}

/// Builtins the evaluator computes. Other builtins are called opaquely.
const PURE_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bin", "bool", "bytes", "chr", "dict", "getattr", "hex", "int", "iter", "len", "list",
    "map", "max", "min", "next", "oct", "ord", "range", "repr", "reversed", "sorted", "str", "sum", "tuple", "vars",
];

fn lookup_name(name: &str) -> Value {
    if BUILTINS.contains(name) {
        Value::Builtin(name.to_string())
    } else {
        Value::Opaque(name.to_string())
    }
}

fn get_attr(target: Value, attr: &str) -> Result<Value, EvalError> {
    match target {
        Value::Opaque(path) if path == "__builtins__" && BUILTINS.contains(attr) => Ok(Value::Builtin(attr.into())),
        Value::Opaque(path) if attr == "__dict__" => Ok(Value::ObjDict(path)),
        Value::Opaque(path) => Ok(Value::Opaque(format!("{path}.{attr}"))),
        Value::Builtin(name) => Ok(Value::Opaque(format!("{name}.{attr}"))),
        Value::Int(_) | Value::Bool(_) if matches!(attr, "real" | "numerator") => {
            Ok(Value::Int(target.expect_int()?))
        }
        Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Tuple(_) | Value::Dict(_) | Value::Int(_) => {
            Ok(Value::BoundMethod(Box::new(target), attr.to_string()))
        }
        other => fail(format!("attribute {attr} of {}", other.type_name())),
    }
}

fn call(callee: Value, args: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Value, EvalError> {
    match callee {
        Value::Builtin(name) if PURE_BUILTINS.contains(&name.as_str()) => call_builtin(&name, args, keywords),
        Value::BoundMethod(target, method) => {
            if !keywords.is_empty() {
                return fail(format!("keyword arguments to {method}"));
            }
            call_method(*target, &method, args)
        }
        Value::Builtin(path) | Value::Opaque(path) => {
            let mut parts: Vec<String> = args.iter().map(Value::py_repr).collect();
            parts.extend(keywords.iter().map(|(k, v)| format!("{k}={}", v.py_repr())));
            Ok(Value::Opaque(format!("{path}({})", parts.join(", "))))
        }
        other => fail(format!("'{}' object is not callable", other.type_name())),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        return fail(format!("{name}() takes {min} to {max} arguments, got {}", args.len()));
    }
    Ok(())
}

fn call_builtin(name: &str, args: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Value, EvalError> {
    if name == "dict" {
        let mut out = match args.as_slice() {
            [] => Vec::new(),
            [Value::Dict(d)] => d.clone(),
            _ => return fail("dict() from positional arguments"),
        };
        for (k, v) in keywords {
            dict_insert(&mut out, Value::Str(k), v);
        }
        return Ok(Value::Dict(out));
    }
    if !keywords.is_empty() {
        return fail(format!("keyword arguments to {name}()"));
    }
    match name {
        "len" => {
            arity(name, &args, 1, 1)?;
            let n = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::Bytes(b) => b.len(),
                Value::Tuple(v) | Value::List(v) => v.len(),
                Value::Dict(d) => d.len(),
                other => return fail(format!("len() of {}", other.type_name())),
            };
            Ok(Value::Int(n as i64))
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(Value::py_str).unwrap_or_default()))
        }
        "repr" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Str(args[0].py_repr()))
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
        }
        "int" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Int(0)),
                Some(Value::Str(s)) => parse_int(s).map(Value::Int),
                Some(v) => v.expect_int().map(Value::Int),
            }
        }
        "abs" => {
            arity(name, &args, 1, 1)?;
            args[0]
                .expect_int()?
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| EvalError("integer overflow".into()))
        }
        "hex" | "oct" | "bin" => {
            arity(name, &args, 1, 1)?;
            let v = args[0].expect_int()?;
            let sign = if v < 0 { "-" } else { "" };
            let m = v.unsigned_abs();
            Ok(Value::Str(match name {
                "hex" => format!("{sign}0x{m:x}"),
                "oct" => format!("{sign}0o{m:o}"),
                _ => format!("{sign}0b{m:b}"),
            }))
        }
        "chr" => {
            arity(name, &args, 1, 1)?;
            let v = args[0].expect_int()?;
            u32::try_from(v)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| EvalError(format!("chr() arg {v} not in range")))
        }
        "ord" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(s) if s.chars().count() == 1 => Ok(Value::Int(s.chars().map(|c| i64::from(u32::from(c))).sum())),
                Value::Bytes(b) if b.len() == 1 => Ok(Value::Int(i64::from(b[0]))),
                _ => fail("ord() expected a character"),
            }
        }
        "bytes" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Bytes(Vec::new())),
                Some(Value::Bytes(b)) => Ok(Value::Bytes(b.clone())),
                Some(Value::Int(n)) => {
                    let n = usize::try_from(*n).map_err(|_| EvalError("negative count".into()))?;
                    checked_len(n)?;
                    Ok(Value::Bytes(vec![0; n]))
                }
                Some(Value::Str(_)) => fail("bytes() from str needs an encoding"),
                Some(other) => other
                    .iterate()?
                    .iter()
                    .map(|v| {
                        let b = v.expect_int()?;
                        u8::try_from(b).map_err(|_| EvalError("bytes must be in range(0, 256)".into()))
                    })
                    .collect::<Result<Vec<u8>, _>>()
                    .map(Value::Bytes),
            }
        }
        "list" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::List(args.first().map(Value::iterate).transpose()?.unwrap_or_default()))
        }
        "tuple" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Tuple(args.first().map(Value::iterate).transpose()?.unwrap_or_default()))
        }
        "iter" | "reversed" => {
            arity(name, &args, 1, 1)?;
            let mut items = args[0].iterate()?;
            if name == "reversed" {
                items.reverse();
            }
            Ok(Value::Iter(items))
        }
        "next" => {
            arity(name, &args, 1, 2)?;
            match &args[0] {
                Value::Iter(items) => match (items.first(), args.get(1)) {
                    (Some(first), _) => Ok(first.clone()),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => fail("StopIteration"),
                },
                other => fail(format!("'{}' object is not an iterator", other.type_name())),
            }
        }
        "all" | "any" => {
            arity(name, &args, 1, 1)?;
            let items = args[0].iterate()?;
            Ok(Value::Bool(if name == "all" {
                items.iter().all(Value::truthy)
            } else {
                items.iter().any(Value::truthy)
            }))
        }
        "max" | "min" | "sorted" => {
            let mut items = if args.len() == 1 { args[0].iterate()? } else { args };
            sort_values(&mut items)?;
            match name {
                "sorted" => Ok(Value::List(items)),
                "max" => items.pop().ok_or_else(|| EvalError("max() arg is an empty sequence".into())),
                _ => items
                    .into_iter()
                    .next()
                    .ok_or_else(|| EvalError("min() arg is an empty sequence".into())),
            }
        }
        "sum" => {
            arity(name, &args, 1, 2)?;
            let mut total = args.get(1).map(Value::expect_int).transpose()?.unwrap_or(0);
            for v in args[0].iterate()? {
                total = total
                    .checked_add(v.expect_int()?)
                    .ok_or_else(|| EvalError("integer overflow".into()))?;
            }
            Ok(Value::Int(total))
        }
        "range" => {
            arity(name, &args, 1, 3)?;
            let ints: Vec<i64> = args.iter().map(Value::expect_int).collect::<Result<_, _>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => unreachable!(),
            };
            if step == 0 {
                return fail("range() arg 3 must not be zero");
            }
            let mut out = Vec::new();
            let mut i = start;
            while (step > 0 && i < stop) || (step < 0 && i > stop) {
                out.push(Value::Int(i));
                checked_len(out.len())?;
                i += step;
            }
            Ok(Value::List(out))
        }
        "map" => {
            arity(name, &args, 2, 2)?;
            let mut args = args.into_iter();
            let (Some(func), Some(source)) = (args.next(), args.next()) else {
                return fail("map() needs a function and an iterable");
            };
            let mapped = source
                .iterate()?
                .into_iter()
                .map(|v| call(func.clone(), vec![v], Vec::new()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Iter(mapped))
        }
        "getattr" => {
            arity(name, &args, 2, 2)?;
            let attr = normalize_identifier(args[1].expect_str()?);
            get_attr(args[0].clone(), &attr)
        }
        "vars" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Opaque(path) => Ok(Value::ObjDict(path.clone())),
                other => fail(format!("vars() of {}", other.type_name())),
            }
        }
        other => fail(format!("builtin {other}")),
    }
}

fn call_method(target: Value, method: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match (&target, method) {
        (Value::Str(s), "join") => {
            arity(method, &args, 1, 1)?;
            let parts = args[0]
                .iterate()?
                .iter()
                .map(|v| v.expect_str().map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            let joined = parts.join(s.as_str());
            checked_len(joined.len())?;
            Ok(Value::Str(joined))
        }
        (Value::Str(s), "format") => format_braces(s, &args).map(Value::Str),
        (Value::Str(s), "encode") => Ok(Value::Bytes(s.as_bytes().to_vec())),
        (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
        (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
        (Value::Str(s), "replace") => {
            arity(method, &args, 2, 2)?;
            Ok(Value::Str(s.replace(args[0].expect_str()?, args[1].expect_str()?)))
        }
        (Value::Bytes(b), "decode") => String::from_utf8(b.clone())
            .map(Value::Str)
            .map_err(|e| EvalError(format!("UnicodeDecodeError: {e}"))),
        (Value::Dict(d), "keys") => Ok(Value::List(d.iter().map(|(k, _)| k.clone()).collect())),
        (Value::Dict(d), "values") => Ok(Value::List(d.iter().map(|(_, v)| v.clone()).collect())),
        (Value::Dict(d), "get") => {
            arity(method, &args, 1, 2)?;
            Ok(d.iter()
                .find(|(k, _)| py_eq(k, &args[0]))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }
        _ => fail(format!("method {}.{method}", target.type_name())),
    }
}

fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| py_eq(k, &key)) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

fn sort_values(items: &mut [Value]) -> Result<(), EvalError> {
    if items.iter().all(|v| v.as_int().is_some()) {
        items.sort_by_key(|v| v.as_int().unwrap_or_default());
        Ok(())
    } else if items.iter().all(|v| matches!(v, Value::Str(_))) {
        items.sort_by(|a, b| a.py_str().cmp(&b.py_str()));
        Ok(())
    } else {
        fail("unorderable values")
    }
}

/// Numeric value of a decimal digit in any script `int()` accepts here.
fn decimal_value(c: char) -> Option<u32> {
    let cp = c as u32;
    match cp {
        0x30..=0x39 => Some(cp - 0x30),
        0x1D7CE..=0x1D7FF => Some((cp - 0x1D7CE) % 10),
        0xFF10..=0xFF19 => Some(cp - 0xFF10),
        0x0660..=0x0669 => Some(cp - 0x0660),
        0x06F0..=0x06F9 => Some(cp - 0x06F0),
        0x0966..=0x096F => Some(cp - 0x0966),
        _ => None,
    }
}

/// `int(s)` for a base-10 string.
fn parse_int(s: &str) -> Result<i64, EvalError> {
    let invalid = || EvalError(format!("invalid literal for int(): {}", py_repr(s)));
    let trimmed = s.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let mut value: i64 = 0;
    for c in digits.chars().filter(|&c| c != '_') {
        let d = decimal_value(c).ok_or_else(invalid)?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(d)))
            .ok_or_else(|| EvalError("integer overflow".into()))?;
    }
    Ok(if negative { -value } else { value })
}

fn normalize_index(index: i64, len: usize) -> Result<usize, EvalError> {
    let len = len as i64;
    let i = if index < 0 { index + len } else { index };
    if (0..len).contains(&i) {
        Ok(i as usize)
    } else {
        fail("index out of range")
    }
}

fn subscript(target: &Value, key: &Value) -> Result<Value, EvalError> {
    match target {
        Value::Dict(d) => d
            .iter()
            .find(|(k, _)| py_eq(k, key))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EvalError(format!("KeyError: {}", key.py_repr()))),
        Value::ObjDict(path) => get_attr(Value::Opaque(path.clone()), &normalize_identifier(key.expect_str()?)),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(chars[normalize_index(key.expect_int()?, chars.len())?].to_string()))
        }
        Value::Bytes(b) => Ok(Value::Int(i64::from(b[normalize_index(key.expect_int()?, b.len())?]))),
        Value::Tuple(v) | Value::List(v) => Ok(v[normalize_index(key.expect_int()?, v.len())?].clone()),
        Value::Opaque(path) => Ok(Value::Opaque(format!("{path}[{}]", key.py_repr()))),
        other => fail(format!("'{}' object is not subscriptable", other.type_name())),
    }
}

/// Indices selected by `[lower:upper:step]` over a sequence of `len`.
fn slice_indices(len: usize, lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> Result<Vec<usize>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return fail("slice step cannot be zero");
    }
    let len = len as i64;
    let clamp = |v: i64, low: i64, high: i64| v.max(low).min(high);
    let resolve = |v: i64, low: i64, high: i64| clamp(if v < 0 { v + len } else { v }, low, high);
    let mut out = Vec::new();
    if step > 0 {
        let start = lower.map_or(0, |v| resolve(v, 0, len));
        let stop = upper.map_or(len, |v| resolve(v, 0, len));
        let mut i = start;
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let start = lower.map_or(len - 1, |v| resolve(v, -1, len - 1));
        let stop = upper.map_or(-1, |v| resolve(v, -1, len - 1));
        let mut i = start;
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

fn slice_value(target: &Value, lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> Result<Value, EvalError> {
    match target {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), lower, upper, step)?;
            Ok(Value::Str(picked.into_iter().map(|i| chars[i]).collect()))
        }
        Value::Bytes(b) => {
            let picked = slice_indices(b.len(), lower, upper, step)?;
            Ok(Value::Bytes(picked.into_iter().map(|i| b[i]).collect()))
        }
        Value::List(v) => {
            let picked = slice_indices(v.len(), lower, upper, step)?;
            Ok(Value::List(picked.into_iter().map(|i| v[i].clone()).collect()))
        }
        Value::Tuple(v) => {
            let picked = slice_indices(v.len(), lower, upper, step)?;
            Ok(Value::Tuple(picked.into_iter().map(|i| v[i].clone()).collect()))
        }
        other => fail(format!("cannot slice {}", other.type_name())),
    }
}

fn overflow() -> EvalError {
    EvalError("integer overflow".into())
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Result<Vec<T>, EvalError> {
    let times = usize::try_from(times.max(0)).map_err(|_| overflow())?;
    checked_len(items.len().saturating_mul(times))?;
    let mut out = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn binop(op: BinOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        if let (Value::Bool(x), Value::Bool(y)) = (&left, &right) {
            match op {
                BinOperator::BitAnd => return Ok(Value::Bool(*x & *y)),
                BinOperator::BitOr => return Ok(Value::Bool(*x | *y)),
                BinOperator::BitXor => return Ok(Value::Bool(*x ^ *y)),
                _ => {}
            }
        }
        return int_binop(op, a, b).map(Value::Int);
    }
    match (op, &left, &right) {
        (BinOperator::Add, Value::Str(a), Value::Str(b)) => {
            checked_len(a.len() + b.len())?;
            Ok(Value::Str(format!("{a}{b}")))
        }
        (BinOperator::Add, Value::Bytes(a), Value::Bytes(b)) => Ok(Value::Bytes([a.as_slice(), b.as_slice()].concat())),
        (BinOperator::Add, Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b.as_slice()].concat())),
        (BinOperator::Add, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple([a.as_slice(), b.as_slice()].concat())),
        (BinOperator::Mult, Value::Str(s), n) | (BinOperator::Mult, n, Value::Str(s)) if n.as_int().is_some() => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(repeat(&chars, n.expect_int()?)?.into_iter().collect()))
        }
        (BinOperator::Mult, Value::Bytes(b), n) | (BinOperator::Mult, n, Value::Bytes(b)) if n.as_int().is_some() => {
            Ok(Value::Bytes(repeat(b, n.expect_int()?)?))
        }
        (BinOperator::Mult, Value::List(v), n) | (BinOperator::Mult, n, Value::List(v)) if n.as_int().is_some() => {
            Ok(Value::List(repeat(v, n.expect_int()?)?))
        }
        (BinOperator::Mult, Value::Tuple(v), n) | (BinOperator::Mult, n, Value::Tuple(v)) if n.as_int().is_some() => {
            Ok(Value::Tuple(repeat(v, n.expect_int()?)?))
        }
        (BinOperator::Mod, Value::Str(fmt), args) => percent_format(fmt, args).map(Value::Str),
        _ => fail(format!(
            "unsupported operand types for {}: {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )),
    }
}

fn int_binop(op: BinOperator, a: i64, b: i64) -> Result<i64, EvalError> {
    let result = match op {
        BinOperator::Add => a.checked_add(b),
        BinOperator::Sub => a.checked_sub(b),
        BinOperator::Mult => a.checked_mul(b),
        BinOperator::FloorDiv | BinOperator::Mod if b == 0 => return fail("integer division or modulo by zero"),
        BinOperator::FloorDiv => a.checked_div_euclid(b).map(|q| if b < 0 && a.rem_euclid(b) != 0 { q - 1 } else { q }),
        BinOperator::Mod => a.checked_rem(b).map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r }),
        BinOperator::Pow => {
            let exp = u32::try_from(b).map_err(|_| EvalError("negative or huge exponent".into()))?;
            a.checked_pow(exp)
        }
        BinOperator::LShift => {
            let shift = u32::try_from(b).map_err(|_| EvalError("negative shift count".into()))?;
            if shift >= 63 {
                None
            } else {
                a.checked_mul(1i64 << shift)
            }
        }
        BinOperator::RShift => {
            let shift = u32::try_from(b).map_err(|_| EvalError("negative shift count".into()))?;
            Some(a >> shift.min(63))
        }
        BinOperator::BitAnd => Some(a & b),
        BinOperator::BitOr => Some(a | b),
        BinOperator::BitXor => Some(a ^ b),
        BinOperator::Div | BinOperator::MatMult => return fail(format!("operator {} is not modelled", op.symbol())),
    };
    result.ok_or_else(overflow)
}

fn unary(op: UnaryOperator, operand: Value) -> Result<Value, EvalError> {
    if op == UnaryOperator::Not {
        return Ok(Value::Bool(!operand.truthy()));
    }
    let v = operand.expect_int()?;
    match op {
        UnaryOperator::Neg => v.checked_neg().map(Value::Int).ok_or_else(overflow),
        UnaryOperator::Pos => Ok(Value::Int(v)),
        UnaryOperator::Invert => Ok(Value::Int(!v)),
        UnaryOperator::Not => unreachable!(),
    }
}

fn compare(op: CmpOperator, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordered = |f: fn(std::cmp::Ordering) -> bool| -> Result<bool, EvalError> {
        match (left.as_int(), right.as_int(), left, right) {
            (Some(a), Some(b), _, _) => Ok(f(a.cmp(&b))),
            (_, _, Value::Str(a), Value::Str(b)) => Ok(f(a.cmp(b))),
            _ => fail("unorderable values"),
        }
    };
    match op {
        CmpOperator::Eq => Ok(py_eq(left, right)),
        CmpOperator::NotEq => Ok(!py_eq(left, right)),
        CmpOperator::Lt => ordered(|o| o.is_lt()),
        CmpOperator::LtE => ordered(|o| o.is_le()),
        CmpOperator::Gt => ordered(|o| o.is_gt()),
        CmpOperator::GtE => ordered(|o| o.is_ge()),
        CmpOperator::In | CmpOperator::NotIn => {
            let found = match (left, right) {
                (Value::Str(needle), Value::Str(hay)) => hay.contains(needle.as_str()),
                (_, container) => container.iterate()?.iter().any(|v| py_eq(v, left)),
            };
            Ok(found == (op == CmpOperator::In))
        }
        CmpOperator::Is | CmpOperator::IsNot => match (left, right) {
            (Value::None, _) | (_, Value::None) | (Value::Bool(_), Value::Bool(_)) => {
                let same = matches!((left, right), (Value::None, Value::None))
                    || matches!((left, right), (Value::Bool(a), Value::Bool(b)) if a == b);
                Ok(same == (op == CmpOperator::Is))
            }
            _ => fail("identity comparison is not modelled"),
        },
    }
}

/// `fmt % args` with the conversions strategies emit.
fn percent_format(fmt: &str, args: &Value) -> Result<String, EvalError> {
    let mut values: Vec<Value> = match args {
        Value::Tuple(v) => v.clone(),
        other => vec![other.clone()],
    }
    .into_iter()
    .rev()
    .collect();
    let mut out = String::new();
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let conversion = chars.next().ok_or_else(|| EvalError("incomplete format".into()))?;
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let arg = values
            .pop()
            .ok_or_else(|| EvalError("not enough arguments for format string".into()))?;
        match conversion {
            'c' => match &arg {
                Value::Str(s) if s.chars().count() == 1 => out.push_str(s),
                other => {
                    let code = other.expect_int()?;
                    let ch = u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| EvalError("%c arg not in range".into()))?;
                    out.push(ch);
                }
            },
            's' => out.push_str(&arg.py_str()),
            'r' => out.push_str(&arg.py_repr()),
            'd' | 'i' => out.push_str(&arg.expect_int()?.to_string()),
            'x' => out.push_str(&format!("{:x}", arg.expect_int()?)),
            other => return fail(format!("unsupported format character '{other}'")),
        }
    }
    if !values.is_empty() {
        return fail("not all arguments converted during string formatting");
    }
    Ok(out)
}

/// `fmt.format(*args)` for `{}` and `{n}` fields.
fn format_braces(fmt: &str, args: &[Value]) -> Result<String, EvalError> {
    let mut out = String::new();
    let mut auto = 0usize;
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                for f in chars.by_ref() {
                    if f == '}' {
                        break;
                    }
                    field.push(f);
                }
                let index = if field.is_empty() {
                    auto += 1;
                    auto - 1
                } else {
                    field
                        .parse::<usize>()
                        .map_err(|_| EvalError(format!("unsupported format field {{{field}}}")))?
                };
                let arg = args
                    .get(index)
                    .ok_or_else(|| EvalError("format index out of range".into()))?;
                out.push_str(&arg.py_str());
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_spellings() {
        assert_eq!(eval_int("int('𝟤𝟢𝟤𝟦')"), Some(2024));
        assert_eq!(eval_int("int('-𝟣')"), Some(-1));
        assert_eq!(eval_int("-0x7e8"), Some(-2024));
        assert_eq!(eval_int("ord('ߨ')"), Some(2024));
        assert_eq!(eval_int("len(str(()))"), Some(2));
        assert_eq!(eval_int("-~True"), Some(2));
        assert_eq!(eval_int("True+True"), Some(2));
        assert_eq!(eval_int("-7//2"), Some(-4));
        assert_eq!(eval_int("-7%3"), Some(2));
    }

    #[test]
    fn string_spellings() {
        assert_eq!(eval_str("list(dict(macr0phag3=()))[0]").as_deref(), Some("macr0phag3"));
        assert_eq!(eval_str("'dlroWolleH'[::-1]").as_deref(), Some("HelloWorld"));
        assert_eq!(eval_str("'%c%c'%(104,105)").as_deref(), Some("hi"));
        assert_eq!(eval_str("bytes([109,97,99]).decode()").as_deref(), Some("mac"));
        assert_eq!(eval_str("str(bytes([97]))[2]").as_deref(), Some("a"));
        assert_eq!(eval_str("''.join(map(chr,[111,115]))").as_deref(), Some("os"));
        assert_eq!(eval_str("'{}{}'.format(chr(111),chr(115))").as_deref(), Some("os"));
        assert_eq!(eval_str("next(iter(dict(afor=())))[1:]").as_deref(), Some("for"));
    }

    #[test]
    fn effects_stay_opaque_but_comparable() {
        assert!(equivalent("__import__('os').system('id')", "_＿import_＿('os').system('id')"));
        assert!(equivalent("os.system", "getattr(os,'system')"));
        assert!(equivalent("os.system", "vars(os)['system']"));
        assert!(equivalent("os.system", "os.__dict__['system']"));
        assert!(equivalent("__import__", "__builtins__.__import__"));
        assert!(!equivalent("os.system", "os.popen"));
    }

    #[test]
    fn bool_ops_keep_truth_value() {
        assert!(equivalent(
            "'yes' if 1 and (2 or 3) or 2 and 3 else 'no'",
            "'yes' if 1&(2|3)|2&3 else 'no'"
        ));
        assert!(equivalent("1 and 0", "bool(1)*bool(0)"));
    }

    #[test]
    fn keyword_names_are_normalized() {
        assert!(equivalent("dict(abc=1)", "dict(𝒂bc=1)"));
    }

    #[test]
    fn unsupported_constructs_are_errors() {
        assert!(evaluate("1/2").is_err());
        assert!(evaluate("'a'*10**9").is_err());
        assert!(evaluate("chr(-1)").is_err());
        assert!(!equivalent("1/2", "1/2"));
    }
}
