use crate::ast::FunctionLiteral;
use crate::builtins::Builtin;
use crate::environment::Env;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Runtime values. `ReturnValue` and `Error` only carry control flow through
/// the evaluator; user code never holds one.
///
/// Arrays, maps and functions sit behind `Rc` so copies are cheap and `==`
/// in the language can compare them by identity.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
    ReturnValue(Box<Value>),
    Error(String),
    Function(Rc<Function>),
    Builtin(Builtin),
    Array(Rc<Vec<Value>>),
    Map(Rc<IndexMap<MapKey, Value>>),
}

/// A closure: the literal it came from plus the environment it was defined in.
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub env: Env,
}

// The captured environment usually contains the function itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Function")
            .field("literal", &self.literal.to_string())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Integer(i64),
    String(String),
    Boolean(bool),
}

impl Value {
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// `false`, `null`, `0` and `""` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::String(_) => "STRING",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::ReturnValue(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Array(_) => "ARRAY",
            Value::Map(_) => "MAP",
        }
    }

    /// Only integers, strings and booleans can key a map.
    pub fn as_map_key(&self) -> Option<MapKey> {
        match self {
            Value::Integer(n) => Some(MapKey::Integer(*n)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            Value::Boolean(b) => Some(MapKey::Boolean(*b)),
            _ => None,
        }
    }

    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

/// Structural equality, used by tests and host code. The language's own
/// `==` lives in the evaluator and compares arrays, maps and functions by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Null, Value::Null) => true,
            (Value::ReturnValue(l), Value::ReturnValue(r)) => l == r,
            (Value::Error(l), Value::Error(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Builtin(l), Value::Builtin(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => l == r,
            (Value::Map(l), Value::Map(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MapKey::Integer(n) => write!(f, "{}", n),
            MapKey::String(s) => write!(f, "{}", s),
            MapKey::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::ReturnValue(value) => write!(f, "{}", value),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Function(function) => {
                let literal = &function.literal;
                write!(f, "fn(")?;
                for (i, parameter) in literal.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ") {{\n{}\n}}", literal.body)
            }
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
