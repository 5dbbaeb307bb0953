use crate::value::Value;
use std::io::Write;
use std::rc::Rc;

/// Native functions, consulted only after environment lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Len,
    First,
    Last,
    Rest,
    Push,
    Puts,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Len,
        Builtin::First,
        Builtin::Last,
        Builtin::Rest,
        Builtin::Push,
        Builtin::Puts,
    ];

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::First => "first",
            Builtin::Last => "last",
            Builtin::Rest => "rest",
            Builtin::Push => "push",
            Builtin::Puts => "puts",
        }
    }

    /// Runs the builtin. Misuse comes back as an `Error` value; `puts`
    /// writes to `out`.
    pub fn apply(self, args: &[Value], out: &mut dyn Write) -> Value {
        match self {
            Builtin::Len => {
                if let Some(error) = check_arity(args, 1) {
                    return error;
                }
                match &args[0] {
                    Value::String(s) => Value::Integer(s.chars().count() as i64),
                    Value::Array(elements) => Value::Integer(elements.len() as i64),
                    other => Value::error(format!(
                        "argument to `len` not supported, got {}",
                        other.type_name()
                    )),
                }
            }
            Builtin::First => match array_argument(self, args) {
                Ok(elements) => elements.first().cloned().unwrap_or(Value::Null),
                Err(error) => error,
            },
            Builtin::Last => match array_argument(self, args) {
                Ok(elements) => elements.last().cloned().unwrap_or(Value::Null),
                Err(error) => error,
            },
            Builtin::Rest => match array_argument(self, args) {
                Ok([_, rest @ ..]) => Value::Array(Rc::new(rest.to_vec())),
                Ok([]) => Value::Null,
                Err(error) => error,
            },
            Builtin::Push => {
                if let Some(error) = check_arity(args, 2) {
                    return error;
                }
                match &args[0] {
                    Value::Array(elements) => {
                        let mut pushed = Vec::with_capacity(elements.len() + 1);
                        pushed.extend(elements.iter().cloned());
                        pushed.push(args[1].clone());
                        Value::Array(Rc::new(pushed))
                    }
                    other => Value::error(format!(
                        "first argument to `push` must be ARRAY, got {}",
                        other.type_name()
                    )),
                }
            }
            Builtin::Puts => {
                for arg in args {
                    if let Err(error) = writeln!(out, "{}", arg) {
                        tracing::warn!(%error, "puts failed to write");
                        break;
                    }
                }
                Value::Null
            }
        }
    }
}

fn check_arity(args: &[Value], want: usize) -> Option<Value> {
    if args.len() == want {
        None
    } else {
        Some(Value::error(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        )))
    }
}

/// Shared validation for `first`, `last` and `rest`.
fn array_argument(builtin: Builtin, args: &[Value]) -> Result<&[Value], Value> {
    if let Some(error) = check_arity(args, 1) {
        return Err(error);
    }
    match &args[0] {
        Value::Array(elements) => Ok(elements.as_slice()),
        other => Err(Value::error(format!(
            "argument to `{}` must be ARRAY, got {}",
            builtin.name(),
            other.type_name()
        ))),
    }
}
