use crate::ast::{BlockStatement, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::builtins::Builtin;
use crate::environment::{Env, Environment};
use crate::error::MonkeyError;
use crate::value::{Function, Value};
use indexmap::IndexMap;
use std::io::{self, Write};
use std::rc::Rc;

/// Evaluates a whole program against `env`, printing `puts` output to stdout.
pub fn eval(program: &Program, env: &Env) -> Option<Value> {
    Evaluator::new().eval_program(program, env)
}

/// Tree-walking evaluator.
///
/// Runtime failures are ordinary `Value::Error`s and early returns are
/// `Value::ReturnValue`s; every call site checks for both and stops, so no
/// separate error channel is needed. Statements that produce nothing (`let`)
/// evaluate to `None`.
pub struct Evaluator<W: Write = io::Stdout> {
    out: W,
    last_error: Option<MonkeyError>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Evaluator<W> {
    pub fn with_output(out: W) -> Self {
        Self {
            out,
            last_error: None,
        }
    }

    /// Sink that `puts` writes to.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Where the error returned by the last `eval_program` call was raised,
    /// if it returned one.
    pub fn last_error(&self) -> Option<&MonkeyError> {
        self.last_error.as_ref()
    }

    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Option<Value> {
        self.last_error = None;
        let mut result = None;

        for statement in &program.statements {
            result = self.eval_statement(statement, env);

            match result {
                Some(Value::ReturnValue(value)) => return Some(*value),
                Some(Value::Error(_)) => return result,
                _ => {}
            }
        }

        result
    }

    /// Unlike a program, a block leaves `ReturnValue` wrapped so it can keep
    /// unwinding to the enclosing call.
    fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Option<Value> {
        let mut result = None;

        for statement in &block.statements {
            result = self.eval_statement(statement, env);

            if result.as_ref().is_some_and(is_abrupt) {
                return result;
            }
        }

        result
    }

    fn eval_statement(&mut self, statement: &Stmt, env: &Env) -> Option<Value> {
        match statement {
            Stmt::Expression { expr, .. } => Some(self.eval_expression(expr, env)),
            Stmt::Let { name, value, .. } => {
                let value = self.eval_expression(value, env);
                if is_abrupt(&value) {
                    return Some(value);
                }
                env.borrow_mut().set(name.name.as_str(), value);
                None
            }
            Stmt::Return { value, .. } => {
                let value = self.eval_expression(value, env);
                if is_abrupt(&value) {
                    return Some(value);
                }
                Some(Value::ReturnValue(Box::new(value)))
            }
        }
    }

    pub fn eval_expression(&mut self, expr: &Expr, env: &Env) -> Value {
        let value = self.eval_expression_kind(expr, env);

        // The innermost failing expression is the first to see the error.
        if let Value::Error(message) = &value {
            if self.last_error.is_none() {
                self.last_error = Some(MonkeyError::runtime_error(expr.span(), message.clone()));
            }
        }

        value
    }

    fn eval_expression_kind(&mut self, expr: &Expr, env: &Env) -> Value {
        match expr {
            Expr::Integer { value, .. } => Value::Integer(*value),
            Expr::String { value, .. } => Value::String(value.clone()),
            Expr::Boolean { value, .. } => Value::Boolean(*value),
            Expr::Null { .. } => Value::Null,
            Expr::Identifier(ident) => {
                if let Some(value) = env.borrow().get(&ident.name) {
                    return value;
                }
                match Builtin::lookup(&ident.name) {
                    Some(builtin) => Value::Builtin(builtin),
                    None => Value::error(format!("identifier not found: {}", ident.name)),
                }
            }
            Expr::Prefix { operator, right, .. } => {
                let right = self.eval_expression(right, env);
                if is_abrupt(&right) {
                    return right;
                }
                eval_prefix_expression(*operator, right)
            }
            Expr::Infix {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval_expression(left, env);
                if is_abrupt(&left) {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if is_abrupt(&right) {
                    return right;
                }
                eval_infix_expression(*operator, left, right)
            }
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let condition = self.eval_expression(condition, env);
                if is_abrupt(&condition) {
                    return condition;
                }

                let branch = if condition.is_truthy() {
                    Some(consequence)
                } else {
                    alternative.as_ref()
                };

                branch
                    .and_then(|block| self.eval_block(block, env))
                    .unwrap_or(Value::Null)
            }
            Expr::Function(literal) => Value::Function(Rc::new(Function {
                literal: Rc::clone(literal),
                env: Rc::clone(env),
            })),
            Expr::Call {
                function,
                arguments,
                ..
            } => {
                let function = self.eval_expression(function, env);
                if is_abrupt(&function) {
                    return function;
                }
                match self.eval_expressions(arguments, env) {
                    Ok(args) => self.apply_function(function, args),
                    Err(signal) => signal,
                }
            }
            Expr::Array { elements, .. } => match self.eval_expressions(elements, env) {
                Ok(elements) => Value::Array(Rc::new(elements)),
                Err(signal) => signal,
            },
            Expr::Map { pairs, .. } => self.eval_map_literal(pairs, env),
            Expr::Index { left, index, .. } => {
                let left = self.eval_expression(left, env);
                if is_abrupt(&left) {
                    return left;
                }
                let index = self.eval_expression(index, env);
                if is_abrupt(&index) {
                    return index;
                }
                eval_index_expression(&left, &index)
            }
        }
    }

    /// Left to right; stops at the first error or return signal.
    fn eval_expressions(&mut self, exprs: &[Expr], env: &Env) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expression(expr, env);
            if is_abrupt(&value) {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    fn eval_map_literal(&mut self, pairs: &[(Expr, Expr)], env: &Env) -> Value {
        let mut map = IndexMap::with_capacity(pairs.len());

        for (key_expr, value_expr) in pairs {
            let key = self.eval_expression(key_expr, env);
            if is_abrupt(&key) {
                return key;
            }
            let key = match key.as_map_key() {
                Some(key) => key,
                None => return Value::error(format!("unusable as map key: {}", key.type_name())),
            };

            let value = self.eval_expression(value_expr, env);
            if is_abrupt(&value) {
                return value;
            }

            map.insert(key, value);
        }

        Value::Map(Rc::new(map))
    }

    fn apply_function(&mut self, function: Value, args: Vec<Value>) -> Value {
        match function {
            Value::Function(function) => {
                tracing::trace!(
                    parameters = function.literal.parameters.len(),
                    arguments = args.len(),
                    "calling function"
                );

                // Positional binding: surplus arguments are dropped and
                // missing ones leave the parameter unbound.
                let call_env = Environment::enclosed(&function.env);
                {
                    let mut frame = call_env.borrow_mut();
                    for (parameter, arg) in function.literal.parameters.iter().zip(args) {
                        frame.set(parameter.name.as_str(), arg);
                    }
                }

                match self.eval_block(&function.literal.body, &call_env) {
                    Some(Value::ReturnValue(value)) => *value,
                    Some(value) => value,
                    None => Value::Null,
                }
            }
            Value::Builtin(builtin) => {
                tracing::trace!(builtin = builtin.name(), arguments = args.len(), "calling builtin");
                builtin.apply(&args, &mut self.out)
            }
            other => Value::error(format!("not a function: {}", other.type_name())),
        }
    }
}

/// Errors and pending returns both stop evaluation at every call site.
fn is_abrupt(value: &Value) -> bool {
    matches!(value, Value::Error(_) | Value::ReturnValue(_))
}

fn eval_prefix_expression(operator: PrefixOp, right: Value) -> Value {
    match operator {
        PrefixOp::Bang => Value::Boolean(!right.is_truthy()),
        PrefixOp::Minus => match right {
            Value::Integer(n) => Value::Integer(n.wrapping_neg()),
            other => Value::error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_infix_expression(operator: InfixOp, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix_expression(operator, *l, *r),
        (Value::String(l), Value::String(r)) => match operator {
            InfixOp::Plus => Value::String(format!("{}{}", l, r)),
            InfixOp::Equal => Value::Boolean(l == r),
            InfixOp::NotEqual => Value::Boolean(l != r),
            _ => unknown_infix_operator(operator, &left, &right),
        },
        (Value::String(l), Value::Integer(count)) if operator == InfixOp::Multiply => {
            repeat_string(l, *count)
        }
        _ if left.type_name() != right.type_name() => match operator {
            InfixOp::Equal if !involves_string(&left, &right) => Value::Boolean(false),
            InfixOp::NotEqual if !involves_string(&left, &right) => Value::Boolean(true),
            _ => Value::error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
        _ => match operator {
            InfixOp::Equal => Value::Boolean(is_identical(&left, &right)),
            InfixOp::NotEqual => Value::Boolean(!is_identical(&left, &right)),
            _ => unknown_infix_operator(operator, &left, &right),
        },
    }
}

fn eval_integer_infix_expression(operator: InfixOp, left: i64, right: i64) -> Value {
    match operator {
        InfixOp::Plus => Value::Integer(left.wrapping_add(right)),
        InfixOp::Minus => Value::Integer(left.wrapping_sub(right)),
        InfixOp::Multiply => Value::Integer(left.wrapping_mul(right)),
        InfixOp::Divide => {
            if right == 0 {
                Value::error("division by zero")
            } else {
                Value::Integer(left.wrapping_div(right))
            }
        }
        InfixOp::LessThan => Value::Boolean(left < right),
        InfixOp::GreaterThan => Value::Boolean(left > right),
        InfixOp::Equal => Value::Boolean(left == right),
        InfixOp::NotEqual => Value::Boolean(left != right),
    }
}

fn unknown_infix_operator(operator: InfixOp, left: &Value, right: &Value) -> Value {
    Value::error(format!(
        "unknown operator: {} {} {}",
        left.type_name(),
        operator,
        right.type_name()
    ))
}

/// Strings only compare with strings; any other pairing is a type mismatch.
fn involves_string(left: &Value, right: &Value) -> bool {
    matches!(left, Value::String(_)) || matches!(right, Value::String(_))
}

/// Upper bound on the byte length of a repeated string.
const MAX_REPEAT_BYTES: usize = 1 << 28;

/// A negative count repeats zero times.
fn repeat_string(s: &str, count: i64) -> Value {
    let times = usize::try_from(count).unwrap_or(0);
    match s.len().checked_mul(times) {
        Some(len) if len <= MAX_REPEAT_BYTES => Value::String(s.repeat(times)),
        _ => Value::error(format!(
            "string repetition too large: {} bytes * {}",
            s.len(),
            count
        )),
    }
}

/// `==` for values other than integers and strings: booleans and null by
/// value, everything heap-backed by identity.
fn is_identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::Null, Value::Null) => true,
        (Value::Builtin(l), Value::Builtin(r)) => l == r,
        (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
        (Value::Array(l), Value::Array(r)) => Rc::ptr_eq(l, r),
        (Value::Map(l), Value::Map(r)) => Rc::ptr_eq(l, r),
        _ => false,
    }
}

fn eval_index_expression(left: &Value, index: &Value) -> Value {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::Map(pairs), _) => match index.as_map_key() {
            Some(key) => pairs.get(&key).cloned().unwrap_or(Value::Null),
            None => Value::error(format!("unusable as map key: {}", index.type_name())),
        },
        _ => Value::error(format!("index operator not supported: {}", left.type_name())),
    }
}
