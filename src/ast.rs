use crate::error::Span;
use std::fmt;
use std::rc::Rc;

/// Syntax tree produced by the parser. Every node keeps the span of the
/// token it was built from; `Display` gives the canonical re-serialization.

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: Identifier,
        value: Expr,
        span: Span,
    },
    Return {
        value: Expr,
        span: Span,
    },
    Expression {
        expr: Expr,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::Expression { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Shared with every function value created from it, so closures point at
/// the tree instead of copying the body.
#[derive(Debug)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier(Identifier),
    Integer {
        value: i64,
        span: Span,
    },
    String {
        value: String,
        span: Span,
    },
    Boolean {
        value: bool,
        span: Span,
    },
    Null {
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    Map {
        pairs: Vec<(Expr, Expr)>,
        span: Span,
    },
    Prefix {
        operator: PrefixOp,
        right: Box<Expr>,
        span: Span,
    },
    Infix {
        left: Box<Expr>,
        operator: InfixOp,
        right: Box<Expr>,
        span: Span,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },
    Function(Rc<FunctionLiteral>),
    If {
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(ident) => ident.span,
            Expr::Integer { span, .. } => *span,
            Expr::String { span, .. } => *span,
            Expr::Boolean { span, .. } => *span,
            Expr::Null { span } => *span,
            Expr::Array { span, .. } => *span,
            Expr::Map { span, .. } => *span,
            Expr::Prefix { span, .. } => *span,
            Expr::Infix { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::Function(literal) => literal.span,
            Expr::If { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    LessThan,
    GreaterThan,
    Equal,
    NotEqual,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOp::Bang => write!(f, "!"),
            PrefixOp::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::LessThan => "<",
            InfixOp::GreaterThan => ">",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
        };
        write!(f, "{}", symbol)
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Let { name, value, .. } => write!(f, "let {} = {};", name, value),
            Stmt::Return { value, .. } => write!(f, "return {};", value),
            Stmt::Expression { expr, .. } => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fn(")?;
        write_joined(f, &self.parameters)?;
        write!(f, ") {}", self.body)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Identifier(ident) => write!(f, "{}", ident),
            Expr::Integer { value, .. } => write!(f, "{}", value),
            Expr::String { value, .. } => write!(f, "{}", value),
            Expr::Boolean { value, .. } => write!(f, "{}", value),
            Expr::Null { .. } => write!(f, "null"),
            Expr::Array { elements, .. } => {
                write!(f, "[")?;
                write_joined(f, elements)?;
                write!(f, "]")
            }
            Expr::Map { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Expr::Prefix { operator, right, .. } => write!(f, "({}{})", operator, right),
            Expr::Infix {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expr::Index { left, index, .. } => write!(f, "({}[{}])", left, index),
            Expr::Call {
                function,
                arguments,
                ..
            } => {
                write!(f, "{}(", function)?;
                write_joined(f, arguments)?;
                write!(f, ")")
            }
            Expr::Function(literal) => write!(f, "{}", literal),
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
        }
    }
}
