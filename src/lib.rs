// Monkey Language Interpreter Library
//
// Lexer, Pratt parser and tree-walking evaluator for the Monkey scripting
// language, plus the REPL and file runner built on top of them.

// Public modules
pub mod ast;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use builtins::Builtin;
pub use environment::{Env, Environment};
pub use error::{MonkeyError, Span};
pub use evaluator::{eval, Evaluator};
pub use lexer::{tokenize, Lexer, Token, TokenType};
pub use parser::Parser;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Does nothing when
/// the variable is unset, so normal runs print only program output.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env();
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .try_init();
    }
}
