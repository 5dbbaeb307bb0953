use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::lexer::{tokenize, Lexer};
use crate::parser::Parser;
use crate::value::Value;

/// What to do with each piece of source handed to the runner or REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Parse and evaluate.
    #[default]
    Evaluate,
    /// Print the token stream only.
    Tokens,
}

/// Runs a whole script. Returns `false` if it failed to parse or ended in a
/// runtime error, after reporting every diagnostic.
pub fn run(source: &str, filename: Option<&str>, mode: Mode) -> bool {
    if mode == Mode::Tokens {
        for token in tokenize(source) {
            println!("{:?} {:?}", token.token_type, token.literal);
        }
        return true;
    }

    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();

    if !parser.diagnostics().is_empty() {
        for error in parser.diagnostics() {
            error.report(source, filename);
        }
        return false;
    }

    let env = Environment::new();
    let mut evaluator = Evaluator::new();
    match evaluator.eval_program(&program, &env) {
        Some(Value::Error(message)) => {
            match evaluator.last_error() {
                Some(error) => error.report(source, filename),
                None => eprintln!("ERROR: {}", message),
            }
            false
        }
        _ => true,
    }
}
