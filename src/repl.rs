use crate::environment::{Env, Environment};
use crate::evaluator::Evaluator;
use crate::lexer::{tokenize, Lexer};
use crate::parser::Parser;
use crate::runner::Mode;
use std::io::{self, BufRead, Write};

const PROMPT: &str = ">> ";

const MONKEY_FACE: &str = r#"            __,__
   .--.  .-"     "-.  .--.
  / .. \/  .-. .-.  \/ .. \
 | |  '|  /   Y   \  |'  | |
 | \   \  \ 0 | 0 /  /   / |
  \ '- ,\.-"'' ''"-./, -' /
   ''-' /_   ^ ^   _\ '-''
       |  \._   _./  |
       \   \ '~' /   /
        '._ '-=-' _.'
           '~---~'
"#;

/// Interactive loop over stdin. One environment lives for the whole session
/// so `let` bindings carry over between lines.
pub fn start(mode: Mode) {
    let user = std::env::var("USER").unwrap_or_else(|_| "there".to_string());
    println!("Hello {}! This is the Monkey programming language!", user);
    println!("Feel free to type in commands");
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let env = Environment::new();
    let mut evaluator = Evaluator::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    loop {
        print!("{}", PROMPT);
        if let Err(error) = stdout.flush() {
            tracing::warn!(%error, "failed to flush prompt");
        }

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                if let Err(error) = run_line(line, &env, &mut evaluator, mode, &mut stdout) {
                    eprintln!("Error writing output: {}", error);
                    break;
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

/// Handles one line of input: prints parser errors, or the inspected result
/// of evaluating the line in `env`.
pub fn run_line<W: Write, O: Write>(
    source: &str,
    env: &Env,
    evaluator: &mut Evaluator<W>,
    mode: Mode,
    out: &mut O,
) -> io::Result<()> {
    if mode == Mode::Tokens {
        for token in tokenize(source) {
            writeln!(out, "{:?} {:?}", token.token_type, token.literal)?;
        }
        return Ok(());
    }

    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();

    if !parser.diagnostics().is_empty() {
        print_parser_errors(&parser.errors(), out)?;
        for error in parser.diagnostics() {
            error.report(source, None);
        }
        return Ok(());
    }

    if let Some(value) = evaluator.eval_program(&program, env) {
        writeln!(out, "{}", value.inspect())?;
    }
    Ok(())
}

fn print_parser_errors<O: Write>(errors: &[String], out: &mut O) -> io::Result<()> {
    write!(out, "{}", MONKEY_FACE)?;
    writeln!(out, "Woops! We ran into some monkey business here!")?;
    writeln!(out, " parser errors:")?;
    for error in errors {
        writeln!(out, "\t{}", error)?;
    }
    Ok(())
}
