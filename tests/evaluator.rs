use monkey::environment::Environment;
use monkey::evaluator::Evaluator;
use monkey::lexer::Lexer;
use monkey::parser::Parser;
use monkey::value::{MapKey, Value};
use monkey::Program;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn parse(source: &str) -> Program {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    assert!(
        parser.errors().is_empty(),
        "parser errors for {:?}: {:?}",
        source,
        parser.errors()
    );
    program
}

fn run(source: &str) -> Option<Value> {
    let program = parse(source);
    let env = Environment::new();
    Evaluator::with_output(Vec::new()).eval_program(&program, &env)
}

fn eval(source: &str) -> Value {
    run(source).unwrap_or_else(|| panic!("{:?} produced no value", source))
}

fn array(values: &[i64]) -> Value {
    Value::Array(Rc::new(values.iter().map(|n| Value::Integer(*n)).collect()))
}

#[test]
fn integer_expressions() {
    let cases = [
        ("5", 5),
        ("10", 10),
        ("-5", -5),
        ("-10", -10),
        ("5 + 5 + 5 + 5 - 10", 10),
        ("2 * 2 * 2 * 2 * 2", 32),
        ("-50 + 100 + -50", 0),
        ("5 * 2 + 10", 20),
        ("5 + 2 * 10", 25),
        ("20 + 2 * -10", 0),
        ("50 / 2 * 2 + 10", 60),
        ("2 * (5 + 10)", 30),
        ("3 * 3 * 3 + 10", 37),
        ("3 * (3 * 3) + 10", 37),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("7 / 2", 3),
        ("-7 / 2", -3),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Integer(expected), "source: {}", source);
    }
}

#[test]
fn arithmetic_wraps_on_overflow() {
    assert_eq!(
        eval("9223372036854775807 + 1"),
        Value::Integer(i64::MIN)
    );
}

#[test]
fn string_expressions() {
    let cases = [
        ("\"Hello World!\"", Value::String("Hello World!".into())),
        ("\"Hello\" + \" \" + \"World!\"", Value::String("Hello World!".into())),
        ("\"ab\" * 3", Value::String("ababab".into())),
        ("\"ab\" * 0", Value::String(String::new())),
        ("\"a\" == \"a\"", Value::Boolean(true)),
        ("\"a\" != \"a\"", Value::Boolean(false)),
        ("\"a\" == \"b\"", Value::Boolean(false)),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), expected, "source: {}", source);
    }
}

#[test]
fn boolean_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 > 1", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 == 2", false),
        ("1 != 2", true),
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("(1 < 2) == true", true),
        ("(1 < 2) == false", false),
        ("(1 > 2) == true", false),
        ("(1 > 2) == false", true),
        ("null == null", true),
        ("null != null", false),
        ("1 == true", false),
        ("null != false", true),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Boolean(expected), "source: {}", source);
    }
}

#[test]
fn bang_operator_follows_truthiness() {
    let cases = [
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!false", false),
        ("!!5", true),
        ("!0", true),
        ("!!0", false),
        ("!\"\"", true),
        ("!\"hello\"", false),
        ("!null", true),
        ("![]", false),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Boolean(expected), "source: {}", source);
    }
}

#[test]
fn if_else_expressions() {
    let cases = [
        ("if (true) { 10 }", Value::Integer(10)),
        ("if (false) { 10 }", Value::Null),
        ("if (1) { 10 }", Value::Integer(10)),
        ("if (0) { 10 }", Value::Null),
        ("if (\"\") { 10 } else { 20 }", Value::Integer(20)),
        ("if (1 < 2) { 10 }", Value::Integer(10)),
        ("if (1 > 2) { 10 }", Value::Null),
        ("if (1 > 2) { 10 } else { 20 }", Value::Integer(20)),
        ("if (1 < 2) { 10 } else { 20 }", Value::Integer(10)),
        ("if (true) { }", Value::Null),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), expected, "source: {}", source);
    }
}

#[test]
fn return_statements() {
    let cases = [
        ("return 10;", 10),
        ("return 10; 9;", 10),
        ("return 2 * 5; 9;", 10),
        ("9; return 2 * 5; 9;", 10),
        ("if (10 > 1) { if (10 > 1) { return 10; } return 1; }", 10),
        (
            "let f = fn(x) { return x; x + 10; }; f(10);",
            10,
        ),
        (
            "let f = fn(x) { let result = x + 10; return result; return 10; }; f(10);",
            20,
        ),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Integer(expected), "source: {}", source);
    }
}

#[test]
fn error_handling() {
    let cases = [
        ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
        ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
        ("5 + \"hello\"", "type mismatch: INTEGER + STRING"),
        ("\"hello\" - 5", "type mismatch: STRING - INTEGER"),
        ("5 == \"5\"", "type mismatch: INTEGER == STRING"),
        ("\"a\" == true", "type mismatch: STRING == BOOLEAN"),
        ("\"a\" != null", "type mismatch: STRING != NULL"),
        ("[1] == \"a\"", "type mismatch: ARRAY == STRING"),
        (
            "\"ab\" * 9223372036854775807",
            "string repetition too large: 2 bytes * 9223372036854775807",
        ),
        (
            "\"abcd\" * 100000000",
            "string repetition too large: 4 bytes * 100000000",
        ),
        ("-true", "unknown operator: -BOOLEAN"),
        ("-\"a\"", "unknown operator: -STRING"),
        ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
        ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
        ("if (10 > 1) { true + false; }", "unknown operator: BOOLEAN + BOOLEAN"),
        (
            "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        ),
        ("\"Hello\" - \"World\"", "unknown operator: STRING - STRING"),
        ("\"a\" < \"b\"", "unknown operator: STRING < STRING"),
        ("true < false", "unknown operator: BOOLEAN < BOOLEAN"),
        ("foobar", "identifier not found: foobar"),
        ("10 / 0", "division by zero"),
        ("{\"name\": \"Monkey\"}[fn(x) { x }];", "unusable as map key: FUNCTION"),
        ("{[1]: 2}", "unusable as map key: ARRAY"),
        ("1[0]", "index operator not supported: INTEGER"),
        ("[1, 2][missing]", "identifier not found: missing"),
        ("5(1)", "not a function: INTEGER"),
        ("let x = 1; x()", "not a function: INTEGER"),
        ("[1, foo, 3]", "identifier not found: foo"),
        ("len(1, bar)", "identifier not found: bar"),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::error(expected), "source: {}", source);
    }
}

#[test]
fn let_statements() {
    let cases = [
        ("let a = 5; a;", 5),
        ("let a = 5 * 5; a;", 25),
        ("let a = 5; let b = a; b;", 5),
        ("let a = 5; let b = a; let c = a + b + 5; c;", 15),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Integer(expected), "source: {}", source);
    }
}

#[test]
fn let_statement_produces_no_value() {
    assert_eq!(run("let a = 5;"), None);
    assert_eq!(run(""), None);
}

#[test]
fn function_object_inspects_as_source() {
    let value = eval("fn(x) { x + 2; };");
    match &value {
        Value::Function(function) => {
            assert_eq!(function.literal.parameters.len(), 1);
            assert_eq!(function.literal.parameters[0].name, "x");
            assert_eq!(function.literal.body.to_string(), "(x + 2)");
        }
        other => panic!("expected function, got {:?}", other),
    }
    assert_eq!(value.inspect(), "fn(x) {\n(x + 2)\n}");
}

#[test]
fn function_application() {
    let cases = [
        ("let identity = fn(x) { x; }; identity(5);", 5),
        ("let identity = fn(x) { return x; }; identity(5);", 5),
        ("let double = fn(x) { x * 2; }; double(5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5, 5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20),
        ("fn(x) { x; }(5)", 5),
        ("let first_of = fn(a) { a }; first_of(1, 2, 3)", 1),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Integer(expected), "source: {}", source);
    }
}

#[test]
fn empty_function_body_returns_null() {
    assert_eq!(eval("fn() { }()"), Value::Null);
}

#[test]
fn missing_arguments_leave_parameters_unbound() {
    assert_eq!(
        eval("let f = fn(a, b) { b }; f(1)"),
        Value::error("identifier not found: b")
    );
    // An unbound parameter resolves through the closure's environment.
    assert_eq!(eval("let b = 7; let f = fn(a, b) { b }; f(1)"), Value::Integer(7));
}

#[test]
fn closures() {
    let source = "
        let newAdder = fn(x) {
            fn(y) { x + y };
        };

        let addTwo = newAdder(2);
        addTwo(2);";
    assert_eq!(eval(source), Value::Integer(4));
}

#[test]
fn recursive_functions() {
    let source = "
        let fib = fn(n) {
            if (n < 2) { return n; }
            fib(n - 1) + fib(n - 2)
        };
        fib(15);";
    assert_eq!(eval(source), Value::Integer(610));
}

#[test]
fn function_scope_does_not_leak() {
    assert_eq!(
        eval("let f = fn() { let inner = 1; inner }; f(); inner"),
        Value::error("identifier not found: inner")
    );
    assert_eq!(eval("let x = 1; let f = fn(x) { x }; f(2); x"), Value::Integer(1));
}

#[test]
fn builtin_functions() {
    let cases = [
        ("len(\"\")", Value::Integer(0)),
        ("len(\"four\")", Value::Integer(4)),
        ("len(\"hello world\")", Value::Integer(11)),
        ("len(\"héllo\")", Value::Integer(5)),
        ("len([1, 2, 3])", Value::Integer(3)),
        ("len([])", Value::Integer(0)),
        (
            "len(1)",
            Value::error("argument to `len` not supported, got INTEGER"),
        ),
        (
            "len(\"one\", \"two\")",
            Value::error("wrong number of arguments. got=2, want=1"),
        ),
        ("first([1, 2, 3])", Value::Integer(1)),
        ("first([])", Value::Null),
        (
            "first(1)",
            Value::error("argument to `first` must be ARRAY, got INTEGER"),
        ),
        ("last([1, 2, 3])", Value::Integer(3)),
        ("last([])", Value::Null),
        (
            "last(1)",
            Value::error("argument to `last` must be ARRAY, got INTEGER"),
        ),
        ("rest([1, 2, 3])", array(&[2, 3])),
        ("rest([1])", array(&[])),
        ("rest([])", Value::Null),
        (
            "rest(\"abc\")",
            Value::error("argument to `rest` must be ARRAY, got STRING"),
        ),
        ("push([], 1)", array(&[1])),
        ("push([1, 2], 3)", array(&[1, 2, 3])),
        (
            "push(1, 1)",
            Value::error("first argument to `push` must be ARRAY, got INTEGER"),
        ),
        (
            "push([1])",
            Value::error("wrong number of arguments. got=1, want=2"),
        ),
        ("puts()", Value::Null),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), expected, "source: {}", source);
    }
}

#[test]
fn builtins_inspect_and_can_be_shadowed() {
    assert_eq!(eval("len").inspect(), "builtin function");
    assert_eq!(eval("let len = fn(x) { 42 }; len([1])"), Value::Integer(42));
}

#[test]
fn push_does_not_mutate_its_input() {
    assert_eq!(eval("let a = []; let b = push(a, 1); a"), array(&[]));
    assert_eq!(eval("let a = []; let b = push(a, 1); b"), array(&[1]));
}

#[test]
fn builtins_compose_into_higher_order_functions() {
    let source = "
        let map = fn(arr, f) {
            let iter = fn(arr, accumulated) {
                if (len(arr) == 0) {
                    accumulated
                } else {
                    iter(rest(arr), push(accumulated, f(first(arr))));
                }
            };
            iter(arr, []);
        };
        map([1, 2, 3, 4], fn(x) { x * 2 });";
    assert_eq!(eval(source), array(&[2, 4, 6, 8]));
}

#[test]
fn puts_writes_inspected_arguments() {
    let program = parse("puts(1, \"two\", [3, true], null); puts({\"k\": 1})");
    let env = Environment::new();
    let mut evaluator = Evaluator::with_output(Vec::new());

    assert_eq!(evaluator.eval_program(&program, &env), Some(Value::Null));
    let output = String::from_utf8(evaluator.output().clone()).unwrap();
    assert_eq!(output, "1\ntwo\n[3, true]\nnull\n{k: 1}\n");
}

#[test]
fn array_literals() {
    assert_eq!(eval("[1, 2 * 2, 3 + 3]"), array(&[1, 4, 6]));
    assert_eq!(eval("[1, \"a\", true]").inspect(), "[1, a, true]");
}

#[test]
fn array_index_expressions() {
    let cases = [
        ("[1, 2, 3][0]", Value::Integer(1)),
        ("[1, 2, 3][1]", Value::Integer(2)),
        ("[1, 2, 3][2]", Value::Integer(3)),
        ("let i = 0; [1][i];", Value::Integer(1)),
        ("[1, 2, 3][1 + 1];", Value::Integer(3)),
        ("let myArray = [1, 2, 3]; myArray[2];", Value::Integer(3)),
        (
            "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
            Value::Integer(6),
        ),
        (
            "let myArray = [1, 2, 3]; let i = myArray[0]; myArray[i]",
            Value::Integer(2),
        ),
        ("[1, 2, 3][3]", Value::Null),
        ("[1, 2, 3][-1]", Value::Null),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), expected, "source: {}", source);
    }
}

#[test]
fn map_literals() {
    let source = r#"
        let two = "two";
        {
            "one": 10 - 9,
            two: 1 + 1,
            "thr" + "ee": 6 / 2,
            4: 4,
            true: 5,
            false: 6
        }"#;

    let value = eval(source);
    let pairs = match &value {
        Value::Map(pairs) => pairs,
        other => panic!("expected map, got {:?}", other),
    };

    let expected = [
        (MapKey::String("one".into()), 1),
        (MapKey::String("two".into()), 2),
        (MapKey::String("three".into()), 3),
        (MapKey::Integer(4), 4),
        (MapKey::Boolean(true), 5),
        (MapKey::Boolean(false), 6),
    ];
    assert_eq!(pairs.len(), expected.len());
    for (key, value) in expected {
        assert_eq!(pairs.get(&key), Some(&Value::Integer(value)), "key: {}", key);
    }
    assert_eq!(
        value.inspect(),
        "{one: 1, two: 2, three: 3, 4: 4, true: 5, false: 6}"
    );
}

#[test]
fn duplicate_map_keys_keep_first_position() {
    assert_eq!(eval("{1: \"a\", 2: \"b\", 1: \"c\"}").inspect(), "{1: c, 2: b}");
}

#[test]
fn map_index_expressions() {
    let cases = [
        ("{\"foo\": 5}[\"foo\"]", Value::Integer(5)),
        ("{\"foo\": 5}[\"bar\"]", Value::Null),
        ("let key = \"foo\"; {\"foo\": 5}[key]", Value::Integer(5)),
        ("{}[\"foo\"]", Value::Null),
        ("{5: 5}[5]", Value::Integer(5)),
        ("{true: 5}[true]", Value::Integer(5)),
        ("{false: 5}[false]", Value::Integer(5)),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), expected, "source: {}", source);
    }
}

#[test]
fn heap_values_compare_by_identity() {
    let cases = [
        ("let a = [1]; a == a", true),
        ("[1] == [1]", false),
        ("[1] != [1]", true),
        ("let m = {1: 2}; m == m", true),
        ("{1: 2} == {1: 2}", false),
        ("let f = fn() { 1 }; f == f", true),
        ("fn() { 1 } == fn() { 1 }", false),
        ("len == len", true),
        ("len == first", false),
    ];

    for (source, expected) in cases {
        assert_eq!(eval(source), Value::Boolean(expected), "source: {}", source);
    }
}

#[test]
fn last_error_points_at_the_failing_expression() {
    let source = "let x = 1;\nlet y = x + true;";
    let program = parse(source);
    let env = Environment::new();
    let mut evaluator = Evaluator::with_output(Vec::new());

    let result = evaluator.eval_program(&program, &env);
    assert_eq!(result, Some(Value::error("type mismatch: INTEGER + BOOLEAN")));

    let error = evaluator.last_error().expect("error location recorded");
    assert_eq!(&source[error.span.start..error.span.end], "x + true");
    assert_eq!(error.message, "type mismatch: INTEGER + BOOLEAN");
}

#[test]
fn last_error_is_cleared_by_the_next_program() {
    let env = Environment::new();
    let mut evaluator = Evaluator::with_output(Vec::new());

    evaluator.eval_program(&parse("missing"), &env);
    assert!(evaluator.last_error().is_some());

    evaluator.eval_program(&parse("1"), &env);
    assert!(evaluator.last_error().is_none());
}

#[test]
fn environment_persists_across_programs() {
    let env = Environment::new();
    let mut evaluator = Evaluator::with_output(Vec::new());

    assert_eq!(evaluator.eval_program(&parse("let x = 5;"), &env), None);
    assert_eq!(
        evaluator.eval_program(&parse("x * 2"), &env),
        Some(Value::Integer(10))
    );
    // A runtime error does not disturb existing bindings.
    assert!(evaluator
        .eval_program(&parse("let y = x + true;"), &env)
        .is_some_and(|value| value.is_error()));
    assert_eq!(evaluator.eval_program(&parse("x"), &env), Some(Value::Integer(5)));
    assert_eq!(env.borrow().get("y"), None);
}

#[test]
fn free_eval_function() {
    let env = Environment::new();
    assert_eq!(
        monkey::eval(&parse("let a = 2; a * 21"), &env),
        Some(Value::Integer(42))
    );
}
