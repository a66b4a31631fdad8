// slate - Command-line runner and REPL for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::debug;
use slate_embed::Engine;
use slate_vm::{Context, ErrorKind, FloatPrecision, ParseMode, VmConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Options {
    files: Vec<String>,
    self_test: bool,
    precision: FloatPrecision,
}

fn main() {
    env_logger::init();

    let options = match parse_args(env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(2);
        }
    };

    if options.self_test {
        process::exit(if run_self_tests() { 0 } else { 1 });
    }

    let mut engine = Engine::with_config(VmConfig {
        float_precision: options.precision,
        context: Context::Default,
        search_paths: search_paths(),
        ..VmConfig::default()
    });

    if options.files.is_empty() {
        run_repl(&mut engine);
    } else {
        run_files(&options.files, &mut engine);
    }
}

/// `Ok(None)` when the arguments were fully handled (e.g. `--version`).
fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        files: Vec::new(),
        self_test: false,
        precision: FloatPrecision::Double,
    };
    for arg in args {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("Slate v{}", VERSION);
                return Ok(None);
            }
            "--test" => options.self_test = true,
            "--single-precision" => options.precision = FloatPrecision::Single,
            flag if flag.starts_with('-') => return Err(format!("unknown option '{}'", flag)),
            _ => options.files.push(arg),
        }
    }
    Ok(Some(options))
}

/// Module directories from `SLATE_PATH`.
fn search_paths() -> Vec<PathBuf> {
    match env::var_os("SLATE_PATH") {
        Some(paths) => env::split_paths(&paths)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

// ============================================================================
// Script files
// ============================================================================

fn run_files(files: &[String], engine: &mut Engine) {
    for file_path in files {
        if let Err(e) = check_extension(file_path) {
            eprintln!("{}", e);
            process::exit(1);
        }
        debug!("running {}", file_path);
        if !Path::new(file_path).is_file() {
            eprintln!("Error: cannot read '{}'", file_path);
            process::exit(1);
        }
        // Diagnostics were already printed by the VM.
        if engine.eval_file(file_path).is_err() {
            process::exit(1);
        }
    }
}

fn check_extension(file_path: &str) -> Result<(), String> {
    match Path::new(file_path).extension().and_then(|e| e.to_str()) {
        Some("slate") => Ok(()),
        Some(ext) => Err(format!(
            "Error: unsupported file extension '.{}' for '{}'",
            ext, file_path
        )),
        None => Err(format!(
            "Error: file '{}' has no extension (expected .slate)",
            file_path
        )),
    }
}

// ============================================================================
// REPL
// ============================================================================

fn run_repl(engine: &mut Engine) {
    println!("Slate v{}", VERSION);
    engine.set_parse_mode(ParseMode::Lenient);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();

    loop {
        print!("{}", if buffer.is_empty() { "slate> " } else { "  ...> " });
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Read error: {}", e);
                break;
            }
            None => {
                println!();
                break;
            }
        };

        if buffer.is_empty() {
            match line.trim() {
                "" => continue,
                "exit" => break,
                _ => {}
            }
        }

        // A blank line ends a multi-line entry.
        let finished = !buffer.is_empty() && line.trim().is_empty();
        if !finished {
            buffer.push_str(&line);
            buffer.push('\n');
            if needs_more_input(&buffer) {
                continue;
            }
        }

        let source = std::mem::take(&mut buffer);
        // Errors are printed by the VM under the default context.
        if let Ok(Some(value)) = engine.vm_mut().interpret(&source, ParseMode::Lenient) {
            println!("{:?}", value);
        }
    }
}

/// Whether `source` stops early, inside a bracket or before a block body,
/// so the REPL should read another line.
fn needs_more_input(source: &str) -> bool {
    let last_line = source.lines().count();
    let last = source.lines().last().unwrap_or_default();
    match slate_parser::parse(source, ParseMode::Lenient) {
        // Inside an indented block; a blank line ends it.
        Ok(_) => last.starts_with(char::is_whitespace) && !last.trim().is_empty(),
        Err(errors) if errors.iter().all(|e| e.line > last_line) => true,
        Err(_) => {
            // A block header parses once an indented body follows it.
            let indent = last.len() - last.trim_start().len();
            let probe = format!("{}{}  null\n", source, " ".repeat(indent));
            slate_parser::parse(&probe, ParseMode::Lenient).is_ok()
        }
    }
}

// ============================================================================
// Self tests
// ============================================================================

enum Expect {
    Value(&'static str),
    Error(ErrorKind),
}

const SELF_TESTS: &[(&str, &str, Expect)] = &[
    ("precedence", "2 + 3 * 4", Expect::Value("14")),
    ("floor division", "17 // 3", Expect::Value("5")),
    ("negative floor division", "-17 // 3", Expect::Value("-6")),
    (
        "bigint promotion",
        "var max = 2147483647; ++max",
        Expect::Value("2147483648"),
    ),
    (
        "closure",
        "def adder(n) = x -> x + n; adder(5)(10)",
        Expect::Value("15"),
    ),
    (
        "compose",
        "def compose(f, g) = x -> f(g(x)); compose(a -> a + 1, b -> 2*b)(3)",
        Expect::Value("7"),
    ),
    (
        "for loop",
        "var sum = 0; for var i = 0; i < 5; i += 1 do sum = sum + i; sum",
        Expect::Value("10"),
    ),
    (
        "template literal",
        "`Hello ${\"Wo\" + \"rld\"}`",
        Expect::Value("Hello World"),
    ),
    ("string index", "\"hello\"(0)", Expect::Value("h")),
    (
        "string index out of range",
        "\"hello\"(10)",
        Expect::Error(ErrorKind::RangeError),
    ),
    ("array concat", "[1,2] + [3,4]", Expect::Value("[1, 2, 3, 4]")),
    ("in object", "\"a\" in {a:1, b:2}", Expect::Value("true")),
    ("not in object", "\"c\" in {a:1}", Expect::Value("false")),
    (
        "leap day plus year",
        "LocalDate.of(2024,2,29).plusYears(1).day()",
        Expect::Value("28"),
    ),
    (
        "instant arithmetic",
        "Instant(0).plusSeconds(60).plusMillis(500).toString()",
        Expect::Value("1970-01-01T00:01:00.500Z"),
    ),
    ("division by zero", "1 / 0", Expect::Error(ErrorKind::DivisionByZero)),
    ("undefined variable", "nope", Expect::Error(ErrorKind::ReferenceError)),
    ("break outside loop", "break", Expect::Error(ErrorKind::CompileError)),
];

/// Run the built-in scenarios. Returns true when all pass.
fn run_self_tests() -> bool {
    let mut failures = 0;
    for (name, source, expect) in SELF_TESTS {
        let mut engine = Engine::new();
        let outcome = engine.eval(source);
        let passed = match (expect, &outcome) {
            (Expect::Value(text), Ok(value)) => value.to_string() == *text,
            (Expect::Error(kind), Err(err)) => err.kind() == *kind,
            _ => false,
        };
        if passed {
            println!("test {} ... ok", name);
        } else {
            failures += 1;
            match outcome {
                Ok(value) => println!("test {} ... FAILED (got {:?})", name, value),
                Err(err) => println!("test {} ... FAILED ({})", name, err),
            }
        }
    }
    println!(
        "\n{} passed; {} failed",
        SELF_TESTS.len() - failures,
        failures
    );
    failures == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        let options = parse_args(args(&["--single-precision", "main.slate"]))
            .unwrap()
            .unwrap();
        assert_eq!(options.files, vec!["main.slate".to_string()]);
        assert_eq!(options.precision, FloatPrecision::Single);
        assert!(!options.self_test);
        assert!(parse_args(args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_extension_check() {
        assert!(check_extension("a.slate").is_ok());
        assert!(check_extension("a.txt").is_err());
        assert!(check_extension("a").is_err());
    }

    #[test]
    fn test_repl_continuation() {
        assert!(!needs_more_input("1 + 2\n"));
        assert!(needs_more_input("if true\n"));
        assert!(needs_more_input("def f(x)\n  x + 1\n"));
        assert!(needs_more_input("[1,\n"));
        assert!(!needs_more_input("var = 1\n"));
    }

    #[test]
    fn test_self_tests_pass() {
        assert!(run_self_tests());
    }
}
