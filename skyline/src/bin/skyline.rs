use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use json::{stringify_pretty, JsonValue};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skyline::builtins::{StdHost, BUILTINS};
use skyline::eval::{FileResolver, Interpreter};
use skyline::{eval_file, eval_raw, parse, Environment, Error, Object};

#[derive(Parser)]
#[command(about = "Run SkyLine programs")]
struct Cli {
    /// Code to run instead of a file
    #[arg(short = 'c')]
    code: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log filter, e.g. `skyline=debug` (defaults to RUST_LOG)
    #[arg(long)]
    log: Option<String>,

    path: Option<PathBuf>,
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report(obj: Result<Object, Error>, as_json: bool) {
    let value = match obj {
        Ok(value) => value,
        Err(error) => {
            eprintln!("{}", error);
            exit(1);
        },
    };

    if as_json {
        match JsonValue::try_from(value) {
            Ok(val) => println!("{}", stringify_pretty(val, 4)),
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(1);
            },
        }
    } else if !value.is_nil() {
        println!("{}", value);
    }
}

/// Read lines from stdin and evaluate them one by one in a shared environment.
fn repl() {
    let mut host = StdHost;
    let resolver = FileResolver { root: PathBuf::from(".") };
    let mut interpreter = Interpreter::new(&BUILTINS, &mut host).with_resolver(&resolver);
    let env = Environment::new();

    let stdin = std::io::stdin();
    loop {
        print!(">> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            },
        }

        let program = match parse(&line) {
            Ok(program) => program,
            Err(errors) => {
                eprintln!("{}", Error::Syntax(errors));
                continue;
            },
        };

        let program = match interpreter.expand_macros(program, &env) {
            Ok(program) => program,
            Err(msg) => {
                eprintln!("{}", Error::Runtime(msg));
                continue;
            },
        };

        let value = interpreter.eval_program(&program, &env);
        if !value.is_nil() {
            println!("{}", value);
        }
    }
}

fn main() {
    let args = Cli::parse();
    init_tracing(args.log.as_deref());

    if let Some(path) = args.path {
        report(eval_file(&path), args.json);
    } else if let Some(code) = args.code {
        report(eval_raw(&code), args.json);
    } else {
        repl();
    }
}
