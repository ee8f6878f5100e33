use runql::config::{Properties, DRIVER_KEY, URL_KEY};
use runql::interpreter::{ExecutionContext, SqlInterpreter};
use runql::result::ResultCode;
use std::io::{self, BufRead};
use tracing::info;

fn main() {
    // Initialize the logging system using tracing subscriber; stdout is
    // reserved for query results
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    info!("Starting runql...");

    // Parse CLI arguments: database path, optional properties file
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: runql <database> [properties.toml]");
        std::process::exit(2);
    }
    let db_path = &args[1];

    let properties = match args.get(2) {
        Some(path) => match Properties::load(path) {
            Ok(props) => props,
            Err(e) => {
                eprintln!("Failed to load properties: {}", e);
                std::process::exit(2);
            }
        },
        None => Properties::new(),
    };
    let properties = properties
        .with_value(DRIVER_KEY, "sqlite")
        .with_value(URL_KEY, db_path);

    let interpreter = match SqlInterpreter::new(properties) {
        Ok(interpreter) => interpreter,
        Err(e) => {
            eprintln!("Failed to configure interpreter: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = interpreter.open() {
        eprintln!("Failed to connect to database: {}", e);
        std::process::exit(1);
    }
    info!("Connected to database: {}", db_path);

    // One query per input line; results go to stdout, failures to stderr
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let query = match line {
            Ok(query) => query,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        };
        if query.trim().is_empty() {
            continue;
        }
        let ctx = ExecutionContext::new();
        let result = interpreter.interpret(&query, &ctx);
        match result.code() {
            ResultCode::Success => print!("{}", result.message()),
            ResultCode::Error => eprintln!("ERROR: {}", result.message()),
        }
    }

    if let Err(e) = interpreter.close() {
        eprintln!("Failed to close cleanly: {}", e);
        std::process::exit(1);
    }
}
