//! PocketSQL shell
//!
//! Runs SQL from `-e`, from a script file, or interactively. Statements end
//! with `;`; dot commands (`.tables`, `.schema`, `.dump`) inspect the database.

use anyhow::{Context, Result};
use clap::Parser;
use pocketsql::{Database, Table};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "pocketsql-cli", version, about = "In-memory SQL interpreter shell")]
struct Args {
    /// SQL script to run before anything else
    script: Option<PathBuf>,

    /// Execute a single statement and exit
    #[arg(short, long)]
    execute: Option<String>,

    /// Print result tables as JSON instead of a grid
    #[arg(long)]
    json: bool,

    /// Stop at the first failing statement of a script
    #[arg(long)]
    bail: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let db = Database::new();

    if let Some(path) = &args.script {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read script {}", path.display()))?;
        for sql in split_statements(&script) {
            if let Err(e) = execute(&db, &sql, args.json) {
                if args.bail {
                    return Err(e).with_context(|| format!("statement failed: {}", sql));
                }
                eprintln!("Error: {:#}", e);
            }
        }
    }

    if let Some(sql) = &args.execute {
        return execute(&db, sql, args.json);
    }
    if args.script.is_none() {
        interactive_mode(&db, args.json)?;
    }
    Ok(())
}

fn execute(db: &Database, sql: &str, json: bool) -> Result<()> {
    let result = db.query(sql, &[])?;
    display_result(&result, json)
}

fn display_result(result: &Table, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else if result.column_count() > 0 {
        print!("{}", result);
    }
    Ok(())
}

/// Splits a script on `;` outside quotes. Text after the last `;` counts too.
fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in script.chars() {
        match (quote, ch) {
            (None, ';') => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (Some(q), c) if q == c => quote = None,
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

fn interactive_mode(db: &Database, json: bool) -> Result<()> {
    println!("PocketSQL v{}", VERSION);
    println!("Type '.help' for help, '.exit' to quit\n");

    let stdin = io::stdin();
    let mut buffer = String::new();
    let mut pending = String::new();

    loop {
        print!("{}", if pending.is_empty() { "pocketsql> " } else { "        -> " });
        io::stdout().flush()?;

        buffer.clear();
        if stdin.lock().read_line(&mut buffer)? == 0 {
            break;
        }
        let input = buffer.trim();

        if input.starts_with('.') {
            if !pending.is_empty() {
                eprintln!("Warning: incomplete statement discarded");
                pending.clear();
            }
            match input {
                ".exit" | ".quit" => break,
                ".help" => print_interactive_help(),
                ".tables" => {
                    for name in db.table_names() {
                        println!("{}", name);
                    }
                }
                ".dump" => print!("{}", db),
                cmd if cmd.starts_with(".schema ") => {
                    let sql = format!("DESC {}", cmd[8..].trim());
                    if let Err(e) = execute(db, &sql, json) {
                        eprintln!("Error: {:#}", e);
                    }
                }
                _ => eprintln!("Unknown command: {} (try .help)", input),
            }
            continue;
        }
        if input.is_empty() {
            continue;
        }

        pending.push_str(input);
        pending.push(' ');
        if input.ends_with(';') {
            if let Err(e) = execute(db, pending.trim(), json) {
                eprintln!("Error: {:#}", e);
            }
            pending.clear();
        }
    }
    Ok(())
}

fn print_interactive_help() {
    println!(
        r#"
Commands:
  .help             Show this help
  .tables           List tables
  .schema <table>   Describe a table
  .dump             Print every table
  .exit / .quit     Leave the shell

Statements end with ';' and may span several lines.
Set RUST_LOG=pocketsql=debug to trace statement execution.
"#
    );
}
