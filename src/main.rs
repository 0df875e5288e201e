mod ast;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod repl;
mod runner;
mod value;

use clap::{Arg, Command};
use std::fs;
use std::path::Path;

fn main() {
    let matches = Command::new("rbasic")
        .about("A line-numbered tiny BASIC interpreter")
        .arg(
            Arg::new("file")
                .help("The program file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("code")
                .short('c')
                .long("code")
                .help("Execute the given source text and exit")
                .value_name("CODE")
                .conflicts_with("file"),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Dump internals after parsing or running")
                .value_name("WHAT")
                .value_parser(["ast", "vars"])
                .action(clap::ArgAction::Append),
        )
        .get_matches();

    let mut options = runner::Options::default();
    if let Some(dumps) = matches.get_many::<String>("dump") {
        for what in dumps {
            match what.as_str() {
                "ast" => options.dump_ast = true,
                "vars" => options.dump_vars = true,
                _ => unreachable!("checked by value_parser"),
            }
        }
    }

    if let Some(code) = matches.get_one::<String>("code") {
        if !runner::run(code, None, options) {
            std::process::exit(1);
        }
    } else if let Some(file_path) = matches.get_one::<String>("file") {
        run_file(file_path, options);
    } else {
        repl::start();
    }
}

fn run_file(path: &str, options: runner::Options) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        std::process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            if !runner::run(&source, path.to_str(), options) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
