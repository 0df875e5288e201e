use crate::ast::{Item, Stmt};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use std::io::{self, Write};

/// Interactive line editor. Numbered lines and labels are stored into the
/// program (replacing any line with the same number); unnumbered statements
/// execute immediately against the persistent interpreter state.

pub fn start() {
    println!("rbasic v0.1.0");
    println!("Type 'exit' or press Ctrl+C to quit");
    println!();

    // Persistent interpreter so the stored program and variables survive
    // between commands
    let mut interpreter = Interpreter::new();

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
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

                run_repl_line(line, &mut interpreter);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_repl_line(source: &str, interpreter: &mut Interpreter) {
    let items = match Parser::new(source).and_then(|mut parser| parser.parse_line()) {
        Ok(items) => items,
        Err(error) => {
            error.report(source, None);
            return;
        }
    };

    for item in items {
        match item {
            Item::Label(_) => interpreter.edit(item),
            Item::Line(line) if line.linenum != 0 => interpreter.edit(Item::Line(line)),
            Item::Line(line) => match &line.statement {
                // RUN and CLEAR only mean something at the prompt
                Stmt::Run { .. } => {
                    if let Err(error) = interpreter.exec() {
                        error.report(source, None);
                    }
                }
                Stmt::Clear { .. } => {
                    print!("\x1b[2J\x1b[H");
                    io::stdout().flush().unwrap();
                }
                _ => {
                    if let Err(error) = interpreter.exec_line(&line) {
                        error.report(source, None);
                    }
                }
            },
        }
    }
}
