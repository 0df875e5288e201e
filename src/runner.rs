use crate::interpreter::Interpreter;

/// Post-run dumps requested on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct Options {
    pub dump_ast: bool,
    pub dump_vars: bool,
}

/// Parse and run a whole source file, reporting errors against the original
/// text. Returns false if parsing or execution failed.
pub fn run(source: &str, filename: Option<&str>, options: Options) -> bool {
    let mut interpreter = Interpreter::new();

    if let Err(error) = interpreter.set_source(source) {
        error.report(source, filename);
        return false;
    }

    if options.dump_ast {
        for item in &interpreter.program().body {
            println!("{:#?}", item);
        }
    }

    let ok = match interpreter.exec() {
        Ok(()) => true,
        Err(error) => {
            error.report(source, filename);
            false
        }
    };

    if options.dump_vars {
        let mut names: Vec<&String> = interpreter.variables().keys().collect();
        names.sort();
        for name in names {
            println!("{} = {}", name, interpreter.variables()[name]);
        }
    }

    ok
}
