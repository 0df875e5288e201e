// rbasic interpreter library
//
// A line-numbered tiny BASIC: streaming lexer, recursive-descent parser
// with backtracking over leading line numbers, and a cursor-driven
// interpreter supporting GOTO/GOSUB across numbered lines and named labels.

// Public modules
pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Item, Label, Line, Program, Stmt};
pub use error::{BasicError, ErrorKind, Span};
pub use interpreter::Interpreter;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_int, Parser};
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
