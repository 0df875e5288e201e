use crate::error::Span;
use std::fmt;

/// One executable unit of a program: a statement with an optional numeric
/// jump target. `linenum` 0 means the line was entered unnumbered.
#[derive(Debug, Clone)]
pub struct Line {
    pub statement: Stmt,
    pub linenum: i64,
}

/// A named jump target, independent of line numbers.
#[derive(Debug, Clone)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Item {
    Line(Line),
    Label(Label),
}

/// An ordered program body. The order is the execution order and the
/// jump-target space; the REPL edits it between runs via `upsert`.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Item>,
}

impl Program {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    /// Replace the first line with a matching nonzero line number, or
    /// append. Labels and unnumbered lines always append.
    pub fn upsert(&mut self, item: Item) {
        if let Item::Line(ref line) = item {
            if line.linenum != 0 {
                for slot in self.body.iter_mut() {
                    if matches!(slot, Item::Line(existing) if existing.linenum == line.linenum) {
                        *slot = item;
                        return;
                    }
                }
            }
        }
        self.body.push(item);
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression {
        expr: Expr,
        span: Span,
    },
    Let {
        name: String,
        init: Expr,
        span: Span,
    },
    Print {
        items: Vec<PrintItem>,
        span: Span,
    },
    Input {
        targets: Vec<String>,
        span: Span,
    },
    Goto {
        dest: Expr,
        span: Span,
    },
    Gosub {
        dest: Expr,
        span: Span,
    },
    Return {
        span: Span,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
        span: Span,
    },
    End {
        span: Span,
    },
    Clear {
        span: Span,
    },
    Run {
        arg: Option<Expr>,
        span: Span,
    },
    List {
        range: Option<Expr>,
        mode: ListMode,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Expression { span, .. } => span,
            Stmt::Let { span, .. } => span,
            Stmt::Print { span, .. } => span,
            Stmt::Input { span, .. } => span,
            Stmt::Goto { span, .. } => span,
            Stmt::Gosub { span, .. } => span,
            Stmt::Return { span } => span,
            Stmt::If { span, .. } => span,
            Stmt::End { span } => span,
            Stmt::Clear { span } => span,
            Stmt::Run { span, .. } => span,
            Stmt::List { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrintItem {
    pub expr: Expr,
    pub sep: Option<PrintSep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintSep {
    Comma,
    Semicolon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Code,
    Ast,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: String,
        span: Span,
    },
    IntLiteral {
        value: i64,
        span: Span,
    },
    FloatLiteral {
        value: f64,
        span: Span,
    },
    StringLiteral {
        value: String,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Assignment {
        op: AssignOp,
        target: String,
        value: Box<Expr>,
        span: Span,
    },
    Sequence {
        items: Vec<Expr>,
        span: Span,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Identifier { span, .. } => span,
            Expr::IntLiteral { span, .. } => span,
            Expr::FloatLiteral { span, .. } => span,
            Expr::StringLiteral { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Logical { span, .. } => span,
            Expr::Assignment { span, .. } => span,
            Expr::Sequence { span, .. } => span,
            Expr::Call { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

// --- canonical source re-rendering, used by LIST ---
//
// The rendering is lossy: original whitespace and keyword casing are gone,
// and compound subexpressions come back fully parenthesized.

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        };
        f.write_str(s)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        };
        f.write_str(s)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        })
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        };
        f.write_str(s)
    }
}

/// Wrap compound operands in parentheses so the rendering reads back with
/// the same structure it was parsed with.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Expr::Binary { .. } | Expr::Logical { .. } | Expr::Assignment { .. } => {
                write!(f, "({})", self.0)
            }
            _ => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Identifier { name, .. } => f.write_str(name),
            Expr::IntLiteral { value, .. } => write!(f, "{}", value),
            Expr::FloatLiteral { value, .. } => write!(f, "{}", value),
            Expr::StringLiteral { value, .. } => write!(f, "\"{}\"", value),
            Expr::Unary { op, operand, .. } => write!(f, "{}{}", op, Operand(operand)),
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "{} {} {}", Operand(left), op, Operand(right)),
            Expr::Logical {
                op, left, right, ..
            } => write!(f, "{} {} {}", Operand(left), op, Operand(right)),
            Expr::Assignment {
                op, target, value, ..
            } => write!(f, "{} {} {}", target, op, value),
            Expr::Sequence { items, .. } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Expression { expr, .. } => write!(f, "{}", expr),
            Stmt::Let { name, init, .. } => write!(f, "let {} = {}", name, init),
            Stmt::Print { items, .. } => {
                f.write_str("print")?;
                for (i, item) in items.iter().enumerate() {
                    if i == 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item.expr)?;
                    match item.sep {
                        Some(PrintSep::Comma) => f.write_str(", ")?,
                        Some(PrintSep::Semicolon) => f.write_str("; ")?,
                        None => {}
                    }
                }
                Ok(())
            }
            Stmt::Input { targets, .. } => {
                f.write_str("input ")?;
                for (i, name) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                }
                Ok(())
            }
            Stmt::Goto { dest, .. } => write!(f, "goto {}", dest),
            Stmt::Gosub { dest, .. } => write!(f, "gosub {}", dest),
            Stmt::Return { .. } => f.write_str("return"),
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                write!(f, "if {} then {}", test, consequent)?;
                if let Some(alt) = alternate {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            }
            Stmt::End { .. } => f.write_str("end"),
            Stmt::Clear { .. } => f.write_str("clear"),
            Stmt::Run { arg, .. } => match arg {
                Some(expr) => write!(f, "run, {}", expr),
                None => f.write_str("run"),
            },
            Stmt::List { range, mode, .. } => {
                f.write_str("list")?;
                if let Some(range) = range {
                    write!(f, " {}", range)?;
                }
                if *mode == ListMode::Ast {
                    f.write_str(" ast")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Item::Line(line) => {
                if line.linenum != 0 {
                    write!(f, "{} {}", line.linenum, line.statement)
                } else {
                    write!(f, "{}", line.statement)
                }
            }
            Item::Label(label) => write!(f, "{}:", label.name),
        }
    }
}
