use crate::ast::{
    AssignOp, BinaryOp, Expr, Item, Line, ListMode, LogicalOp, PrintItem, PrintSep, Program,
    Stmt, UnaryOp,
};
use crate::error::{BasicError, Span};
use crate::parser::{parse_int, Parser};
use crate::value::Value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

/// Maximum GOSUB nesting depth before execution is aborted.
pub const GOSUB_LIMIT: usize = 255;

/// Column width of the print zone a `,` separator pads to.
const PRINT_ZONE: usize = 8;

/// Name of the variable that captures the value of a bare expression
/// statement, so the last result is reachable from the REPL.
const TEMP_VAR: &str = "_";

/// Outcome of executing one statement.
enum Flow {
    Normal,
    Jump(usize),
    Halt,
}

pub struct Interpreter<R = BufReader<Stdin>, W = Stdout> {
    program: Program,
    variables: HashMap<String, Value>,
    stack: Vec<usize>,
    cursor: usize,
    rng: StdRng,
    input: R,
    output: W,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stdout())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self {
            program: Program::new(),
            variables: HashMap::new(),
            stack: Vec::new(),
            cursor: 0,
            rng: StdRng::from_entropy(),
            input,
            output,
        }
    }

    /// Replace the RNG with a deterministic one. RND output then depends
    /// only on the seed and the call sequence.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Parse `text` and install it as the stored program, resetting all
    /// interpreter state.
    pub fn set_source(&mut self, text: &str) -> Result<(), BasicError> {
        let program = Parser::new(text)?.parse()?;
        self.install(program);
        Ok(())
    }

    pub fn install(&mut self, program: Program) {
        self.program = program;
        self.variables.clear();
        self.stack.clear();
        self.cursor = 0;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Replace-or-append one program entry by line number. Only valid
    /// between executions; `exec` owns the body while it runs.
    pub fn edit(&mut self, item: Item) {
        self.program.upsert(item);
    }

    /// Read-only view of the variable environment, for diagnostics.
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the stored program from the top until it halts.
    pub fn exec(&mut self) -> Result<(), BasicError> {
        self.cursor = 0;
        self.stack.clear();

        while self.cursor < self.program.body.len() {
            let item = self.program.body[self.cursor].clone();
            let flow = match &item {
                // A label reached by sequential flow is a no-op
                Item::Label(_) => Flow::Normal,
                Item::Line(line) => self.exec_statement(&line.statement)?,
            };

            match flow {
                Flow::Normal => self.cursor += 1,
                Flow::Jump(target) => self.cursor = target,
                Flow::Halt => {
                    self.cursor = self.program.body.len();
                    break;
                }
            }
        }

        Ok(())
    }

    /// Execute one already-parsed line outside the main loop. Used by the
    /// REPL for immediate statements that are not part of the stored
    /// program; control-flow statements have no cursor to redirect here.
    pub fn exec_line(&mut self, line: &Line) -> Result<(), BasicError> {
        match self.exec_statement(&line.statement)? {
            Flow::Normal | Flow::Halt => Ok(()),
            Flow::Jump(_) => Err(BasicError::runtime_error(
                line.statement.span().clone(),
                "Jump outside a running program".to_string(),
            )),
        }
    }

    fn exec_statement(&mut self, stmt: &Stmt) -> Result<Flow, BasicError> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                let value = self.eval(expr)?;
                // Keep the last bare-expression result reachable
                if !matches!(expr, Expr::Assignment { .. }) {
                    self.variables.insert(TEMP_VAR.to_string(), value);
                }
                Ok(Flow::Normal)
            }
            Stmt::Let { name, init, .. } => {
                let value = self.eval(init)?;
                self.variables.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Print { items, span } => {
                self.exec_print(items, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Input { targets, span } => {
                self.exec_input(targets, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Goto { dest, .. } => {
                let target = self.resolve_dest(dest)?;
                Ok(Flow::Jump(target))
            }
            Stmt::Gosub { dest, span } => {
                if self.stack.len() >= GOSUB_LIMIT {
                    return Err(BasicError::recursion_limit(span.clone(), GOSUB_LIMIT));
                }
                self.stack.push(self.cursor + 1);
                let target = self.resolve_dest(dest)?;
                Ok(Flow::Jump(target))
            }
            Stmt::Return { span } => match self.stack.pop() {
                Some(target) => Ok(Flow::Jump(target)),
                None => Err(BasicError::runtime_error(
                    span.clone(),
                    "RETURN without a pending GOSUB".to_string(),
                )),
            },
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                // Branches re-enter statement dispatch, so they may
                // themselves redirect the cursor
                if self.eval(test)?.is_truthy() {
                    self.exec_statement(consequent)
                } else if let Some(alt) = alternate {
                    self.exec_statement(alt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::End { .. } => Ok(Flow::Halt),
            // Interactive statements are no-ops inside a running program;
            // the REPL driver gives them meaning
            Stmt::Clear { .. } | Stmt::Run { .. } => Ok(Flow::Normal),
            Stmt::List { range, mode, span } => {
                self.exec_list(range.as_ref(), *mode, span)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Resolve a GOTO/GOSUB destination to a body index. A name (bare
    /// identifier naming a known label, or a string value) resolves to the
    /// entry immediately after the Label; a number resolves to the first
    /// Line carrying it.
    fn resolve_dest(&mut self, dest: &Expr) -> Result<usize, BasicError> {
        if let Expr::Identifier { name, .. } = dest {
            if let Some(idx) = self.find_label(name) {
                return Ok(idx + 1);
            }
        }

        let span = dest.span().clone();
        match self.eval(dest)? {
            Value::Int(n) => self.line_target(n, &span),
            Value::Float(f) if f.fract() == 0.0 => self.line_target(f as i64, &span),
            Value::Str(name) => match self.find_label(&name) {
                Some(idx) => Ok(idx + 1),
                None => Err(BasicError::runtime_error(
                    span,
                    format!("No label named '{}'", name),
                )),
            },
            other => Err(BasicError::runtime_error(
                span,
                format!("Invalid jump destination of type {}", other.type_name()),
            )),
        }
    }

    fn line_target(&self, linenum: i64, span: &Span) -> Result<usize, BasicError> {
        if linenum == 0 {
            return Err(BasicError::runtime_error(
                span.clone(),
                "0 is not a valid jump destination".to_string(),
            ));
        }

        self.find_line(linenum).ok_or_else(|| {
            BasicError::runtime_error(span.clone(), format!("No line numbered {}", linenum))
        })
    }

    fn find_line(&self, linenum: i64) -> Option<usize> {
        self.program
            .body
            .iter()
            .position(|item| matches!(item, Item::Line(line) if line.linenum == linenum))
    }

    fn find_label(&self, name: &str) -> Option<usize> {
        self.program
            .body
            .iter()
            .position(|item| matches!(item, Item::Label(label) if label.name == name))
    }

    // STATEMENT BODIES

    fn exec_print(&mut self, items: &[PrintItem], span: &Span) -> Result<(), BasicError> {
        for item in items {
            let value = self.eval(&item.expr)?;
            let result = match item.sep {
                // Comma pads to the next print zone, semicolon and
                // no-separator concatenate
                Some(PrintSep::Comma) => {
                    write!(self.output, "{:<width$}", value.to_string(), width = PRINT_ZONE)
                }
                Some(PrintSep::Semicolon) | None => write!(self.output, "{}", value),
            };
            result.map_err(|e| Self::io_error(span, e))?;
        }
        writeln!(self.output).map_err(|e| Self::io_error(span, e))?;
        Ok(())
    }

    fn exec_input(&mut self, targets: &[String], span: &Span) -> Result<(), BasicError> {
        for name in targets {
            let mut buffer = String::new();
            let read = self
                .input
                .read_line(&mut buffer)
                .map_err(|e| Self::io_error(span, e))?;
            if read == 0 {
                return Err(BasicError::runtime_error(
                    span.clone(),
                    format!("Input exhausted while reading '{}'", name),
                ));
            }
            self.variables
                .insert(name.clone(), coerce_input(buffer.trim()));
        }
        Ok(())
    }

    fn exec_list(
        &mut self,
        range: Option<&Expr>,
        mode: ListMode,
        span: &Span,
    ) -> Result<(), BasicError> {
        let bounds = match range {
            None => None,
            Some(expr) => {
                let value = self.eval(expr)?;
                Some(list_bounds(value, expr.span())?)
            }
        };

        for item in &self.program.body {
            if let Some((low, high)) = bounds {
                let visible =
                    matches!(item, Item::Line(line) if line.linenum >= low && line.linenum <= high);
                if !visible {
                    continue;
                }
            }

            let result = match mode {
                ListMode::Code => writeln!(self.output, "{}", item),
                ListMode::Ast => writeln!(self.output, "{:#?}", item),
            };
            result.map_err(|e| Self::io_error(span, e))?;
        }

        Ok(())
    }

    // EXPRESSIONS

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, BasicError> {
        match expr {
            Expr::IntLiteral { value, .. } => Ok(Value::Int(*value)),
            Expr::FloatLiteral { value, .. } => Ok(Value::Float(*value)),
            Expr::StringLiteral { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Identifier { name, span } => self.getvar(name, span),
            Expr::Unary { op, operand, span } => {
                let value = self.eval(operand)?;
                eval_unary(*op, value, span)
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                eval_binary(*op, lhs, rhs, span)
            }
            Expr::Logical {
                op, left, right, ..
            } => {
                // Both sides always evaluate; no short-circuiting
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                Ok(match op {
                    LogicalOp::And => {
                        if lhs.is_truthy() {
                            rhs
                        } else {
                            lhs
                        }
                    }
                    LogicalOp::Or => {
                        if lhs.is_truthy() {
                            lhs
                        } else {
                            rhs
                        }
                    }
                })
            }
            Expr::Assignment {
                op,
                target,
                value,
                span,
            } => {
                let rhs = self.eval(value)?;
                let result = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::AddAssign => {
                        let current = self.getvar(target, span)?;
                        eval_binary(BinaryOp::Add, current, rhs, span)?
                    }
                    AssignOp::SubAssign => {
                        let current = self.getvar(target, span)?;
                        eval_binary(BinaryOp::Subtract, current, rhs, span)?
                    }
                    AssignOp::MulAssign => {
                        let current = self.getvar(target, span)?;
                        eval_binary(BinaryOp::Multiply, current, rhs, span)?
                    }
                    AssignOp::DivAssign => {
                        let current = self.getvar(target, span)?;
                        eval_binary(BinaryOp::Divide, current, rhs, span)?
                    }
                };
                self.variables.insert(target.clone(), result.clone());
                Ok(result)
            }
            Expr::Sequence { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(values))
            }
            Expr::Call { name, args, span } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_builtin(name, &values, span)
            }
        }
    }

    fn call_builtin(
        &mut self,
        name: &str,
        args: &[Value],
        span: &Span,
    ) -> Result<Value, BasicError> {
        match name {
            "rnd" => {
                let (min, max) = match args {
                    [max] => (0, as_int(max, span)?),
                    [min, max] => (as_int(min, span)?, as_int(max, span)?),
                    _ => {
                        return Err(BasicError::runtime_error(
                            span.clone(),
                            format!("rnd takes 1 or 2 arguments, got {}", args.len()),
                        ))
                    }
                };
                if min > max {
                    return Err(BasicError::runtime_error(
                        span.clone(),
                        format!("rnd: empty range {}..{}", min, max),
                    ));
                }
                Ok(Value::Int(self.rng.gen_range(min..=max)))
            }
            "pow" => match args {
                [base, exp] => eval_pow(base, exp, span),
                _ => Err(BasicError::runtime_error(
                    span.clone(),
                    format!("pow takes 2 arguments, got {}", args.len()),
                )),
            },
            "sqrt" => match args {
                [value] => {
                    let x = as_float(value, span)?;
                    if x < 0.0 {
                        return Err(BasicError::runtime_error(
                            span.clone(),
                            format!("sqrt of negative number {}", x),
                        ));
                    }
                    Ok(Value::Float(x.sqrt()))
                }
                _ => Err(BasicError::runtime_error(
                    span.clone(),
                    format!("sqrt takes 1 argument, got {}", args.len()),
                )),
            },
            "usr" => Err(BasicError::runtime_error(
                span.clone(),
                "usr() is reserved for machine-language routines".to_string(),
            )),
            other => Err(BasicError::runtime_error(
                span.clone(),
                format!("Unknown function '{}'", other),
            )),
        }
    }

    fn getvar(&self, name: &str, span: &Span) -> Result<Value, BasicError> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| BasicError::undefined_variable(span.clone(), name))
    }

    fn io_error(span: &Span, e: io::Error) -> BasicError {
        BasicError::runtime_error(span.clone(), format!("I/O error: {}", e))
    }
}

/// Coerce an INPUT line: integral float narrows to int, then a radix-aware
/// integer parse catches hex/octal prefixes, anything else stays a string.
fn coerce_input(text: &str) -> Value {
    if let Ok(f) = text.parse::<f64>() {
        if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
            return Value::Int(f as i64);
        }
        return Value::Float(f);
    }
    if let Some(n) = parse_int(text) {
        return Value::Int(n);
    }
    Value::Str(text.to_string())
}

fn list_bounds(value: Value, span: &Span) -> Result<(i64, i64), BasicError> {
    match value {
        Value::Int(n) => Ok((n, n)),
        Value::List(items) => match items.as_slice() {
            [Value::Int(low), Value::Int(high)] => Ok((*low, *high)),
            _ => Err(BasicError::runtime_error(
                span.clone(),
                "LIST range must be one or two line numbers".to_string(),
            )),
        },
        other => Err(BasicError::runtime_error(
            span.clone(),
            format!("Invalid LIST range of type {}", other.type_name()),
        )),
    }
}

fn as_int(value: &Value, span: &Span) -> Result<i64, BasicError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        other => Err(BasicError::runtime_error(
            span.clone(),
            format!("Expected an integer, got {}", other.type_name()),
        )),
    }
}

fn as_float(value: &Value, span: &Span) -> Result<f64, BasicError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(BasicError::runtime_error(
            span.clone(),
            format!("Expected a number, got {}", other.type_name()),
        )),
    }
}

fn eval_unary(op: UnaryOp, operand: Value, span: &Span) -> Result<Value, BasicError> {
    match op {
        UnaryOp::Plus => match operand {
            Value::Int(_) | Value::Float(_) => Ok(operand),
            other => Err(BasicError::runtime_error(
                span.clone(),
                format!("Cannot apply unary '+' to {}", other.type_name()),
            )),
        },
        UnaryOp::Negate => match operand {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(BasicError::runtime_error(
                span.clone(),
                format!("Cannot negate {}", other.type_name()),
            )),
        },
        UnaryOp::Not => Ok(Value::Int(if operand.is_truthy() { 0 } else { 1 })),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value, span: &Span) -> Result<Value, BasicError> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l + r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l + r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 + r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l + r as f64)),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
            (l, r) => Err(type_error("add", l, r, span)),
        },
        BinaryOp::Subtract => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l - r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l - r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 - r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l - r as f64)),
            (l, r) => Err(type_error("subtract", l, r, span)),
        },
        BinaryOp::Multiply => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l * r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l * r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 * r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l * r as f64)),
            (l, r) => Err(type_error("multiply", l, r, span)),
        },
        // Division is always real division
        BinaryOp::Divide => {
            let l = as_float(&left, span)?;
            let r = as_float(&right, span)?;
            if r == 0.0 {
                return Err(BasicError::runtime_error(
                    span.clone(),
                    "Division by zero".to_string(),
                ));
            }
            Ok(Value::Float(l / r))
        }
        BinaryOp::Equal => Ok(bool_value(is_equal(&left, &right))),
        BinaryOp::NotEqual => Ok(bool_value(!is_equal(&left, &right))),
        BinaryOp::Less => compare(left, right, span, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LessEqual => compare(left, right, span, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Greater => compare(left, right, span, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GreaterEqual => compare(left, right, span, |o| o != std::cmp::Ordering::Less),
    }
}

fn eval_pow(base: &Value, exp: &Value, span: &Span) -> Result<Value, BasicError> {
    if let (Value::Int(b), Value::Int(e)) = (base, exp) {
        if *e >= 0 {
            if let Ok(e) = u32::try_from(*e) {
                if let Some(n) = b.checked_pow(e) {
                    return Ok(Value::Int(n));
                }
            }
        }
    }
    let b = as_float(base, span)?;
    let e = as_float(exp, span)?;
    Ok(Value::Float(b.powf(e)))
}

fn compare(
    left: Value,
    right: Value,
    span: &Span,
    test: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, BasicError> {
    let ordering = match (&left, &right) {
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        (Value::Int(l), Value::Int(r)) => l.partial_cmp(r),
        (Value::Int(l), Value::Float(r)) => (*l as f64).partial_cmp(r),
        (Value::Float(l), Value::Int(r)) => l.partial_cmp(&(*r as f64)),
        (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
        _ => None,
    };

    match ordering {
        Some(ordering) => Ok(bool_value(test(ordering))),
        None => Err(type_error("compare", left, right, span)),
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Int(l), Value::Float(r)) => (*l as f64) == *r,
        (Value::Float(l), Value::Int(r)) => *l == (*r as f64),
        (Value::Str(l), Value::Str(r)) => l == r,
        _ => false,
    }
}

fn bool_value(b: bool) -> Value {
    Value::Int(if b { 1 } else { 0 })
}

fn type_error(verb: &str, left: Value, right: Value, span: &Span) -> BasicError {
    BasicError::runtime_error(
        span.clone(),
        format!(
            "Cannot {} {} and {}",
            verb,
            left.type_name(),
            right.type_name()
        ),
    )
}
