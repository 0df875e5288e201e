use crate::ast::{
    AssignOp, BinaryOp, Expr, Item, Label, Line, ListMode, LogicalOp, PrintItem, PrintSep,
    Program, Stmt, UnaryOp,
};
use crate::error::{BasicError, Span};
use crate::lexer::{Checkpoint as LexCheckpoint, Lexer, Token, TokenKind};

/// Parse an integer lexeme, handling `0x`/`0X` hex and C-style octal
/// (leading `0` followed by octal digits, read in base 8).
pub fn parse_int(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1
        && text.starts_with('0')
        && text.bytes().all(|b| (b'0'..=b'7').contains(&b))
    {
        i64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Saved parser position: the lexer cursor plus the pending lookahead.
/// Captured before the speculative leading-integer parse and restored when
/// the integer turns out to be an expression operand.
struct ParseCheckpoint {
    lexer: LexCheckpoint,
    lookahead: Token,
}

pub struct Parser {
    lexer: Lexer,
    lookahead: Token,
    last_end: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, BasicError> {
        let mut lexer = Lexer::new(source.to_string());
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            lookahead,
            last_end: 0,
        })
    }

    /// Parse a whole program: a sequence of numbered lines and labels.
    pub fn parse(&mut self) -> Result<Program, BasicError> {
        let mut body = Vec::new();

        self.skip_eol()?;
        while !self.check(TokenKind::Eof) {
            self.line_items(&mut body)?;
            self.skip_eol()?;
        }

        Ok(Program { body })
    }

    /// Parse a single line of REPL input. Yields one item for ordinary
    /// lines, two when a label is followed by a statement on the same
    /// line, and none for blank input.
    pub fn parse_line(&mut self) -> Result<Vec<Item>, BasicError> {
        let mut items = Vec::new();

        self.skip_eol()?;
        if !self.check(TokenKind::Eof) {
            self.line_items(&mut items)?;
            self.skip_eol()?;
        }

        if !self.check(TokenKind::Eof) {
            return Err(BasicError::syntax_error(
                self.lookahead.span.clone(),
                format!("Expected end of line, got '{}'", self.lookahead.lexeme),
            ));
        }

        Ok(items)
    }

    fn line_items(&mut self, body: &mut Vec<Item>) -> Result<(), BasicError> {
        if self.check(TokenKind::NamedLabel) {
            let token = self.eat(TokenKind::NamedLabel)?;
            body.push(Item::Label(Label {
                name: token.lexeme,
            }));

            // A statement may trail the label on the same line; it becomes
            // the entry the label resolves to.
            if !self.at_line_end() {
                let statement = self.statement()?;
                body.push(Item::Line(Line {
                    statement,
                    linenum: 0,
                }));
            }
            return Ok(());
        }

        // A leading integer is a line number unless an operator follows,
        // in which case it was the first operand of an expression.
        let mut linenum = 0;
        if self.check(TokenKind::Int) {
            let checkpoint = self.save();
            let token = self.eat(TokenKind::Int)?;
            if self.lookahead.kind.is_operator() {
                self.restore(checkpoint);
            } else {
                linenum = parse_int(&token.lexeme).ok_or_else(|| {
                    BasicError::syntax_error(
                        token.span.clone(),
                        format!("Invalid line number '{}'", token.lexeme),
                    )
                })?;
            }
        }

        let statement = self.statement()?;
        body.push(Item::Line(Line { statement, linenum }));
        Ok(())
    }

    // STATEMENTS

    fn statement(&mut self) -> Result<Stmt, BasicError> {
        match self.lookahead.kind {
            TokenKind::Print => self.print_stmt(),
            TokenKind::Input => self.input_stmt(),
            TokenKind::Let => self.let_stmt(),
            TokenKind::Goto => self.goto_stmt(),
            TokenKind::Gosub => self.gosub_stmt(),
            TokenKind::If => self.if_stmt(),
            TokenKind::Return => {
                let token = self.eat(TokenKind::Return)?;
                Ok(Stmt::Return { span: token.span })
            }
            TokenKind::End => {
                let token = self.eat(TokenKind::End)?;
                Ok(Stmt::End { span: token.span })
            }
            TokenKind::Clear => {
                let token = self.eat(TokenKind::Clear)?;
                Ok(Stmt::Clear { span: token.span })
            }
            TokenKind::Run => self.run_stmt(),
            TokenKind::List => self.list_stmt(),
            _ => self.expression_stmt(),
        }
    }

    fn expression_stmt(&mut self) -> Result<Stmt, BasicError> {
        let expr = self.expression()?;
        let span = expr.span().clone();
        Ok(Stmt::Expression { expr, span })
    }

    fn print_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Print)?.span.start;
        let mut items = Vec::new();

        while !self.at_line_end() && !self.check(TokenKind::Else) {
            let expr = self.assignment_expr()?;
            let sep = if self.check(TokenKind::Comma) {
                self.eat(TokenKind::Comma)?;
                Some(PrintSep::Comma)
            } else if self.check(TokenKind::Semicolon) {
                self.eat(TokenKind::Semicolon)?;
                Some(PrintSep::Semicolon)
            } else {
                None
            };
            items.push(PrintItem { expr, sep });
        }

        let span = Span::new(start, self.last_end);
        Ok(Stmt::Print { items, span })
    }

    fn input_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Input)?.span.start;

        let mut targets = vec![self.eat(TokenKind::Identifier)?.lexeme];
        while self.check(TokenKind::Comma) {
            self.eat(TokenKind::Comma)?;
            targets.push(self.eat(TokenKind::Identifier)?.lexeme);
        }

        let span = Span::new(start, self.last_end);
        Ok(Stmt::Input { targets, span })
    }

    fn let_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Let)?.span.start;
        let name = self.eat(TokenKind::Identifier)?.lexeme;
        self.eat(TokenKind::Assign)?;
        let init = self.assignment_expr()?;

        let span = Span::new(start, init.span().end);
        Ok(Stmt::Let { name, init, span })
    }

    fn goto_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Goto)?.span.start;
        let dest = self.expression()?;
        let span = Span::new(start, dest.span().end);
        Ok(Stmt::Goto { dest, span })
    }

    fn gosub_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Gosub)?.span.start;
        let dest = self.expression()?;
        let span = Span::new(start, dest.span().end);
        Ok(Stmt::Gosub { dest, span })
    }

    fn if_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::If)?.span.start;
        let test = self.expression()?;

        // THEN is optional sugar
        if self.check(TokenKind::Then) {
            self.eat(TokenKind::Then)?;
        }

        let consequent = Box::new(self.statement()?);
        let alternate = if self.check(TokenKind::Else) {
            self.eat(TokenKind::Else)?;
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        let span = Span::new(start, self.last_end);
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
            span,
        })
    }

    fn run_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::Run)?.span.start;
        let arg = if self.check(TokenKind::Comma) {
            self.eat(TokenKind::Comma)?;
            Some(self.expression()?)
        } else {
            None
        };

        let span = Span::new(start, self.last_end);
        Ok(Stmt::Run { arg, span })
    }

    fn list_stmt(&mut self) -> Result<Stmt, BasicError> {
        let start = self.eat(TokenKind::List)?.span.start;
        let mut range = None;
        let mut mode = ListMode::Code;

        if self.check(TokenKind::Identifier) {
            mode = self.list_mode()?;
        } else if !self.at_line_end() && !self.check(TokenKind::Else) {
            range = Some(self.expression()?);
            if self.check(TokenKind::Identifier) {
                mode = self.list_mode()?;
            }
        }

        let span = Span::new(start, self.last_end);
        Ok(Stmt::List { range, mode, span })
    }

    fn list_mode(&mut self) -> Result<ListMode, BasicError> {
        let token = self.eat(TokenKind::Identifier)?;
        match token.lexeme.to_ascii_lowercase().as_str() {
            "code" => Ok(ListMode::Code),
            "ast" => Ok(ListMode::Ast),
            other => Err(BasicError::syntax_error(
                token.span,
                format!("Unknown list mode '{}'", other),
            )
            .with_help("LIST accepts 'code' (reconstructed source) or 'ast'".to_string())),
        }
    }

    // EXPRESSIONS

    /// A comma list collapses to its single expression when it has one.
    fn expression(&mut self) -> Result<Expr, BasicError> {
        let first = self.assignment_expr()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span().start;
        let mut items = vec![first];
        while self.check(TokenKind::Comma) {
            self.eat(TokenKind::Comma)?;
            items.push(self.assignment_expr()?);
        }

        let span = Span::new(start, self.last_end);
        Ok(Expr::Sequence { items, span })
    }

    fn assignment_expr(&mut self) -> Result<Expr, BasicError> {
        let left = self.logical_or_expr()?;

        if !self.lookahead_is_assign_op() {
            return Ok(left);
        }

        let op_token = self.eat_first_of(&[
            TokenKind::Assign,
            TokenKind::PlusAssign,
            TokenKind::MinusAssign,
            TokenKind::StarAssign,
            TokenKind::SlashAssign,
        ])?;
        let op = match op_token.kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::AddAssign,
            TokenKind::MinusAssign => AssignOp::SubAssign,
            TokenKind::StarAssign => AssignOp::MulAssign,
            TokenKind::SlashAssign => AssignOp::DivAssign,
            _ => unreachable!(),
        };

        let (target, target_span) = match left {
            Expr::Identifier { name, span } => (name, span),
            other => {
                return Err(BasicError::syntax_error(
                    other.span().clone(),
                    "Invalid left-hand side in assignment expression".to_string(),
                )
                .with_help("Only a bare variable name can be assigned to".to_string()));
            }
        };

        // Right-recursive, so chained assignment works: a = b = 1
        let value = self.assignment_expr()?;
        let span = Span::new(target_span.start, value.span().end);
        Ok(Expr::Assignment {
            op,
            target,
            value: Box::new(value),
            span,
        })
    }

    fn lookahead_is_assign_op(&self) -> bool {
        matches!(
            self.lookahead.kind,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
        )
    }

    fn logical_or_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.logical_and_expr()?;

        while self.check(TokenKind::Or) {
            self.eat(TokenKind::Or)?;
            let right = self.logical_and_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn logical_and_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.equality_expr()?;

        while self.check(TokenKind::And) {
            self.eat(TokenKind::And)?;
            let right = self.equality_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn equality_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.relational_expr()?;

        while matches!(self.lookahead.kind, TokenKind::Equal | TokenKind::NotEqual) {
            let op = match self.eat(self.lookahead.kind)?.kind {
                TokenKind::Equal => BinaryOp::Equal,
                _ => BinaryOp::NotEqual,
            };
            let right = self.relational_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn relational_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.additive_expr()?;

        while matches!(
            self.lookahead.kind,
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual
        ) {
            let op = match self.eat(self.lookahead.kind)?.kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                _ => BinaryOp::GreaterEqual,
            };
            let right = self.additive_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn additive_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.multiplicative_expr()?;

        while matches!(self.lookahead.kind, TokenKind::Plus | TokenKind::Minus) {
            let op = match self.eat(self.lookahead.kind)?.kind {
                TokenKind::Plus => BinaryOp::Add,
                _ => BinaryOp::Subtract,
            };
            let right = self.multiplicative_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, BasicError> {
        let mut expr = self.unary_expr()?;

        while matches!(self.lookahead.kind, TokenKind::Star | TokenKind::Slash) {
            let op = match self.eat(self.lookahead.kind)?.kind {
                TokenKind::Star => BinaryOp::Multiply,
                _ => BinaryOp::Divide,
            };
            let right = self.unary_expr()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn unary_expr(&mut self) -> Result<Expr, BasicError> {
        let op = match self.lookahead.kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };

        if let Some(op) = op {
            let token = self.eat(self.lookahead.kind)?;
            // Right-recursive to allow chains: --x, -!x
            let operand = self.unary_expr()?;
            let span = Span::new(token.span.start, operand.span().end);
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }

        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<Expr, BasicError> {
        match self.lookahead.kind {
            TokenKind::Int => {
                let token = self.eat(TokenKind::Int)?;
                let value = parse_int(&token.lexeme).ok_or_else(|| {
                    BasicError::syntax_error(
                        token.span.clone(),
                        format!("Invalid integer literal '{}'", token.lexeme),
                    )
                })?;
                Ok(Expr::IntLiteral {
                    value,
                    span: token.span,
                })
            }
            TokenKind::Float => {
                let token = self.eat(TokenKind::Float)?;
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    BasicError::syntax_error(
                        token.span.clone(),
                        format!("Invalid float literal '{}'", token.lexeme),
                    )
                })?;
                Ok(Expr::FloatLiteral {
                    value,
                    span: token.span,
                })
            }
            TokenKind::Str => {
                let token = self.eat(TokenKind::Str)?;
                Ok(Expr::StringLiteral {
                    value: token.lexeme,
                    span: token.span,
                })
            }
            TokenKind::Identifier => {
                let token = self.eat(TokenKind::Identifier)?;
                Ok(Expr::Identifier {
                    name: token.lexeme,
                    span: token.span,
                })
            }
            TokenKind::Builtin => self.builtin_call(),
            TokenKind::LeftParen => {
                self.eat(TokenKind::LeftParen)?;
                let expr = self.expression()?;
                self.eat(TokenKind::RightParen)?;
                // No grouping node; parentheses only shape the tree
                Ok(expr)
            }
            TokenKind::Eof => Err(BasicError::syntax_error(
                self.lookahead.span.clone(),
                "Unexpected end of input, expected an expression".to_string(),
            )),
            _ => Err(BasicError::syntax_error(
                self.lookahead.span.clone(),
                format!(
                    "Expected expression, found '{}' on line {}",
                    self.lookahead.lexeme, self.lookahead.line
                ),
            )),
        }
    }

    fn builtin_call(&mut self) -> Result<Expr, BasicError> {
        let token = self.eat(TokenKind::Builtin)?;
        self.eat(TokenKind::LeftParen)?;

        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            args.push(self.assignment_expr()?);
            while self.check(TokenKind::Comma) {
                self.eat(TokenKind::Comma)?;
                args.push(self.assignment_expr()?);
            }
        }

        let close = self.eat(TokenKind::RightParen)?;
        let span = Span::new(token.span.start, close.span.end);
        Ok(Expr::Call {
            name: token.lexeme,
            args,
            span,
        })
    }

    // TOKEN PLUMBING

    fn check(&self, kind: TokenKind) -> bool {
        self.lookahead.kind == kind
    }

    fn at_line_end(&self) -> bool {
        matches!(self.lookahead.kind, TokenKind::Eol | TokenKind::Eof)
    }

    fn skip_eol(&mut self) -> Result<(), BasicError> {
        while self.check(TokenKind::Eol) {
            self.eat(TokenKind::Eol)?;
        }
        Ok(())
    }

    /// Assert the lookahead's kind and advance, or fail with a syntax
    /// error naming expected vs. actual.
    fn eat(&mut self, expected: TokenKind) -> Result<Token, BasicError> {
        if self.lookahead.kind != expected {
            let message = if self.check(TokenKind::Eof) {
                format!(
                    "Unexpected end of input on line {}: expected {:?}",
                    self.lookahead.line, expected
                )
            } else {
                format!(
                    "Unexpected token '{}' on line {}: expected {:?}, got {:?}",
                    self.lookahead.lexeme, self.lookahead.line, expected, self.lookahead.kind
                )
            };
            return Err(BasicError::syntax_error(self.lookahead.span.clone(), message));
        }

        let token = std::mem::replace(&mut self.lookahead, self.lexer.next_token()?);
        self.last_end = token.span.end;
        Ok(token)
    }

    /// Try each alternative in order; if none matches, fail with an error
    /// naming all of them.
    fn eat_first_of(&mut self, kinds: &[TokenKind]) -> Result<Token, BasicError> {
        for &kind in kinds {
            if self.check(kind) {
                return self.eat(kind);
            }
        }

        Err(BasicError::syntax_error(
            self.lookahead.span.clone(),
            format!(
                "Unexpected token '{}' on line {}: expected one of {:?}, got {:?}",
                self.lookahead.lexeme, self.lookahead.line, kinds, self.lookahead.kind
            ),
        ))
    }

    fn save(&self) -> ParseCheckpoint {
        ParseCheckpoint {
            lexer: self.lexer.checkpoint(),
            lookahead: self.lookahead.clone(),
        }
    }

    fn restore(&mut self, checkpoint: ParseCheckpoint) {
        self.lexer.restore(checkpoint.lexer);
        self.lookahead = checkpoint.lookahead;
    }
}
