use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    SyntaxError,
    UndefinedVariable,
    RuntimeError,
    RecursionLimit,
}

#[derive(Debug, Clone)]
pub struct BasicError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl BasicError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn lex_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LexError, span, message)
    }

    pub fn syntax_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::SyntaxError, span, message)
    }

    pub fn undefined_variable(span: Span, name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            span,
            format!("'{}' is undefined", name),
        )
    }

    pub fn runtime_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::RuntimeError, span, message)
    }

    pub fn recursion_limit(span: Span, depth: usize) -> Self {
        Self::new(
            ErrorKind::RecursionLimit,
            span,
            format!("GOSUB depth exceeds the limit of {}", depth),
        )
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::LexError => Color::Red,
            ErrorKind::SyntaxError => Color::Yellow,
            ErrorKind::UndefinedVariable => Color::Cyan,
            ErrorKind::RuntimeError => Color::Magenta,
            ErrorKind::RecursionLimit => Color::Magenta,
        };

        let kind_str = match self.kind {
            ErrorKind::LexError => "Lexical Error",
            ErrorKind::SyntaxError => "Syntax Error",
            ErrorKind::UndefinedVariable => "Undefined Variable",
            ErrorKind::RuntimeError => "Runtime Error",
            ErrorKind::RecursionLimit => "Recursion Limit",
        };

        // Spans produced while executing a stored program may not map into
        // the text being reported (e.g. REPL-entered lines); clamp them.
        let end = self.span.end.min(source.len().max(1));
        let start = self.span.start.min(end.saturating_sub(1));

        let mut builder = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", kind_str.fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            builder = builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        let _ = builder.finish().print((filename, Source::from(source)));
    }
}

impl fmt::Display for BasicError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BasicError {}
