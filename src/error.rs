use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Location of a lexeme in the preprocessed source.
///
/// `start`/`end` are char offsets (what ariadne labels expect), `row` and
/// `column` are 1-based and point at the first character of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub row: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, row: usize, column: usize) -> Self {
        Self {
            start,
            end,
            row,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Detected while analyzing, before anything runs
    Syntax,
    Redefinition,
    UndefinedIdentifier,
    NotInLoop,
    NotInFunction,
    NotInteger,

    // Raised during evaluation
    StackUnderflow,
    UnknownWord,
    PickOutOfRange,
    DuplicateAllocation,
    InvalidAddress,
    AllocationFailed,
    CallDepth,
    DivisionByZero,
    InvalidInput,
    Io,
}

impl ErrorKind {
    pub fn is_runtime(self) -> bool {
        !matches!(
            self,
            ErrorKind::Syntax
                | ErrorKind::Redefinition
                | ErrorKind::UndefinedIdentifier
                | ErrorKind::NotInLoop
                | ErrorKind::NotInFunction
                | ErrorKind::NotInteger
        )
    }

    /// Human-readable category used as the report title.
    pub fn category(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Redefinition => "Redefinition Error",
            ErrorKind::UndefinedIdentifier => "Undefined Identifier",
            ErrorKind::NotInLoop | ErrorKind::NotInFunction => "Context Error",
            ErrorKind::NotInteger => "Literal Type Error",
            _ => "Runtime Error",
        }
    }

    fn color(self) -> Color {
        match self {
            ErrorKind::Syntax => Color::Yellow,
            ErrorKind::Redefinition | ErrorKind::UndefinedIdentifier => Color::Red,
            ErrorKind::NotInLoop | ErrorKind::NotInFunction | ErrorKind::NotInteger => Color::Blue,
            _ => Color::Magenta,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ForthError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub message: String,
    pub help: Option<String>,
}

impl ForthError {
    pub fn new(kind: ErrorKind, span: Option<Span>, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn at(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::new(kind, Some(span), message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Expected-vs-actual mismatch at `span`.
    pub fn syntax(span: Span, expected: &str, found: &str) -> Self {
        Self::at(
            ErrorKind::Syntax,
            span,
            format!(
                "expected {} but got '{}' at row {} column {}",
                expected, found, span.row, span.column
            ),
        )
    }

    pub fn runtime(kind: ErrorKind, message: String) -> Self {
        Self::new(kind, None, message)
    }

    pub fn stack_underflow() -> Self {
        Self::runtime(
            ErrorKind::StackUnderflow,
            "stack underflow: popped an empty operand stack".to_string(),
        )
    }

    /// Attach a location unless the error already carries a more precise one.
    pub fn or_at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<input>");
        let color = self.kind.color();
        let title = self.kind.category();

        let Some(span) = self.span else {
            eprintln!("{}: {}", title, self.message);
            if let Some(ref help_text) = self.help {
                eprintln!("help: {}", help_text);
            }
            return;
        };

        let mut report_builder = Report::build(ReportKind::Error, filename, span.start)
            .with_message(format!("{}: {}", title.fg(color), self.message))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        // Rendering to stderr can only fail if stderr itself is gone.
        let _ = report_builder
            .finish()
            .eprint((filename, Source::from(source)));
    }
}

pub type Result<T> = std::result::Result<T, ForthError>;
