use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};
use std::fmt;
use std::io::{self, Write};

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseError,
    RuntimeError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonkeyError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl MonkeyError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn parse_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ParseError, span, message)
    }

    pub fn runtime_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::RuntimeError, span, message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        if let Err(error) = self.write_report(source, filename, true, io::stderr()) {
            tracing::warn!(%error, "failed to render diagnostic");
            eprintln!("{}", self);
        }
    }

    /// Renders the ariadne report into `out`.
    pub fn write_report<W: Write>(
        &self,
        source: &str,
        filename: Option<&str>,
        colored: bool,
        out: W,
    ) -> io::Result<()> {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::ParseError => Color::Yellow,
            ErrorKind::RuntimeError => Color::Magenta,
        };

        let kind_str = match self.kind {
            ErrorKind::ParseError => "Parse Error",
            ErrorKind::RuntimeError => "Runtime Error",
        };

        // Keep the label inside the source
        let end = self.span.end.min(source.len()).max(self.span.start);
        let start = self.span.start.min(end);

        // Spans are byte offsets; ariadne counts chars unless told otherwise.
        let config = Config::default()
            .with_index_type(IndexType::Byte)
            .with_color(colored);

        let paint = |text: &str, color: Color| {
            if colored {
                text.fg(color).to_string()
            } else {
                text.to_string()
            }
        };

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_config(config)
            .with_message(format!("{}: {}", paint(kind_str, color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder = report_builder
                .with_note(format!("{}: {}", paint("help", Color::Cyan), help_text));
        }

        report_builder
            .finish()
            .write((filename, Source::from(source)), out)
    }
}

impl fmt::Display for MonkeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MonkeyError {}
