// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Positioned diagnostics attached to a converted document.
//!
//! Parser errors are informational: they are always collected, in the order
//! the parser reported them, and never fail a conversion. Attributes the
//! converter had to drop are appended after them as [ErrorDomain::Tree]
//! warnings.

use std::fmt;

use strum_macros::Display;
use unicode_segmentation::UnicodeSegmentation;

use crate::parse_tree::{ParseErrorKind, RawParseError};

/// Where a diagnostic came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ErrorDomain {
    /// The tokenizer or tree builder.
    Parser,
    /// The conversion into the DOM.
    Tree,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ErrorLevel {
    #[strum(serialize = "WARNING")]
    Warning,
    #[strum(serialize = "ERROR")]
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub domain: ErrorDomain,
    pub level: ErrorLevel,
    /// 1-based.
    pub line: u64,
    /// 1-based.
    pub column: u64,
    /// See [ParseErrorKind::code].
    pub code: u32,
    /// The rendered diagnostic, including a caret excerpt when the source
    /// text is known.
    pub message: String,
    pub source_label: String,
}

impl ParseError {
    pub fn kind(&self) -> Option<ParseErrorKind> {
        ParseErrorKind::from_repr(self.code)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Turns raw parser errors into [ParseError]s for one input.
pub struct ErrorCollector<'a> {
    source: Option<&'a str>,
    source_label: &'a str,
}

impl<'a> ErrorCollector<'a> {
    pub fn new(source: Option<&'a str>, source_label: &'a str) -> Self {
        Self {
            source,
            source_label,
        }
    }

    pub fn collect(&self, errors: &[RawParseError]) -> Vec<ParseError> {
        errors.iter().map(|error| self.parser_error(error)).collect()
    }

    pub fn parser_error(&self, error: &RawParseError) -> ParseError {
        self.record(
            ErrorDomain::Parser,
            ErrorLevel::Error,
            error.kind,
            &error.message,
            error.line,
            error.column,
        )
    }

    pub fn tree_warning(
        &self,
        kind: ParseErrorKind,
        message: &str,
        line: u64,
    ) -> ParseError {
        self.record(
            ErrorDomain::Tree,
            ErrorLevel::Warning,
            kind,
            message,
            line.max(1),
            1,
        )
    }

    fn record(
        &self,
        domain: ErrorDomain,
        level: ErrorLevel,
        kind: ParseErrorKind,
        message: &str,
        line: u64,
        column: u64,
    ) -> ParseError {
        ParseError {
            domain,
            level,
            line,
            column,
            code: kind.code(),
            message: self.render(level, message, line, column),
            source_label: self.source_label.to_owned(),
        }
    }

    /// Render `label:line:column: LEVEL: message`, followed by the source
    /// line and a caret under the column when the line is available.
    fn render(
        &self,
        level: ErrorLevel,
        message: &str,
        line: u64,
        column: u64,
    ) -> String {
        let mut rendered = if self.source_label.is_empty() {
            format!("{line}:{column}: {level}: {message}")
        } else {
            format!("{}:{line}:{column}: {level}: {message}", self.source_label)
        };

        let source_line = usize::try_from(line)
            .ok()
            .and_then(|line| line.checked_sub(1))
            .and_then(|index| self.source?.lines().nth(index));
        if let Some(text) = source_line {
            let skip = usize::try_from(column.saturating_sub(1)).unwrap_or(0);
            // Keep tabs so the caret lines up however the excerpt is shown.
            let padding: String = text
                .graphemes(true)
                .take(skip)
                .map(|g| if g == "\t" { '\t' } else { ' ' })
                .collect();
            rendered.push('\n');
            rendered.push_str(text);
            rendered.push('\n');
            rendered.push_str(&padding);
            rendered.push('^');
        }
        rendered
    }
}
