// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! HTML5 parsing into an XML-style DOM.
//!
//! Input is parsed with html5ever into an immutable [ParseTree], which is
//! then converted into a document of one of the [dom] libraries. The
//! conversion keeps the literal qualified names of namespaced attributes
//! (`xlink:href`, `xml:lang`), keeps the doctype exactly as written and
//! attaches the parser's diagnostics to the document.
//!
//! ```
//! use html5dom::dom::ToTree;
//!
//! let document = html5dom::parse("<!DOCTYPE html><p>Hi").unwrap();
//! assert!(document.errors().is_empty());
//! assert!(document.to_tree().contains("└>\"Hi\""));
//! ```

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod parse_tree;

pub use crate::config::ParseOptions;
pub use crate::convert::convert;
pub use crate::diagnostics::{ErrorDomain, ErrorLevel, ParseError};
pub use crate::dom::{Document, DomSink, ToTree};
pub use crate::error::{ConvertError, DomError, ParseTreeError};
pub use crate::parse_tree::{
    parse_html, Attribute, AttributeNamespace, ParseErrorKind, ParseHandle,
    ParseNode, ParseTree,
};

/// Parse `html` into the default [Document] using the process-wide
/// [config::defaults].
pub fn parse(html: &str) -> Result<Document, ConvertError> {
    parse_with_options(html, config::defaults())
}

pub fn parse_with_options(
    html: &str,
    options: &ParseOptions,
) -> Result<Document, ConvertError> {
    parse_into(html, options)
}

/// Parse `html` into any DOM library.
pub fn parse_into<D: DomSink>(
    html: &str,
    options: &ParseOptions,
) -> Result<D, ConvertError> {
    let tree = parse_html(html, options);
    convert(&tree, options)
}
