// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use thiserror::Error;

use crate::parse_tree::ParseHandle;

/// Failure of a whole conversion call, or of one attribute inside it.
///
/// Only [ConvertError::MalformedDoctype] and [ConvertError::ParseTree] are
/// ever returned from [crate::convert()]. Attribute conflicts are recorded
/// on the document's error list and the attribute is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Malformed doctype: {0}")]
    MalformedDoctype(String),
    #[error(
        "No free placeholder name left to set attribute `{name}` without namespace interpretation"
    )]
    AttributeNamespaceConflict { name: String },
    #[error("Could not set attribute `{name}`: {source}")]
    Attribute {
        name: String,
        #[source]
        source: DomError,
    },
    #[error(transparent)]
    ParseTree(#[from] ParseTreeError),
}

/// Errors raised by the DOM libraries behind [crate::dom::DomSink].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("The document already has an internal subset")]
    InternalSubsetExists,
    #[error("The document has no internal subset")]
    NoInternalSubset,
    #[error("`{0}` is not a valid attribute name")]
    InvalidName(String),
    #[error("Attribute `{0}` was not found")]
    MissingAttribute(String),
    #[error("Node is not an element")]
    NotAnElement,
}

/// Errors raised while assembling a [crate::parse_tree::ParseTree] by hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTreeError {
    #[error("Node {0:?} cannot have children")]
    NotAContainer(ParseHandle),
    #[error("Node {0:?} already has a parent")]
    AlreadyAttached(ParseHandle),
    #[error("Node {0:?} is not a direct child of the document")]
    NotADocumentChild(ParseHandle),
    #[error("Node {0:?} does not belong to this tree")]
    UnknownHandle(ParseHandle),
}
