// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The immutable result of HTML5 parsing.
//!
//! A [ParseTree] owns every node in one list and parents refer to their
//! children by [ParseHandle]. It is produced either by [parse_html] (which
//! drives html5ever through [TreeCreator]) or assembled by hand with
//! [ParseTree::add_node] and [ParseTree::append]. The converter only ever
//! reads it.

mod tree_creator;

pub use tree_creator::{parse_html, TreeCreator};

use strum_macros::{EnumIter, FromRepr};

use crate::error::ParseTreeError;

pub(crate) const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub(crate) const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParseHandle(pub(crate) usize);

impl ParseHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The namespace an attribute was tagged with by the tree builder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttributeNamespace {
    #[default]
    None,
    XLink,
    Xml,
    Xmlns,
}

impl AttributeNamespace {
    /// Map a namespace URI as reported by html5ever. Anything other than the
    /// three adjusted foreign-attribute namespaces counts as no namespace.
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            XLINK_NAMESPACE => Self::XLink,
            XML_NAMESPACE => Self::Xml,
            XMLNS_NAMESPACE => Self::Xmlns,
            _ => Self::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub namespace: AttributeNamespace,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self::with_namespace(name, value, AttributeNamespace::None)
    }

    pub fn with_namespace(
        name: &str,
        value: &str,
        namespace: AttributeNamespace,
    ) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            namespace,
        }
    }
}

/// Document metadata plus the top-level children.
///
/// Empty identifier strings mean "absent", matching what the tree builder
/// reports for `<!DOCTYPE html>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentNode {
    pub has_doctype: bool,
    pub name: String,
    pub public_identifier: String,
    pub system_identifier: String,
    pub children: Vec<ParseHandle>,
    pub root: Option<ParseHandle>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementNode {
    pub tag_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<ParseHandle>,
    /// 1-based line the start tag was seen on, 0 if unknown.
    pub line: u64,
}

impl ElementNode {
    pub fn new(tag_name: &str, attributes: Vec<Attribute>) -> Self {
        Self {
            tag_name: tag_name.to_owned(),
            attributes,
            children: Vec::new(),
            line: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseNode {
    Document(DocumentNode),
    Element(ElementNode),
    Template(ElementNode),
    Text(String),
    Whitespace(String),
    /// CDATA content. The length is carried by the vector itself, so
    /// embedded zero bytes survive.
    Cdata(Vec<u8>),
    Comment(String),
}

impl ParseNode {
    pub fn element(tag_name: &str, attributes: Vec<Attribute>) -> Self {
        Self::Element(ElementNode::new(tag_name, attributes))
    }

    pub fn template(attributes: Vec<Attribute>) -> Self {
        Self::Template(ElementNode::new("template", attributes))
    }

    /// A text node, classified as whitespace when it holds nothing else.
    pub fn text(content: &str) -> Self {
        if !content.is_empty() && content.chars().all(is_html_whitespace) {
            Self::Whitespace(content.to_owned())
        } else {
            Self::Text(content.to_owned())
        }
    }

    pub fn cdata(content: &[u8]) -> Self {
        Self::Cdata(content.to_vec())
    }

    pub fn comment(content: &str) -> Self {
        Self::Comment(content.to_owned())
    }

    pub fn children(&self) -> &[ParseHandle] {
        match self {
            Self::Document(doc) => &doc.children,
            Self::Element(element) | Self::Template(element) => {
                &element.children
            }
            Self::Text(_)
            | Self::Whitespace(_)
            | Self::Cdata(_)
            | Self::Comment(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<ParseHandle>> {
        match self {
            Self::Document(doc) => Some(&mut doc.children),
            Self::Element(element) | Self::Template(element) => {
                Some(&mut element.children)
            }
            Self::Text(_)
            | Self::Whitespace(_)
            | Self::Cdata(_)
            | Self::Comment(_) => None,
        }
    }
}

pub(crate) fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0C}' | '\r')
}

/// The kind of a parse error, whose discriminant is the numeric error code
/// reported on [crate::ParseError::code].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(u32)]
pub enum ParseErrorKind {
    Other = 1,
    UnexpectedToken = 2,
    UnexpectedEof = 3,
    BadCharacter = 4,
    BadDoctype = 5,
    /// Not produced by the parser: an attribute the converter had to drop.
    AttributeNamespaceConflict = 100,
}

impl ParseErrorKind {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Best-effort classification of html5ever's free-form messages.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("doctype") {
            Self::BadDoctype
        } else if lower.contains("eof") {
            Self::UnexpectedEof
        } else if lower.contains("unexpected token")
            || lower.contains("unexpected open tag")
            || lower.contains("unexpected end tag")
        {
            Self::UnexpectedToken
        } else if lower.contains("character") {
            Self::BadCharacter
        } else {
            Self::Other
        }
    }
}

/// A parse error as produced by the tree builder, before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// 1-based.
    pub line: u64,
    /// 1-based.
    pub column: u64,
}

impl RawParseError {
    pub fn new(message: &str, line: u64, column: u64) -> Self {
        Self {
            kind: ParseErrorKind::classify(message),
            message: message.to_owned(),
            line: line.max(1),
            column: column.max(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    parents: Vec<Option<ParseHandle>>,
    errors: Vec<RawParseError>,
    source: Option<String>,
}

impl Default for ParseTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ParseNode::Document(DocumentNode::default())],
            parents: vec![None],
            errors: Vec::new(),
            source: None,
        }
    }

    pub fn document_handle(&self) -> ParseHandle {
        ParseHandle(0)
    }

    pub fn document(&self) -> &DocumentNode {
        match &self.nodes[0] {
            ParseNode::Document(doc) => doc,
            _ => unreachable!("The first node is always the document"),
        }
    }

    fn document_mut(&mut self) -> &mut DocumentNode {
        match &mut self.nodes[0] {
            ParseNode::Document(doc) => doc,
            _ => unreachable!("The first node is always the document"),
        }
    }

    pub fn get_node(
        &self,
        handle: ParseHandle,
    ) -> Result<&ParseNode, ParseTreeError> {
        self.nodes
            .get(handle.0)
            .ok_or(ParseTreeError::UnknownHandle(handle))
    }

    /// Empty for leaves and for handles from another tree.
    pub fn children(&self, handle: ParseHandle) -> &[ParseHandle] {
        match self.get_node(handle) {
            Ok(node) => node.children(),
            Err(_) => &[],
        }
    }

    pub fn parent(&self, handle: ParseHandle) -> Option<ParseHandle> {
        self.parents.get(handle.0).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document().children.is_empty()
    }

    /// Add a detached node and return its handle.
    pub fn add_node(&mut self, node: ParseNode) -> ParseHandle {
        self.nodes.push(node);
        self.parents.push(None);
        ParseHandle(self.nodes.len() - 1)
    }

    pub fn append(
        &mut self,
        parent: ParseHandle,
        child: ParseHandle,
    ) -> Result<(), ParseTreeError> {
        let attached = self
            .parents
            .get(child.0)
            .ok_or(ParseTreeError::UnknownHandle(child))?
            .is_some();
        if attached || child == self.document_handle() {
            return Err(ParseTreeError::AlreadyAttached(child));
        }
        let container = self
            .nodes
            .get_mut(parent.0)
            .ok_or(ParseTreeError::UnknownHandle(parent))?;
        if container.children_mut().is_none() {
            return Err(ParseTreeError::NotAContainer(parent));
        }
        self.attach(parent, child);
        Ok(())
    }

    /// Append without validation. Leaves are silently left childless.
    pub(crate) fn attach(&mut self, parent: ParseHandle, child: ParseHandle) {
        if let Some(children) = self.nodes[parent.0].children_mut() {
            children.push(child);
            self.parents[child.0] = Some(parent);
        }
    }

    pub fn append_to_document(
        &mut self,
        child: ParseHandle,
    ) -> Result<(), ParseTreeError> {
        self.append(self.document_handle(), child)
    }

    pub fn set_doctype(&mut self, name: &str, public_id: &str, system_id: &str) {
        let doc = self.document_mut();
        doc.has_doctype = true;
        doc.name = name.to_owned();
        doc.public_identifier = public_id.to_owned();
        doc.system_identifier = system_id.to_owned();
    }

    pub fn root(&self) -> Option<ParseHandle> {
        self.document().root
    }

    /// Designate one of the document's children as the root element.
    pub fn set_root(&mut self, root: ParseHandle) -> Result<(), ParseTreeError> {
        if self.parent(root) != Some(self.document_handle()) {
            return Err(ParseTreeError::NotADocumentChild(root));
        }
        self.set_root_unchecked(root);
        Ok(())
    }

    pub(crate) fn set_root_unchecked(&mut self, root: ParseHandle) {
        self.document_mut().root = Some(root);
    }

    pub fn errors(&self) -> &[RawParseError] {
        &self.errors
    }

    pub fn push_error(&mut self, error: RawParseError) {
        self.errors.push(error);
    }

    /// The HTML text this tree was parsed from, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_owned());
    }
}
