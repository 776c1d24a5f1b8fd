// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The DOM libraries a [crate::parse_tree::ParseTree] is converted into.
//!
//! [arena::Document] wraps an [xmloxide] document and [object::Document]
//! wraps a [markup5ever_rcdom] node tree. [DomSink] exposes only the
//! primitives the converter needs. Its generic attribute setter may read a
//! `prefix:local` name as namespaced, so the converter never passes it a
//! name with a colon.

pub mod arena;
pub mod object;

use crate::diagnostics::ParseError;
use crate::error::DomError;

cfg_if::cfg_if! {
    if #[cfg(feature = "arena-dom")] {
        /// The DOM library [crate::parse()] produces.
        pub type Document = arena::Document;
    } else if #[cfg(feature = "object-dom")] {
        /// The DOM library [crate::parse()] produces.
        pub type Document = object::Document;
    } else {
        compile_error!("One of the `arena-dom` or `object-dom` features must be enabled.");
    }
}

/// A document type declaration as stored in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentType {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl DocumentType {
    pub fn new(
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            public_id: public_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
        }
    }

    fn tree_label(&self) -> String {
        let mut label = format!("<!DOCTYPE {}", self.name);
        if let Some(public_id) = &self.public_id {
            label.push_str(&format!(" PUBLIC \"{public_id}\""));
        }
        if let Some(system_id) = &self.system_id {
            label.push_str(&format!(" SYSTEM \"{system_id}\""));
        }
        label.push('>');
        label
    }
}

/// The primitives needed to build a document from a parse tree.
///
/// The implementing type is the document under construction, so one sink
/// is one output document and is never shared between conversions.
pub trait DomSink: Sized {
    type Node: Clone;
    type Attr;

    /// Create a document. When either id is given the document starts with
    /// an internal subset carrying them and an empty name: `uri` becomes its
    /// system id and `external_id` its public id.
    fn new_document(
        uri: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Self, DomError>;

    fn internal_subset(&self) -> Option<Self::Node>;

    fn remove_internal_subset(&mut self);

    /// Fails with [DomError::InternalSubsetExists] if one is present.
    fn create_internal_subset(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Self::Node, DomError>;

    /// Fails with [DomError::NoInternalSubset] if there is none.
    fn rename_internal_subset(&mut self, name: &str) -> Result<(), DomError>;

    fn create_element(&mut self, tag_name: &str) -> Self::Node;

    fn create_text(&mut self, content: &str) -> Self::Node;

    fn create_cdata(&mut self, content: &[u8]) -> Self::Node;

    fn create_comment(&mut self, content: &str) -> Self::Node;

    fn add_child(&mut self, parent: &Self::Node, child: Self::Node);

    fn add_document_child(&mut self, child: Self::Node);

    /// Attach the root element, replacing the one set by an earlier call.
    /// Other document children are left in place.
    fn set_root(&mut self, root: Self::Node);

    /// Whether an attribute literally named `name` exists.
    fn has_attribute(&self, element: &Self::Node, name: &str) -> bool;

    /// The generic attribute setter. Names containing a colon may be read
    /// as namespaced, so callers only pass names without one.
    fn set_attribute(
        &mut self,
        element: &Self::Node,
        name: &str,
        value: &str,
    ) -> Result<(), DomError>;

    /// Remove the attribute literally named `name`, if any.
    fn remove_attribute(&mut self, element: &Self::Node, name: &str);

    /// The attribute literally named `name`, for [DomSink::rename_attribute].
    fn find_attribute(
        &self,
        element: &Self::Node,
        name: &str,
    ) -> Option<Self::Attr>;

    /// Rename in place, taking `name` literally.
    fn rename_attribute(
        &mut self,
        element: &Self::Node,
        attr: Self::Attr,
        name: &str,
    ) -> Result<(), DomError>;

    fn set_errors(&mut self, errors: Vec<ParseError>);
}

/// Render a document as an indented tree, one node per line.
pub trait ToTree {
    fn to_tree(&self) -> String;
}

pub(crate) fn attribute_label(
    name: &str,
    value: &str,
    namespace: Option<&str>,
) -> String {
    match namespace {
        Some(namespace) => format!(" {{{namespace}}}{name}={value:?}"),
        None => format!(" {name}={value:?}"),
    }
}

pub(crate) fn cdata_label(content: &[u8]) -> String {
    format!("<![CDATA[{:?}]]>", String::from_utf8_lossy(content))
}

/// Shared renderer behind [ToTree]: walks with an explicit stack so deep
/// documents can be dumped too.
pub(crate) fn render_tree<N>(
    roots: Vec<N>,
    label: impl Fn(&N) -> String,
    children: impl Fn(&N) -> Vec<N>,
) -> String {
    let mut out = String::from("\n");
    let count = roots.len();
    let mut stack: Vec<(N, String, bool)> = roots
        .into_iter()
        .enumerate()
        .map(|(i, node)| (node, String::new(), i + 1 == count))
        .collect();
    stack.reverse();

    while let Some((node, prefix, last)) = stack.pop() {
        out.push_str(&prefix);
        out.push_str(if last { "└>" } else { "├>" });
        out.push_str(&label(&node));
        out.push('\n');

        let child_prefix = format!("{prefix}{}", if last { "  " } else { "│ " });
        let kids = children(&node);
        let count = kids.len();
        for (i, kid) in kids.into_iter().enumerate().rev() {
            stack.push((kid, child_prefix.clone(), i + 1 == count));
        }
    }
    out
}
