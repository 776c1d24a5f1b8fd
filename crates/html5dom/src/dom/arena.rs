// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! [DomSink] over an [xmloxide] document.
//!
//! All nodes live in the xmloxide arena and are addressed by [NodeId]. The
//! wrapper keeps track of the root element it was given, so document-level
//! elements next to the root are never mistaken for it.

use std::ops::Deref;

use xmloxide::tree::NodeKind;
pub use xmloxide::{Attribute, NodeId};

use super::{
    attribute_label, cdata_label, render_tree, DocumentType, DomSink, ToTree,
};
use crate::diagnostics::ParseError;
use crate::error::DomError;

/// An xmloxide document with its root element and parse errors.
///
/// Read access goes through [Deref] to [xmloxide::Document].
#[derive(Debug, Default)]
pub struct Document {
    inner: xmloxide::Document,
    root: Option<NodeId>,
    errors: Vec<ParseError>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The element attached with [DomSink::set_root].
    pub fn root_element(&self) -> Option<NodeId> {
        self.root
    }

    pub fn cdata_content(&self, id: NodeId) -> Option<&str> {
        match &self.inner.node(id).kind {
            NodeKind::CData { content } => Some(content),
            _ => None,
        }
    }

    pub fn internal_subset(&self) -> Option<NodeId> {
        self.inner.children(self.inner.root()).find(|&id| {
            matches!(self.inner.node(id).kind, NodeKind::DocumentType { .. })
        })
    }

    pub fn doctype(&self) -> Option<DocumentType> {
        match &self.inner.node(self.internal_subset()?).kind {
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
                ..
            } => Some(DocumentType::new(
                name,
                public_id.as_deref(),
                system_id.as_deref(),
            )),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_inner(self) -> xmloxide::Document {
        self.inner
    }

    fn doctype_node(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> NodeId {
        self.inner.create_node(NodeKind::DocumentType {
            name: name.to_owned(),
            system_id: system_id.map(str::to_owned),
            public_id: public_id.map(str::to_owned),
            internal_subset: None,
        })
    }

    fn tree_label(&self, id: NodeId) -> String {
        match &self.inner.node(id).kind {
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
                ..
            } => DocumentType::new(
                name,
                public_id.as_deref(),
                system_id.as_deref(),
            )
            .tree_label(),
            NodeKind::Element {
                name, attributes, ..
            } => {
                let mut label = name.clone();
                for attr in attributes {
                    label.push_str(&attribute_label(
                        &qualified_name(attr),
                        &attr.value,
                        attr.namespace.as_deref(),
                    ));
                }
                label
            }
            NodeKind::Text { content } => format!("{content:?}"),
            NodeKind::CData { content } => cdata_label(content.as_bytes()),
            NodeKind::Comment { content } => format!("<!--{content}-->"),
            NodeKind::ProcessingInstruction { target, data } => {
                format!("<?{target} {}?>", data.as_deref().unwrap_or_default())
            }
            NodeKind::EntityRef { name, .. } => format!("&{name};"),
            NodeKind::Document => String::new(),
        }
    }
}

impl Deref for Document {
    type Target = xmloxide::Document;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// `prefix:name` for attributes xmloxide parsed with a prefix, the name
/// alone otherwise.
pub fn qualified_name(attr: &Attribute) -> String {
    match &attr.prefix {
        Some(prefix) => format!("{prefix}:{}", attr.name),
        None => attr.name.clone(),
    }
}

impl ToTree for Document {
    fn to_tree(&self) -> String {
        render_tree(
            self.inner.children(self.inner.root()).collect(),
            |&id| self.tree_label(id),
            |&id| self.inner.children(id).collect(),
        )
    }
}

/// Documents are equal when their reachable trees and errors are.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.errors == other.errors && self.to_tree() == other.to_tree()
    }
}

impl DomSink for Document {
    type Node = NodeId;
    type Attr = usize;

    fn new_document(
        uri: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Self, DomError> {
        let mut document = Self::new();
        if uri.is_some() || external_id.is_some() {
            let subset = document.doctype_node("", external_id, uri);
            let root = document.inner.root();
            document.inner.append_child(root, subset);
        }
        Ok(document)
    }

    fn internal_subset(&self) -> Option<NodeId> {
        Document::internal_subset(self)
    }

    fn remove_internal_subset(&mut self) {
        if let Some(subset) = Document::internal_subset(self) {
            self.inner.detach(subset);
        }
    }

    fn create_internal_subset(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<NodeId, DomError> {
        if Document::internal_subset(self).is_some() {
            return Err(DomError::InternalSubsetExists);
        }
        let subset = self.doctype_node(name, public_id, system_id);
        let root = self.inner.root();
        self.inner.prepend_child(root, subset);
        Ok(subset)
    }

    fn rename_internal_subset(&mut self, name: &str) -> Result<(), DomError> {
        let old = Document::internal_subset(self)
            .ok_or(DomError::NoInternalSubset)?;
        let (public_id, system_id) = match &self.inner.node(old).kind {
            NodeKind::DocumentType {
                public_id,
                system_id,
                ..
            } => (public_id.clone(), system_id.clone()),
            _ => return Err(DomError::NoInternalSubset),
        };
        let renamed =
            self.doctype_node(name, public_id.as_deref(), system_id.as_deref());
        self.inner.replace_node(old, renamed);
        Ok(())
    }

    fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.inner.create_element(tag_name)
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        self.inner.create_text(content)
    }

    fn create_cdata(&mut self, content: &[u8]) -> NodeId {
        self.inner.create_node(NodeKind::CData {
            content: String::from_utf8_lossy(content).into_owned(),
        })
    }

    fn create_comment(&mut self, content: &str) -> NodeId {
        self.inner.create_comment(content)
    }

    fn add_child(&mut self, parent: &NodeId, child: NodeId) {
        self.inner.detach(child);
        self.inner.append_child(*parent, child);
    }

    fn add_document_child(&mut self, child: NodeId) {
        let root = self.inner.root();
        self.add_child(&root, child);
    }

    fn set_root(&mut self, root: NodeId) {
        self.inner.detach(root);
        match self.root.replace(root) {
            Some(old) if self.inner.parent(old).is_some() => {
                self.inner.replace_node(old, root);
            }
            _ => self.add_document_child(root),
        }
    }

    fn has_attribute(&self, element: &NodeId, name: &str) -> bool {
        self.inner.attribute(*element, name).is_some()
    }

    fn set_attribute(
        &mut self,
        element: &NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        if name.is_empty() {
            return Err(DomError::InvalidName(name.to_owned()));
        }
        if self.inner.set_attribute(*element, name, value) {
            Ok(())
        } else {
            Err(DomError::NotAnElement)
        }
    }

    fn remove_attribute(&mut self, element: &NodeId, name: &str) {
        self.inner.remove_attribute(*element, name);
    }

    fn find_attribute(&self, element: &NodeId, name: &str) -> Option<usize> {
        self.inner
            .attributes(*element)
            .iter()
            .position(|attr| attr.name == name)
    }

    /// xmloxide has no in-place rename, so the attribute and every one
    /// after it are removed and set again in their original order.
    fn rename_attribute(
        &mut self,
        element: &NodeId,
        attr: usize,
        name: &str,
    ) -> Result<(), DomError> {
        let tail = self
            .inner
            .attributes(*element)
            .get(attr..)
            .filter(|tail| !tail.is_empty())
            .map(<[Attribute]>::to_vec)
            .ok_or_else(|| DomError::MissingAttribute(name.to_owned()))?;
        for old in &tail {
            self.inner.remove_attribute(*element, &old.name);
        }
        self.set_attribute(element, name, &tail[0].value)?;
        for old in &tail[1..] {
            self.set_attribute(element, &old.name, &old.value)?;
        }
        Ok(())
    }

    fn set_errors(&mut self, errors: Vec<ParseError>) {
        self.errors = errors;
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;

    fn names(document: &Document, element: NodeId) -> Vec<&str> {
        document
            .attributes(element)
            .iter()
            .map(|attr| attr.name.as_str())
            .collect()
    }

    #[test]
    fn new_documents_without_ids_have_no_subset() {
        let document = Document::new_document(None, None).unwrap();
        assert_that!(document.doctype()).is_none();
        assert_eq!(document.children(document.root()).count(), 0);
    }

    #[test]
    fn new_documents_put_the_uri_in_the_system_id() {
        let document =
            Document::new_document(Some("about:legacy-compat"), Some("-//X"))
                .unwrap();
        assert_that!(document.doctype())
            .is_some()
            .is_equal_to(DocumentType::new(
                "",
                Some("-//X"),
                Some("about:legacy-compat"),
            ));
    }

    #[test]
    fn a_second_internal_subset_is_refused() {
        let mut document = Document::new();
        assert_that!(document.create_internal_subset("html", None, None))
            .is_ok();
        assert_eq!(
            document.create_internal_subset("html", None, None),
            Err(DomError::InternalSubsetExists)
        );
    }

    #[test]
    fn renaming_the_subset_keeps_its_ids_and_position() {
        let mut document =
            Document::new_document(Some("urn:s"), None).unwrap();
        let comment = document.create_comment("after");
        document.add_document_child(comment);
        document.rename_internal_subset("svg").unwrap();
        assert_eq!(
            document.doctype(),
            Some(DocumentType::new("svg", None, Some("urn:s")))
        );
        let first = document.first_child(document.root()).unwrap();
        assert_eq!(Some(first), document.internal_subset());
        assert_eq!(document.next_sibling(first), Some(comment));
    }

    #[test]
    fn renaming_without_a_subset_fails() {
        let mut document = Document::new();
        assert_eq!(
            document.rename_internal_subset("html"),
            Err(DomError::NoInternalSubset)
        );
    }

    #[test]
    fn set_root_replaces_only_the_previous_root() {
        let mut document = Document::new();
        let stray = document.create_element("stray");
        let first = document.create_element("first");
        let second = document.create_element("second");
        document.add_document_child(stray);
        document.set_root(first);
        document.set_root(second);

        let children: Vec<_> = document.children(document.root()).collect();
        assert_eq!(children, [stray, second]);
        assert_eq!(document.root_element(), Some(second));
        assert_eq!(document.parent(first), None);
    }

    #[test]
    fn the_generic_setter_stores_names_as_written() {
        let mut document = Document::new();
        let el = document.create_element("svg");
        document.set_attribute(&el, "class", "a").unwrap();
        document.set_attribute(&el, "xml:lang", "en").unwrap();
        document.set_attribute(&el, "class", "b").unwrap();
        assert_eq!(names(&document, el), ["class", "xml:lang"]);
        assert_eq!(document.attribute(el, "class"), Some("b"));
        assert!(document.attributes(el).iter().all(|a| a.prefix.is_none()));
    }

    #[test]
    fn renaming_an_attribute_keeps_the_order() {
        let mut document = Document::new();
        let el = document.create_element("svg");
        for name in ["x", "a", "y"] {
            document.set_attribute(&el, name, name).unwrap();
        }
        let a = document.find_attribute(&el, "a").unwrap();
        document.rename_attribute(&el, a, "xlink:href").unwrap();
        assert_eq!(names(&document, el), ["x", "xlink:href", "y"]);
        assert_eq!(document.attribute(el, "xlink:href"), Some("a"));
        assert_eq!(document.attribute(el, "y"), Some("y"));
    }

    #[test]
    fn renaming_a_missing_attribute_fails() {
        let mut document = Document::new();
        let el = document.create_element("p");
        assert_eq!(
            document.rename_attribute(&el, 0, "xml:lang"),
            Err(DomError::MissingAttribute("xml:lang".to_owned()))
        );
    }

    #[test]
    fn attributes_on_non_elements_are_refused() {
        let mut document = Document::new();
        let text = document.create_text("t");
        assert_eq!(
            document.set_attribute(&text, "class", "x"),
            Err(DomError::NotAnElement)
        );
    }

    #[test]
    fn cdata_keeps_zero_bytes() {
        let mut document = Document::new();
        let cdata = document.create_cdata(b"a\0b");
        assert_eq!(document.cdata_content(cdata), Some("a\0b"));
    }

    #[test]
    fn dumps_the_tree() {
        let mut document = Document::new();
        document.create_internal_subset("html", None, None).unwrap();
        let html = document.create_element("html");
        let p = document.create_element("p");
        let text = document.create_text("hi");
        document.set_attribute(&p, "class", "c").unwrap();
        document.add_child(&p, text);
        document.add_child(&html, p);
        document.set_root(html);
        let comment = document.create_comment("end");
        document.add_document_child(comment);

        assert_eq!(
            document.to_tree(),
            indoc! {r#"

                ├><!DOCTYPE html>
                ├>html
                │ └>p class="c"
                │   └>"hi"
                └><!--end-->
            "#}
        );
    }

    #[test]
    fn equality_compares_trees_and_errors() {
        let build = || {
            let mut document = Document::new();
            let html = document.create_element("html");
            document.set_root(html);
            document
        };
        let (mut a, b) = (build(), build());
        assert_eq!(a, b);
        let root = a.root_element().unwrap();
        a.set_attribute(&root, "lang", "en").unwrap();
        assert_ne!(a, b);
    }
}
