// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! [DomSink] over a [markup5ever_rcdom] tree.
//!
//! Nodes are reference-counted [Handle]s owned by their parent, which they
//! point back at weakly. Attributes are stored as html5ever attributes whose
//! qualified name carries the literal name in its local part, and are
//! renamed in place. The library has no CDATA node, so CDATA content is
//! stored as a text node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute as HtmlAttribute, LocalName, Namespace, QualName};
pub use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use super::{
    attribute_label, render_tree, DocumentType, DomSink, ToTree,
};
use crate::diagnostics::ParseError;
use crate::error::DomError;

/// An rcdom tree with its root element and parse errors.
pub struct Document {
    dom: RcDom,
    root: Option<Handle>,
    errors: Vec<ParseError>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            dom: RcDom::default(),
            root: None,
            errors: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rcdom document node.
    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn children(&self) -> Vec<Handle> {
        children(&self.dom.document)
    }

    /// The element attached with [DomSink::set_root].
    pub fn root_element(&self) -> Option<Handle> {
        self.root.clone()
    }

    pub fn internal_subset(&self) -> Option<Handle> {
        self.dom
            .document
            .children
            .borrow()
            .iter()
            .find(|node| matches!(node.data, NodeData::Doctype { .. }))
            .cloned()
    }

    /// rcdom stores absent ids as empty strings; they are absent here.
    pub fn doctype(&self) -> Option<DocumentType> {
        let subset = self.internal_subset()?;
        match &subset.data {
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                Some(DocumentType::new(
                    name,
                    non_empty(public_id),
                    non_empty(system_id),
                ))
            }
            _ => None,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_rcdom(self) -> RcDom {
        self.dom
    }
}

pub fn children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

/// The name an attribute is stored under, with its prefix if it has one.
pub fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.to_string(),
    }
}

/// The attributes of `element` as `(name, value)` pairs, in order.
pub fn attributes(element: &Handle) -> Vec<(String, String)> {
    match &element.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attribute_name(&attr.name), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn attribute(element: &Handle, name: &str) -> Option<String> {
    attributes(element)
        .into_iter()
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// The content of a text node.
pub fn text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

fn non_empty(id: &StrTendril) -> Option<&str> {
    (!id.is_empty()).then_some(&**id)
}

fn plain_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

fn doctype_node(name: &str, public_id: &str, system_id: &str) -> Handle {
    Node::new(NodeData::Doctype {
        name: StrTendril::from_slice(name),
        public_id: StrTendril::from_slice(public_id),
        system_id: StrTendril::from_slice(system_id),
    })
}

fn detach(node: &Handle) {
    let Some(parent) = parent(node) else {
        node.parent.set(None);
        return;
    };
    parent
        .children
        .borrow_mut()
        .retain(|child| !Rc::ptr_eq(child, node));
    node.parent.set(None);
}

fn append(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Put `new` where `old` is and detach `old`. Returns false if `old` has no
/// parent.
fn replace(old: &Handle, new: Handle) -> bool {
    let Some(parent) = parent(old) else {
        return false;
    };
    detach(&new);
    let mut children = parent.children.borrow_mut();
    let Some(slot) = children.iter_mut().find(|child| Rc::ptr_eq(child, old))
    else {
        return false;
    };
    new.parent.set(Some(Rc::downgrade(&parent)));
    *slot = new;
    old.parent.set(None);
    true
}

fn tree_label(node: &Handle) -> String {
    match &node.data {
        NodeData::Document => String::new(),
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            DocumentType::new(name, non_empty(public_id), non_empty(system_id))
                .tree_label()
        }
        NodeData::Element { name, attrs, .. } => {
            let mut label = name.local.to_string();
            for attr in attrs.borrow().iter() {
                let namespace = (!attr.name.ns.is_empty()).then_some(&*attr.name.ns);
                label.push_str(&attribute_label(
                    &attribute_name(&attr.name),
                    &attr.value,
                    namespace,
                ));
            }
            label
        }
        NodeData::Text { contents } => format!("{:?}", &**contents.borrow()),
        NodeData::Comment { contents } => format!("<!--{contents}-->"),
        NodeData::ProcessingInstruction { target, contents } => {
            format!("<?{target} {contents}?>")
        }
    }
}

impl ToTree for Document {
    fn to_tree(&self) -> String {
        render_tree(self.children(), tree_label, children)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("tree", &self.to_tree())
            .field("errors", &self.errors)
            .finish()
    }
}

/// Documents are equal when their trees and errors are.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.errors == other.errors && self.to_tree() == other.to_tree()
    }
}

impl DomSink for Document {
    type Node = Handle;
    type Attr = usize;

    fn new_document(
        uri: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Self, DomError> {
        let document = Self::new();
        if uri.is_some() || external_id.is_some() {
            let subset = doctype_node(
                "",
                external_id.unwrap_or_default(),
                uri.unwrap_or_default(),
            );
            append(&document.dom.document, subset);
        }
        Ok(document)
    }

    fn internal_subset(&self) -> Option<Handle> {
        Document::internal_subset(self)
    }

    fn remove_internal_subset(&mut self) {
        if let Some(subset) = Document::internal_subset(self) {
            detach(&subset);
        }
    }

    fn create_internal_subset(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Handle, DomError> {
        if Document::internal_subset(self).is_some() {
            return Err(DomError::InternalSubsetExists);
        }
        let subset = doctype_node(
            name,
            public_id.unwrap_or_default(),
            system_id.unwrap_or_default(),
        );
        subset
            .parent
            .set(Some(Rc::downgrade(&self.dom.document)));
        self.dom
            .document
            .children
            .borrow_mut()
            .insert(0, subset.clone());
        Ok(subset)
    }

    fn rename_internal_subset(&mut self, name: &str) -> Result<(), DomError> {
        let old = Document::internal_subset(self)
            .ok_or(DomError::NoInternalSubset)?;
        let NodeData::Doctype {
            public_id,
            system_id,
            ..
        } = &old.data
        else {
            return Err(DomError::NoInternalSubset);
        };
        let renamed = doctype_node(name, public_id, system_id);
        if replace(&old, renamed) {
            Ok(())
        } else {
            Err(DomError::NoInternalSubset)
        }
    }

    fn create_element(&mut self, tag_name: &str) -> Handle {
        Node::new(NodeData::Element {
            name: plain_name(tag_name),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        })
    }

    fn create_text(&mut self, content: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(content)),
        })
    }

    fn create_cdata(&mut self, content: &[u8]) -> Handle {
        self.create_text(&String::from_utf8_lossy(content))
    }

    fn create_comment(&mut self, content: &str) -> Handle {
        Node::new(NodeData::Comment {
            contents: StrTendril::from_slice(content),
        })
    }

    fn add_child(&mut self, parent: &Handle, child: Handle) {
        append(parent, child);
    }

    fn add_document_child(&mut self, child: Handle) {
        append(&self.dom.document, child);
    }

    fn set_root(&mut self, root: Handle) {
        let previous = self.root.replace(root.clone());
        let replaced = previous.is_some_and(|old| {
            !Rc::ptr_eq(&old, &root) && replace(&old, root.clone())
        });
        if !replaced {
            append(&self.dom.document, root);
        }
    }

    fn has_attribute(&self, element: &Handle, name: &str) -> bool {
        self.find_attribute(element, name).is_some()
    }

    fn set_attribute(
        &mut self,
        element: &Handle,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        if name.is_empty() {
            return Err(DomError::InvalidName(name.to_owned()));
        }
        let NodeData::Element { attrs, .. } = &element.data else {
            return Err(DomError::NotAnElement);
        };
        let mut attrs = attrs.borrow_mut();
        let value = StrTendril::from_slice(value);
        match attrs
            .iter_mut()
            .find(|attr| attribute_name(&attr.name) == name)
        {
            Some(attr) => attr.value = value,
            None => attrs.push(HtmlAttribute {
                name: plain_name(name),
                value,
            }),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, element: &Handle, name: &str) {
        if let NodeData::Element { attrs, .. } = &element.data {
            attrs
                .borrow_mut()
                .retain(|attr| attribute_name(&attr.name) != name);
        }
    }

    fn find_attribute(&self, element: &Handle, name: &str) -> Option<usize> {
        match &element.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .position(|attr| attribute_name(&attr.name) == name),
            _ => None,
        }
    }

    fn rename_attribute(
        &mut self,
        element: &Handle,
        attr: usize,
        name: &str,
    ) -> Result<(), DomError> {
        let NodeData::Element { attrs, .. } = &element.data else {
            return Err(DomError::NotAnElement);
        };
        let mut attrs = attrs.borrow_mut();
        let attr = attrs
            .get_mut(attr)
            .ok_or_else(|| DomError::MissingAttribute(name.to_owned()))?;
        attr.name = plain_name(name);
        Ok(())
    }

    fn set_errors(&mut self, errors: Vec<ParseError>) {
        self.errors = errors;
    }
}
