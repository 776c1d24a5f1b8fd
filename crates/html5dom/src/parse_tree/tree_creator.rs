// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::{
    ElementFlags, NodeOrText, QuirksMode, TreeBuilderOpts, TreeSink,
};
use html5ever::{parse_document, Attribute as HtmlAttribute, ParseOpts, QualName};

use super::{
    Attribute, AttributeNamespace, ElementNode, ParseHandle, ParseNode,
    ParseTree, RawParseError,
};
use crate::config::ParseOptions;

/// Parse a whole HTML document into a [ParseTree].
///
/// The returned tree keeps a copy of `html` so that parse errors can later
/// be rendered with an excerpt of the offending line.
pub fn parse_html(html: &str, options: &ParseOptions) -> ParseTree {
    let opts = ParseOpts {
        tokenizer: TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
        tree_builder: TreeBuilderOpts {
            exact_errors: true,
            ..Default::default()
        },
    };
    let mut tree = parse_document(TreeCreator::new(options.max_errors), opts)
        .from_utf8()
        .one(html.as_bytes());
    tree.set_source(html);
    tree
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CreatorHandle(usize);

#[derive(Clone, Debug)]
enum CreatorNode {
    Document,
    Element {
        name: QualName,
        attrs: Vec<HtmlAttribute>,
        template: bool,
        mathml_annotation_xml_integration_point: bool,
        line: u64,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct CreatorData {
    node: CreatorNode,
    parent: Option<usize>,
    children: Vec<usize>,
}

struct Doctype {
    name: String,
    public_id: String,
    system_id: String,
}

struct CreatorState {
    nodes: Vec<CreatorData>,
    doctype: Option<Doctype>,
    errors: Vec<RawParseError>,
    max_errors: Option<usize>,
    current_line: u64,
}

impl CreatorState {
    fn add_node(&mut self, node: CreatorNode) -> CreatorHandle {
        self.nodes.push(CreatorData {
            node,
            parent: None,
            children: Vec::new(),
        });
        CreatorHandle(self.nodes.len() - 1)
    }

    fn element_name(&self, handle: &CreatorHandle) -> &QualName {
        match &self.nodes[handle.0].node {
            CreatorNode::Element { name, .. } => name,
            _ => panic!("Asked for the name of a non-element: {handle:?}"),
        }
    }

    fn detach(&mut self, child: usize) {
        if let Some(parent) = self.nodes[child].parent.take() {
            self.nodes[parent].children.retain(|&c| c != child);
        }
    }

    fn insert(&mut self, parent: usize, position: usize, child: usize) {
        self.detach(child);
        self.nodes[parent].children.insert(position, child);
        self.nodes[child].parent = Some(parent);
    }

    /// Append text to the child at `position - 1` if it is text, otherwise
    /// insert a new text node at `position`.
    fn insert_text(&mut self, parent: usize, position: usize, text: &str) {
        if position > 0 {
            let previous = self.nodes[parent].children[position - 1];
            if let CreatorNode::Text(content) = &mut self.nodes[previous].node
            {
                content.push_str(text);
                return;
            }
        }
        let new_handle = self.add_node(CreatorNode::Text(text.to_owned()));
        self.insert(parent, position, new_handle.0);
    }

    fn insert_node_or_text(
        &mut self,
        parent: usize,
        position: usize,
        child: NodeOrText<CreatorHandle>,
    ) {
        match child {
            NodeOrText::AppendNode(node) => self.insert(parent, position, node.0),
            NodeOrText::AppendText(tendril) => {
                self.insert_text(parent, position, &tendril)
            }
        }
    }

    fn position_in_parent(&self, child: usize) -> Option<(usize, usize)> {
        let parent = self.nodes[child].parent?;
        let position =
            self.nodes[parent].children.iter().position(|&c| c == child)?;
        Some((parent, position))
    }

    fn freeze_node(&self, index: usize) -> ParseNode {
        match &self.nodes[index].node {
            CreatorNode::Document => {
                unreachable!("The document is never a child")
            }
            CreatorNode::Element {
                name,
                attrs,
                template,
                line,
                ..
            } => {
                let mut element = ElementNode::new(
                    name.local.as_ref(),
                    attrs.iter().map(freeze_attribute).collect(),
                );
                element.line = *line;
                if *template {
                    ParseNode::Template(element)
                } else {
                    ParseNode::Element(element)
                }
            }
            CreatorNode::Text(content) => ParseNode::text(content),
            CreatorNode::Comment(content) => ParseNode::comment(content),
        }
    }

    /// Copy every node reachable from the document into a [ParseTree].
    ///
    /// Nodes created during parsing and later dropped by the tree builder
    /// are left behind.
    fn freeze(self) -> ParseTree {
        let mut tree = ParseTree::new();
        if let Some(doctype) = &self.doctype {
            tree.set_doctype(
                &doctype.name,
                &doctype.public_id,
                &doctype.system_id,
            );
        }

        let document = tree.document_handle();
        let mut stack: Vec<(usize, ParseHandle)> = self.nodes[0]
            .children
            .iter()
            .rev()
            .map(|&child| (child, document))
            .collect();

        while let Some((index, parent)) = stack.pop() {
            let node = self.freeze_node(index);
            let is_element =
                matches!(node, ParseNode::Element(_) | ParseNode::Template(_));
            let handle = tree.add_node(node);
            tree.attach(parent, handle);
            if parent == document && is_element && tree.root().is_none() {
                tree.set_root_unchecked(handle);
            }
            stack.extend(
                self.nodes[index]
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (child, handle)),
            );
        }

        for error in self.errors {
            tree.push_error(error);
        }
        tree
    }
}

fn freeze_attribute(attr: &HtmlAttribute) -> Attribute {
    Attribute::with_namespace(
        attr.name.local.as_ref(),
        &attr.value,
        AttributeNamespace::from_uri(&attr.name.ns),
    )
}

/// An html5ever [TreeSink] that records the parse into a [ParseTree].
pub struct TreeCreator {
    state: RefCell<CreatorState>,
}

impl TreeCreator {
    pub fn new(max_errors: Option<usize>) -> Self {
        let mut state = CreatorState {
            nodes: Vec::new(),
            doctype: None,
            errors: Vec::new(),
            max_errors,
            current_line: 1,
        };
        state.add_node(CreatorNode::Document);
        Self {
            state: RefCell::new(state),
        }
    }
}

impl Default for TreeCreator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TreeSink for TreeCreator {
    type Handle = CreatorHandle;
    type Output = ParseTree;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        self.state.into_inner().freeze()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        let state = &mut *self.state.borrow_mut();
        if state
            .max_errors
            .is_some_and(|max| state.errors.len() >= max)
        {
            return;
        }
        log::trace!(
            target: "html5dom::parse_tree",
            "parse error on line {}: {msg}",
            state.current_line
        );
        // html5ever reports lines but not columns.
        state
            .errors
            .push(RawParseError::new(&msg, state.current_line, 1));
    }

    fn get_document(&self) -> Self::Handle {
        CreatorHandle(0)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| state.element_name(target))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<HtmlAttribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        let state = &mut *self.state.borrow_mut();
        let line = state.current_line;
        state.add_node(CreatorNode::Element {
            name,
            attrs,
            template: flags.template,
            mathml_annotation_xml_integration_point: flags
                .mathml_annotation_xml_integration_point,
            line,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.state
            .borrow_mut()
            .add_node(CreatorNode::Comment(String::from(&*text)))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        // HTML has no processing instructions; keep them as the bogus
        // comment the tokenizer would otherwise produce.
        self.state.borrow_mut().add_node(CreatorNode::Comment(format!(
            "?{} {}",
            &*target,
            &*data
        )))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let state = &mut *self.state.borrow_mut();
        let position = state.nodes[parent.0].children.len();
        state.insert_node_or_text(parent.0, position, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.state.borrow().nodes[element.0].parent.is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.state.borrow_mut().doctype = Some(Doctype {
            name: String::from(&*name),
            public_id: String::from(&*public_id),
            system_id: String::from(&*system_id),
        });
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {}

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents are stored directly as the template's children.
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let state = &mut *self.state.borrow_mut();
        let Some((parent, position)) = state.position_in_parent(sibling.0)
        else {
            return;
        };
        if let NodeOrText::AppendNode(node) = &new_node {
            // Detaching an earlier sibling shifts the insertion point.
            if let Some((old_parent, old_position)) =
                state.position_in_parent(node.0)
            {
                if old_parent == parent && old_position < position {
                    state.detach(node.0);
                    state.insert(parent, position - 1, node.0);
                    return;
                }
            }
        }
        state.insert_node_or_text(parent, position, new_node);
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<HtmlAttribute>,
    ) {
        let state = &mut *self.state.borrow_mut();
        if let CreatorNode::Element {
            attrs: existing, ..
        } = &mut state.nodes[target.0].node
        {
            for attr in attrs {
                if !existing.iter().any(|e| e.name == attr.name) {
                    existing.push(attr);
                }
            }
        } else {
            panic!("Non-element passed to add_attrs_if_missing!");
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.state.borrow_mut().detach(target.0);
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        let state = &mut *self.state.borrow_mut();
        let children = std::mem::take(&mut state.nodes[node.0].children);
        for child in children {
            state.nodes[child].parent = Some(new_parent.0);
            state.nodes[new_parent.0].children.push(child);
        }
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        handle: &Self::Handle,
    ) -> bool {
        matches!(
            self.state.borrow().nodes[handle.0].node,
            CreatorNode::Element {
                mathml_annotation_xml_integration_point: true,
                ..
            }
        )
    }

    fn set_current_line(&self, line_number: u64) {
        self.state.borrow_mut().current_line = line_number;
    }

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<HtmlAttribute>,
    ) -> Result<(), String> {
        Err(String::from("Declarative shadow roots are not supported"))
    }
}
