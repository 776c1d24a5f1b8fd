// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Conversion of a [ParseTree] into a DOM document.
//!
//! The document shell comes from [doctype::build_document], then every child
//! of the parse tree's document is walked and attached in order, the
//! designated root through [DomSink::set_root]. Parser errors and dropped
//! attributes end up on the document's error list.

pub mod attributes;
pub mod doctype;

use crate::config::ParseOptions;
use crate::diagnostics::{ErrorCollector, ParseError};
use crate::dom::DomSink;
use crate::error::ConvertError;
use crate::parse_tree::{
    ElementNode, ParseErrorKind, ParseHandle, ParseNode, ParseTree,
};

use self::doctype::{build_document, Doctype};

/// Convert `tree` into a new document of type `D`.
///
/// Only a malformed doctype, or a child list naming a handle the tree does
/// not hold, fails the call. An attribute that cannot be set is skipped and
/// reported as a warning after the parser errors.
pub fn convert<D: DomSink>(
    tree: &ParseTree,
    options: &ParseOptions,
) -> Result<D, ConvertError> {
    log::debug!(
        target: "html5dom::convert",
        "Converting {} parse nodes with {} parse errors",
        tree.len(),
        tree.errors().len()
    );

    let doctype = Doctype::from_document(tree.document())?;
    let collector = ErrorCollector::new(tree.source(), &options.source_label);
    let mut converter = Converter {
        document: build_document::<D>(doctype.as_ref())?,
        errors: collector.collect(tree.errors()),
        collector,
        max_dummy_key_len: options.max_dummy_key_len,
    };

    let root = tree.root();
    for &child in &tree.document().children {
        let Some(node) = converter.walk(tree, child)? else {
            continue;
        };
        if Some(child) == root {
            converter.document.set_root(node);
        } else {
            converter.document.add_document_child(node);
        }
    }

    let Converter {
        mut document,
        errors,
        ..
    } = converter;
    log::debug!(
        target: "html5dom::convert",
        "Converted with {} errors",
        errors.len()
    );
    document.set_errors(errors);
    Ok(document)
}

struct Converter<'a, D: DomSink> {
    document: D,
    collector: ErrorCollector<'a>,
    errors: Vec<ParseError>,
    max_dummy_key_len: usize,
}

/// A node whose children are still being converted.
struct Frame<N> {
    handle: ParseHandle,
    node: N,
    next_child: usize,
}

impl<D: DomSink> Converter<'_, D> {
    /// Convert the subtree at `start`. Nodes are created top-down and each
    /// one is attached to its parent once its own subtree is complete.
    fn walk(
        &mut self,
        tree: &ParseTree,
        start: ParseHandle,
    ) -> Result<Option<D::Node>, ConvertError> {
        let Some(node) = self.create(tree, start)? else {
            return Ok(None);
        };
        let mut stack = vec![Frame {
            handle: start,
            node,
            next_child: 0,
        }];

        loop {
            let next = {
                let Some(frame) = stack.last_mut() else {
                    return Ok(None);
                };
                let child =
                    tree.children(frame.handle).get(frame.next_child).copied();
                if child.is_some() {
                    frame.next_child += 1;
                }
                child
            };

            match next {
                Some(child) => {
                    if let Some(node) = self.create(tree, child)? {
                        stack.push(Frame {
                            handle: child,
                            node,
                            next_child: 0,
                        });
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        return Ok(None);
                    };
                    match stack.last() {
                        Some(parent) => {
                            self.document.add_child(&parent.node, done.node)
                        }
                        None => return Ok(Some(done.node)),
                    }
                }
            }
        }
    }

    /// Create the DOM node for one parse node, without its children.
    fn create(
        &mut self,
        tree: &ParseTree,
        handle: ParseHandle,
    ) -> Result<Option<D::Node>, ConvertError> {
        Ok(match tree.get_node(handle)? {
            ParseNode::Document(_) => None,
            ParseNode::Element(element) | ParseNode::Template(element) => {
                let node = self.document.create_element(&element.tag_name);
                self.set_attributes(&node, element);
                Some(node)
            }
            ParseNode::Text(text) | ParseNode::Whitespace(text) => {
                Some(self.document.create_text(text))
            }
            ParseNode::Cdata(content) => Some(self.document.create_cdata(content)),
            ParseNode::Comment(text) => Some(self.document.create_comment(text)),
        })
    }

    fn set_attributes(&mut self, node: &D::Node, element: &ElementNode) {
        for attr in &element.attributes {
            let name = attributes::qualified_name(attr);
            let result = attributes::set_attribute(
                &mut self.document,
                node,
                &name,
                &attr.value,
                self.max_dummy_key_len,
            );
            if let Err(err) = result {
                log::warn!(
                    target: "html5dom::convert",
                    "Dropping attribute on <{}> at line {}: {err}",
                    element.tag_name,
                    element.line
                );
                let kind = match err {
                    ConvertError::AttributeNamespaceConflict { .. } => {
                        ParseErrorKind::AttributeNamespaceConflict
                    }
                    _ => ParseErrorKind::Other,
                };
                self.errors.push(self.collector.tree_warning(
                    kind,
                    &err.to_string(),
                    element.line,
                ));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;
    use crate::diagnostics::{ErrorDomain, ErrorLevel};
    use crate::dom::{arena, object, ToTree};
    use crate::parse_tree::{Attribute, AttributeNamespace, RawParseError};

    fn options() -> ParseOptions {
        ParseOptions::default()
    }

    /// `<!DOCTYPE html><!--a--><html><body><p id=x>hi</p> </body></html><!--b-->`
    fn sample_tree() -> ParseTree {
        let mut tree = ParseTree::new();
        tree.set_doctype("html", "", "");
        let before = tree.add_node(ParseNode::comment("a"));
        let html = tree.add_node(ParseNode::element("html", vec![]));
        let after = tree.add_node(ParseNode::comment("b"));
        let body = tree.add_node(ParseNode::element("body", vec![]));
        let p = tree.add_node(ParseNode::element(
            "p",
            vec![Attribute::new("id", "x"), Attribute::new("class", "c")],
        ));
        let text = tree.add_node(ParseNode::text("hi"));
        let space = tree.add_node(ParseNode::text(" "));
        for node in [before, html, after] {
            tree.append_to_document(node).unwrap();
        }
        tree.set_root(html).unwrap();
        tree.append(html, body).unwrap();
        tree.append(body, p).unwrap();
        tree.append(p, text).unwrap();
        tree.append(body, space).unwrap();
        tree
    }

    #[test]
    fn converts_in_document_order() {
        let document: arena::Document = convert(&sample_tree(), &options()).unwrap();
        assert_eq!(
            document.to_tree(),
            indoc! {r#"

                ├><!DOCTYPE html>
                ├><!--a-->
                ├>html
                │ └>body
                │   ├>p id="x" class="c"
                │   │ └>"hi"
                │   └>" "
                └><!--b-->
            "#}
        );
        let root = document.root_element().unwrap();
        assert_eq!(document.node_name(root), Some("html"));
    }

    #[test]
    fn both_libraries_build_the_same_tree() {
        let tree = sample_tree();
        let arena: arena::Document = convert(&tree, &options()).unwrap();
        let object: object::Document = convert(&tree, &options()).unwrap();
        assert_eq!(arena.to_tree(), object.to_tree());
    }

    #[test]
    fn converting_twice_gives_equal_independent_documents() {
        let tree = sample_tree();
        let mut first: arena::Document = convert(&tree, &options()).unwrap();
        let second: arena::Document = convert(&tree, &options()).unwrap();
        assert_eq!(first, second);

        let root = first.root_element().unwrap();
        first.set_attribute(&root, "changed", "yes").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn namespaced_attributes_keep_their_prefix() {
        let mut tree = ParseTree::new();
        let svg = tree.add_node(ParseNode::element(
            "svg",
            vec![
                Attribute::with_namespace("xmlns", "urn:svg", AttributeNamespace::Xmlns),
                Attribute::with_namespace("xlink", "urn:xl", AttributeNamespace::Xmlns),
                Attribute::with_namespace("href", "#a", AttributeNamespace::XLink),
                Attribute::new("xml:lang", "en"),
            ],
        ));
        tree.append_to_document(svg).unwrap();
        tree.set_root(svg).unwrap();

        let document: arena::Document = convert(&tree, &options()).unwrap();
        let svg = document.root_element().unwrap();
        let names: Vec<String> = document
            .attributes(svg)
            .iter()
            .map(arena::qualified_name)
            .collect();
        assert_eq!(names, ["xmlns", "xmlns:xlink", "xlink:href", "xml:lang"]);
        assert_eq!(document.attribute(svg, "xlink:href"), Some("#a"));
        assert_eq!(document.attribute(svg, "xml:lang"), Some("en"));
        assert!(document
            .attributes(svg)
            .iter()
            .all(|attr| attr.namespace.is_none()));
        assert!(document.errors().is_empty());
    }

    #[test]
    fn cdata_keeps_embedded_zero_bytes() {
        let mut tree = ParseTree::new();
        let root = tree.add_node(ParseNode::element("math", vec![]));
        let cdata = tree.add_node(ParseNode::cdata(b"a\0b\0"));
        tree.append_to_document(root).unwrap();
        tree.set_root(root).unwrap();
        tree.append(root, cdata).unwrap();

        let document: arena::Document = convert(&tree, &options()).unwrap();
        let root = document.root_element().unwrap();
        let cdata = document.first_child(root).unwrap();
        assert_eq!(document.cdata_content(cdata), Some("a\0b\0"));

        let document: object::Document = convert(&tree, &options()).unwrap();
        let root = document.root_element().unwrap();
        let cdata = &object::children(&root)[0];
        assert_eq!(object::text(cdata).as_deref(), Some("a\0b\0"));
    }

    #[test]
    fn template_contents_become_children() {
        let mut tree = ParseTree::new();
        let html = tree.add_node(ParseNode::element("html", vec![]));
        let template = tree.add_node(ParseNode::template(vec![]));
        let span = tree.add_node(ParseNode::element("span", vec![]));
        tree.append_to_document(html).unwrap();
        tree.set_root(html).unwrap();
        tree.append(html, template).unwrap();
        tree.append(template, span).unwrap();

        let document: object::Document = convert(&tree, &options()).unwrap();
        assert_eq!(
            document.to_tree(),
            indoc! {"

                └>html
                  └>template
                    └>span
            "}
        );
    }

    /// `<!--a--><aside/><html/><footer/>` with `html` as the root.
    fn tree_with_elements_around_the_root() -> ParseTree {
        let mut tree = ParseTree::new();
        let comment = tree.add_node(ParseNode::comment("a"));
        let before = tree.add_node(ParseNode::element("aside", vec![]));
        let html = tree.add_node(ParseNode::element("html", vec![]));
        let after = tree.add_node(ParseNode::element("footer", vec![]));
        for node in [comment, before, html, after] {
            tree.append_to_document(node).unwrap();
        }
        tree.set_root(html).unwrap();
        tree
    }

    #[test]
    fn elements_next_to_the_root_are_kept_in_order() {
        let expected = indoc! {"

            ├><!--a-->
            ├>aside
            ├>html
            └>footer
        "};
        let tree = tree_with_elements_around_the_root();

        let document: arena::Document = convert(&tree, &options()).unwrap();
        assert_eq!(document.to_tree(), expected);
        let root = document.root_element().unwrap();
        assert_eq!(document.node_name(root), Some("html"));

        let document: object::Document = convert(&tree, &options()).unwrap();
        assert_eq!(document.to_tree(), expected);
        assert_eq!(document.children().len(), 4);
    }

    #[test]
    fn parser_errors_are_carried_in_order() {
        let mut tree = sample_tree();
        tree.push_error(RawParseError::new("Unexpected token", 1, 4));
        tree.push_error(RawParseError::new("Bad character", 2, 1));

        let options = options().with_source_label("page.html");
        let document: arena::Document = convert(&tree, &options).unwrap();
        let errors = document.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "page.html:1:4: ERROR: Unexpected token");
        assert_eq!(errors[0].kind(), Some(ParseErrorKind::UnexpectedToken));
        assert_eq!((errors[1].line, errors[1].column), (2, 1));
        assert_eq!(errors[1].source_label, "page.html");
    }

    #[test]
    fn no_parser_errors_gives_an_empty_list() {
        let document: arena::Document = convert(&sample_tree(), &options()).unwrap();
        assert!(document.errors().is_empty());
    }

    #[test]
    fn conflicting_attributes_are_dropped_with_a_warning() {
        let mut names: Vec<Attribute> = ('a'..='z')
            .map(|c| Attribute::new(&c.to_string(), ""))
            .collect();
        names.push(Attribute::with_namespace("href", "#a", AttributeNamespace::XLink));
        names.push(Attribute::new("title", "kept"));
        let mut tree = ParseTree::new();
        let svg = tree.add_node(ParseNode::Element(ElementNode {
            line: 3,
            ..ElementNode::new("svg", names)
        }));
        tree.append_to_document(svg).unwrap();
        tree.set_root(svg).unwrap();
        tree.push_error(RawParseError::new("Other", 1, 1));

        let options = options().with_max_dummy_key_len(1);
        let document: arena::Document = convert(&tree, &options).unwrap();
        let svg = document.root_element().unwrap();
        assert_eq!(document.attribute(svg, "xlink:href"), None);
        assert_eq!(document.attribute(svg, "title"), Some("kept"));
        assert_eq!(document.attributes(svg).len(), 27);

        let errors = document.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].domain, ErrorDomain::Parser);
        assert_eq!(errors[1].domain, ErrorDomain::Tree);
        assert_eq!(errors[1].level, ErrorLevel::Warning);
        assert_eq!(errors[1].line, 3);
        assert_eq!(
            errors[1].kind(),
            Some(ParseErrorKind::AttributeNamespaceConflict)
        );
    }

    #[test]
    fn malformed_doctypes_fail_the_conversion() {
        let mut tree = ParseTree::new();
        tree.set_doctype("", "-//W3C//DTD HTML 4.01//EN", "");
        let result: Result<arena::Document, _> = convert(&tree, &options());
        assert!(matches!(result, Err(ConvertError::MalformedDoctype(_))));
    }

    #[test]
    fn an_empty_tree_gives_an_empty_document() {
        let document: arena::Document =
            convert(&ParseTree::new(), &options()).unwrap();
        assert_eq!(document.to_tree(), "\n");
        assert_that!(document.doctype()).is_none();
    }

    #[test]
    fn deep_nesting_does_not_exhaust_the_stack() {
        const DEPTH: usize = 100_000;
        let mut tree = ParseTree::new();
        let mut parent = tree.add_node(ParseNode::element("div", vec![]));
        tree.append_to_document(parent).unwrap();
        tree.set_root(parent).unwrap();
        for _ in 1..DEPTH {
            let child = tree.add_node(ParseNode::element("div", vec![]));
            tree.append(parent, child).unwrap();
            parent = child;
        }

        let document: arena::Document = convert(&tree, &options()).unwrap();
        let mut depth = 0;
        let mut current = document.root_element();
        while let Some(node) = current {
            depth += 1;
            current = document.first_child(node);
        }
        assert_eq!(depth, DEPTH);

        let document: object::Document = convert(&tree, &options()).unwrap();
        assert!(document.root_element().is_some());
    }
}
