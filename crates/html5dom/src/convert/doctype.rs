// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::DomSink;
use crate::error::{ConvertError, DomError};
use crate::parse_tree::DocumentNode;

/// The doctype of a parsed document, with empty ids normalized to absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Doctype<'a> {
    pub name: &'a str,
    pub public_id: Option<&'a str>,
    pub system_id: Option<&'a str>,
}

impl<'a> Doctype<'a> {
    pub fn from_document(
        document: &'a DocumentNode,
    ) -> Result<Option<Self>, ConvertError> {
        if !document.has_doctype {
            return Ok(None);
        }
        let non_empty = |id: &'a str| (!id.is_empty()).then_some(id);
        let doctype = Self {
            name: &document.name,
            public_id: non_empty(document.public_identifier.as_str()),
            system_id: non_empty(document.system_identifier.as_str()),
        };
        if doctype.name.is_empty() && doctype.has_ids() {
            return Err(ConvertError::MalformedDoctype(
                "doctype has identifiers but no name".to_owned(),
            ));
        }
        Ok(Some(doctype))
    }

    fn has_ids(&self) -> bool {
        self.public_id.is_some() || self.system_id.is_some()
    }
}

fn malformed(err: DomError) -> ConvertError {
    ConvertError::MalformedDoctype(err.to_string())
}

/// Create the output document with exactly the internal subset `doctype`
/// asks for, whatever subset the document constructor attaches.
pub fn build_document<D: DomSink>(
    doctype: Option<&Doctype<'_>>,
) -> Result<D, ConvertError> {
    let Some(doctype) = doctype else {
        log::debug!(target: "html5dom::convert", "No doctype");
        let mut document = D::new_document(None, None).map_err(malformed)?;
        document.remove_internal_subset();
        return Ok(document);
    };

    if !doctype.has_ids() {
        log::debug!(
            target: "html5dom::convert",
            "Doctype {:?} without identifiers",
            doctype.name
        );
        let mut document = D::new_document(None, None).map_err(malformed)?;
        document.remove_internal_subset();
        document
            .create_internal_subset(doctype.name, None, None)
            .map_err(malformed)?;
        return Ok(document);
    }

    log::debug!(
        target: "html5dom::convert",
        "Doctype {:?} public {:?} system {:?}",
        doctype.name,
        doctype.public_id,
        doctype.system_id
    );
    // The constructor takes the system id as its URI and the public id as
    // its external id.
    let mut document = D::new_document(doctype.system_id, doctype.public_id)
        .map_err(malformed)?;
    if document.internal_subset().is_none() {
        return Err(malformed(DomError::NoInternalSubset));
    }
    document
        .rename_internal_subset(doctype.name)
        .map_err(malformed)?;
    Ok(document)
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::dom::{arena, object, DocumentType};

    fn document_node(
        has_doctype: bool,
        name: &str,
        public_identifier: &str,
        system_identifier: &str,
    ) -> DocumentNode {
        DocumentNode {
            has_doctype,
            name: name.to_owned(),
            public_identifier: public_identifier.to_owned(),
            system_identifier: system_identifier.to_owned(),
            ..Default::default()
        }
    }

    fn arena_doctype(node: &DocumentNode) -> Option<DocumentType> {
        let doctype = Doctype::from_document(node).unwrap();
        build_document::<arena::Document>(doctype.as_ref())
            .unwrap()
            .doctype()
    }

    fn object_doctype(node: &DocumentNode) -> Option<DocumentType> {
        let doctype = Doctype::from_document(node).unwrap();
        build_document::<object::Document>(doctype.as_ref())
            .unwrap()
            .doctype()
    }

    #[test]
    fn empty_ids_are_absent() {
        let node = document_node(true, "html", "", "about:legacy-compat");
        assert_that!(Doctype::from_document(&node))
            .is_ok()
            .is_some()
            .is_equal_to(Doctype {
                name: "html",
                public_id: None,
                system_id: Some("about:legacy-compat"),
            });
    }

    #[test]
    fn ids_without_a_name_are_malformed() {
        let node = document_node(true, "", "-//W3C//DTD HTML 4.01//EN", "");
        assert!(matches!(
            Doctype::from_document(&node),
            Err(ConvertError::MalformedDoctype(_))
        ));
    }

    #[test]
    fn no_doctype_gives_no_internal_subset() {
        let node = document_node(false, "html", "ignored", "ignored");
        assert_that!(arena_doctype(&node)).is_none();
        assert_that!(object_doctype(&node)).is_none();
    }

    #[test]
    fn a_bare_doctype_keeps_only_its_name() {
        let node = document_node(true, "html", "", "");
        let expected = Some(DocumentType::new("html", None, None));
        assert_eq!(arena_doctype(&node), expected);
        assert_eq!(object_doctype(&node), expected);
    }

    #[test]
    fn a_nameless_bare_doctype_gets_an_empty_name() {
        let node = document_node(true, "", "", "");
        let expected = Some(DocumentType::new("", None, None));
        assert_eq!(arena_doctype(&node), expected);
        assert_eq!(object_doctype(&node), expected);
    }

    #[test]
    fn legacy_compat_keeps_the_system_id_only() {
        let node = document_node(true, "html", "", "about:legacy-compat");
        let expected =
            Some(DocumentType::new("html", None, Some("about:legacy-compat")));
        assert_eq!(arena_doctype(&node), expected);
        assert_eq!(object_doctype(&node), expected);
    }

    #[test]
    fn both_ids_land_in_their_own_fields() {
        let node = document_node(
            true,
            "HTML",
            "-//W3C//DTD HTML 4.01//EN",
            "http://www.w3.org/TR/html4/strict.dtd",
        );
        let expected = Some(DocumentType::new(
            "HTML",
            Some("-//W3C//DTD HTML 4.01//EN"),
            Some("http://www.w3.org/TR/html4/strict.dtd"),
        ));
        assert_eq!(arena_doctype(&node), expected);
        assert_eq!(object_doctype(&node), expected);
    }

    #[test]
    fn the_subset_is_the_only_document_child() {
        let node = document_node(true, "html", "", "");
        let doctype = Doctype::from_document(&node).unwrap();
        let document =
            build_document::<arena::Document>(doctype.as_ref()).unwrap();
        assert_eq!(document.children(document.root()).count(), 1);
    }

    #[test]
    fn the_renamed_subset_is_the_only_document_child() {
        let node = document_node(true, "html", "-//P", "urn:s");
        let doctype = Doctype::from_document(&node).unwrap();
        let document =
            build_document::<object::Document>(doctype.as_ref()).unwrap();
        assert_eq!(document.children().len(), 1);
    }
}
