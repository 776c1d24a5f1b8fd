// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Setting attributes under their literal qualified names.
//!
//! A DOM library's generic setter may read `prefix:local` as a namespaced
//! attribute. To store `xlink:href` (or a literal `xml:lang` from an HTML
//! element) as written, the value is first set under an unused placeholder
//! name without a colon, and that attribute is then renamed in place, which
//! takes the name literally.

use std::borrow::Cow;

use crate::dom::DomSink;
use crate::error::{ConvertError, DomError};
use crate::parse_tree::{Attribute, AttributeNamespace};

/// The name an attribute is stored under: its namespace prefix, if any,
/// followed by its local name.
pub fn qualified_name(attr: &Attribute) -> Cow<'_, str> {
    let prefix = match attr.namespace {
        AttributeNamespace::None => None,
        AttributeNamespace::XLink => Some("xlink:"),
        AttributeNamespace::Xml => Some("xml:"),
        AttributeNamespace::Xmlns if attr.name == "xmlns" => None,
        AttributeNamespace::Xmlns => Some("xmlns:"),
    };
    match prefix {
        Some(prefix) => Cow::Owned(format!("{prefix}{}", attr.name)),
        None => Cow::Borrowed(&attr.name),
    }
}

/// Placeholder names in the order `a`..`z`, `aa`, `ab`..`zz`, `aaa`.. up to
/// `max_len` letters.
pub struct DummyKeys {
    current: Vec<u8>,
    max_len: usize,
}

impl DummyKeys {
    pub fn new(max_len: usize) -> Self {
        Self {
            current: Vec::new(),
            max_len,
        }
    }
}

impl Iterator for DummyKeys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.current.len() >= self.max_len
            && self.current.iter().all(|&b| b == b'z')
        {
            return None;
        }
        // Increment the last letter, carrying leftwards; on overflow of
        // every position grow by one letter.
        let mut position = self.current.len();
        loop {
            if position == 0 {
                self.current.push(b'a');
                break;
            }
            position -= 1;
            if self.current[position] < b'z' {
                self.current[position] += 1;
                break;
            }
            self.current[position] = b'a';
        }
        Some(self.current.iter().map(|&b| char::from(b)).collect())
    }
}

/// Set `name` on `element` exactly as written.
pub fn set_attribute<D: DomSink>(
    document: &mut D,
    element: &D::Node,
    name: &str,
    value: &str,
    max_dummy_key_len: usize,
) -> Result<(), ConvertError> {
    let wrap = |source: DomError| ConvertError::Attribute {
        name: name.to_owned(),
        source,
    };

    if !name.contains(':') {
        return document.set_attribute(element, name, value).map_err(wrap);
    }

    let dummy = DummyKeys::new(max_dummy_key_len)
        .find(|key| !document.has_attribute(element, key))
        .ok_or_else(|| ConvertError::AttributeNamespaceConflict {
            name: name.to_owned(),
        })?;

    document.set_attribute(element, &dummy, value).map_err(wrap)?;
    document.remove_attribute(element, name);
    let attr = document
        .find_attribute(element, &dummy)
        .ok_or_else(|| wrap(DomError::MissingAttribute(dummy.clone())))?;
    document.rename_attribute(element, attr, name).map_err(wrap)
}
