// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Options for a parse/convert call, and the process-wide defaults used by
//! [crate::parse()].

use once_cell::sync::OnceCell;

/// With four letters there are 26 + 26^2 + 26^3 + 26^4 = 475254 candidate
/// placeholder names, far more attributes than any element carries.
pub const DEFAULT_MAX_DUMMY_KEY_LEN: usize = 4;

static DEFAULTS: OnceCell<ParseOptions> = OnceCell::new();

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Identifies the input in diagnostics, e.g. the URL it was fetched from.
    pub source_label: String,
    /// Maximum number of parse errors to record. `None` records them all.
    pub max_errors: Option<usize>,
    /// Longest placeholder attribute name tried before an attribute whose
    /// name contains a colon is given up on.
    pub max_dummy_key_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_label: String::new(),
            max_errors: None,
            max_dummy_key_len: DEFAULT_MAX_DUMMY_KEY_LEN,
        }
    }
}

impl ParseOptions {
    pub fn with_source_label(mut self, source_label: &str) -> Self {
        self.source_label = source_label.to_owned();
        self
    }

    pub fn with_max_errors(mut self, max_errors: Option<usize>) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_max_dummy_key_len(mut self, max_dummy_key_len: usize) -> Self {
        self.max_dummy_key_len = max_dummy_key_len;
        self
    }
}

/// Set the options used by [crate::parse()]. This can only happen once per
/// process, before or instead of the first use of [defaults]; later calls
/// hand the rejected options back.
pub fn init(options: ParseOptions) -> Result<(), ParseOptions> {
    DEFAULTS.set(options)
}

pub fn defaults() -> &'static ParseOptions {
    DEFAULTS.get_or_init(ParseOptions::default)
}
