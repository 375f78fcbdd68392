//! Attack Signature Catalog
//!
//! Static signature sets for the four attack shapes this crate recognizes:
//!
//! | Category | Examples |
//! |----------|----------|
//! | SQL injection | `DROP TABLE`, `UNION SELECT`, `'`, `--`, `/*` |
//! | Script (XSS) | `<script`, `javascript:`, `onerror=`, `<iframe` |
//! | Header injection | CR, LF, `BCC:`, `CC:`, `TO:`, `FROM:` |
//! | Path traversal | `../`, `..\`, `/etc/`, `\windows\` |
//!
//! All matching is ASCII case-insensitive against the raw input. The catalog
//! is plain data; nothing here mutates at runtime.
//!
//! # Usage
//!
//! ```
//! use portcullis::patterns::{matches, PatternCategory};
//!
//! assert!(matches(PatternCategory::SqlInjection, "1 union select password"));
//! assert!(!matches(PatternCategory::PathTraversal, "reports/2024.pdf"));
//! ```

use std::fmt;

use serde::Serialize;

// ============================================================================
// Signature Sets
// ============================================================================

/// SQL statement fragments, tautologies, and comment tokens.
pub const SQL_SIGNATURES: &[&str] = &[
    "drop table",
    "delete from",
    "insert into",
    "update set",
    "union select",
    "or '1'='1'",
    "'",
    "--",
    "/*",
    "*/",
];

/// Script and active-content markers.
pub const SCRIPT_SIGNATURES: &[&str] = &[
    "<script",
    "</script>",
    "javascript:",
    "vbscript:",
    "onload=",
    "onerror=",
    "onclick=",
    "onmouseover=",
    "<iframe",
    "<object",
    "<embed",
];

/// Mail header injection markers.
pub const HEADER_SIGNATURES: &[&str] = &["\r", "\n", "bcc:", "cc:", "to:", "from:"];

/// Directory traversal and sensitive system paths.
pub const PATH_TRAVERSAL_SIGNATURES: &[&str] = &["../", "..\\", "/etc/", "\\windows\\"];

/// SQL fragments removed by the SQL sanitizer.
///
/// Quote handling is separate (quotes are doubled, not removed), so the bare
/// `'` and the tautology are intentionally absent here.
pub const SQL_STRIP_SIGNATURES: &[&str] = &[
    "drop table",
    "delete from",
    "insert into",
    "update set",
    "union select",
    "--",
    "/*",
    "*/",
];

// ============================================================================
// Categories
// ============================================================================

/// Attack category a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// SQL statements, tautologies, and comment sequences
    SqlInjection,
    /// Script tags, script URLs, and inline event handlers
    Script,
    /// CR/LF and mail header names
    HeaderInjection,
    /// Relative path escapes and system directories
    PathTraversal,
}

impl PatternCategory {
    /// All categories, in the precedence order field validators apply them.
    pub const ALL: [PatternCategory; 4] = [
        Self::SqlInjection,
        Self::Script,
        Self::HeaderInjection,
        Self::PathTraversal,
    ];

    /// Lowercase signatures for this category
    pub fn signatures(&self) -> &'static [&'static str] {
        match self {
            Self::SqlInjection => SQL_SIGNATURES,
            Self::Script => SCRIPT_SIGNATURES,
            Self::HeaderInjection => HEADER_SIGNATURES,
            Self::PathTraversal => PATH_TRAVERSAL_SIGNATURES,
        }
    }

    /// Category name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::Script => "script",
            Self::HeaderInjection => "header_injection",
            Self::PathTraversal => "path_traversal",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Check whether `text` contains any signature of `category`.
pub fn matches(category: PatternCategory, text: &str) -> bool {
    first_match(category, text).is_some()
}

/// Return the first signature of `category` found in `text`, in catalog order.
pub fn first_match(category: PatternCategory, text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    category
        .signatures()
        .iter()
        .copied()
        .find(|signature| lower.contains(signature))
}

/// Remove every occurrence of `needles` from `text`, ignoring ASCII case.
///
/// Removal repeats until the text stops changing, so fragments split around
/// a signature (`<scr<script>ipt>`) cannot reassemble into it. Needles must
/// be lowercase ASCII; when several match at one position the first listed
/// wins.
pub fn strip_all(text: &str, needles: &[&str]) -> String {
    debug_assert!(needles
        .iter()
        .all(|n| !n.is_empty() && n.is_ascii() && n.to_ascii_lowercase() == *n));

    let mut current = text.to_string();
    loop {
        let next = strip_once(&current, needles);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(text: &str, needles: &[&str]) -> String {
    // ASCII lowercasing keeps byte offsets identical to `text`
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut skip_until = 0;

    for (i, c) in text.char_indices() {
        if i < skip_until {
            continue;
        }
        if let Some(needle) = needles.iter().find(|n| lower[i..].starts_with(**n)) {
            skip_until = i + needle.len();
            continue;
        }
        out.push(c);
    }

    out
}
