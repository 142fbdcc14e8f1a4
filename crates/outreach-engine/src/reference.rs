//! Read-only reference material shared by every strategy: the product
//! report and the role-context library. Loaded once per engine.

use std::path::Path;

use tracing::{debug, warn};

/// Ordered keyword table. The first keyword contained in the lowercased
/// title selects the library section.
pub const ROLE_TABLE: &[(&str, &str)] = &[
    ("ceo", "## Hospital CEO (Chief Executive Officer)"),
    ("chief executive", "## Hospital CEO (Chief Executive Officer)"),
    ("cmo", "## Chief Medical Officer (CMO)"),
    ("chief medical", "## Chief Medical Officer (CMO)"),
    ("cqo", "## Chief Quality Officer (CQO)"),
    ("chief quality", "## Chief Quality Officer (CQO)"),
    ("quality officer", "## Chief Quality Officer (CQO)"),
    ("sepsis coordinator", "## Sepsis Coordinator / Sepsis Program Manager"),
    ("sepsis program", "## Sepsis Coordinator / Sepsis Program Manager"),
    ("lab director", "## Lab Director / Pathologist"),
    ("pathologist", "## Lab Director / Pathologist"),
    ("emergency department physician", "## Emergency Department Physician"),
    ("emergency medicine", "## Emergency Department Physician"),
    ("ed physician", "## Emergency Department Physician"),
    ("emergency department nurse", "## Emergency Department Nurse"),
    ("ed nurse", "## Emergency Department Nurse"),
    ("emergency nurse", "## Emergency Department Nurse"),
    (
        "medical director",
        "## Emergency Department Physician Leader / Medical Director",
    ),
    (
        "physician leader",
        "## Emergency Department Physician Leader / Medical Director",
    ),
];

/// Upper bound on a role section before any per-mode budget applies.
pub const ROLE_SECTION_CAP: usize = 2000;

pub const PRODUCT_UNAVAILABLE: &str = "Product information not available.";

/// Outcome of looking up a title in the role library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleMatch {
    /// The matched section, heading included, capped at [`ROLE_SECTION_CAP`].
    Section(String),
    /// No keyword in the table matched the title.
    Unmatched { title: String },
    /// A keyword matched but the library has no such heading.
    MissingSection { title: String },
    EmptyLibrary,
}

impl RoleMatch {
    /// Text injected into prompts, fallbacks included.
    pub fn text(&self) -> String {
        match self {
            Self::Section(section) => section.clone(),
            Self::Unmatched { title } => format!(
                "General healthcare professional context (specific role '{title}' not found in library)."
            ),
            Self::MissingSection { title } => {
                format!("Role context for '{title}' not found in library.")
            }
            Self::EmptyLibrary => "No role-specific context available.".to_string(),
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Self::Section(_))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceMaterial {
    product_report: String,
    role_library: String,
}

impl ReferenceMaterial {
    pub fn new(product_report: impl Into<String>, role_library: impl Into<String>) -> Self {
        Self {
            product_report: product_report.into(),
            role_library: role_library.into(),
        }
    }

    /// Load both documents. A missing or unreadable file degrades to empty
    /// material with a warning; generation still proceeds.
    pub fn load(product_report: Option<&Path>, role_library: Option<&Path>) -> Self {
        Self::new(read_optional(product_report, "product report"), read_optional(role_library, "role library"))
    }

    pub fn product_report(&self) -> &str {
        &self.product_report
    }

    pub fn role_library(&self) -> &str {
        &self.role_library
    }

    /// First `budget` characters of the product report.
    pub fn product_excerpt(&self, budget: usize) -> &str {
        prefix_chars(&self.product_report, budget)
    }

    pub fn role_context(&self, title: &str) -> RoleMatch {
        if self.role_library.is_empty() {
            return RoleMatch::EmptyLibrary;
        }
        let lowered = title.to_lowercase();
        let Some(heading) = ROLE_TABLE
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, heading)| *heading)
        else {
            return RoleMatch::Unmatched {
                title: title.to_string(),
            };
        };

        let Some(start) = self.role_library.find(heading) else {
            return RoleMatch::MissingSection {
                title: title.to_string(),
            };
        };
        let rest = &self.role_library[start..];
        let end = rest[heading.len()..]
            .find("\n## ")
            .map_or(rest.len(), |idx| idx + heading.len());
        RoleMatch::Section(prefix_chars(&rest[..end], ROLE_SECTION_CAP).to_string())
    }
}

fn read_optional(path: Option<&Path>, what: &str) -> String {
    let Some(path) = path else {
        debug!(what, "no path configured");
        return String::new();
    };
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(what, path = %path.display(), error = %e, "reference material unavailable");
            String::new()
        }
    }
}

/// Longest prefix of at most `max_chars` characters, cut on a char boundary.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
