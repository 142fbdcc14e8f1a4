//! Recovery of JSON payloads from free-form model output.
//!
//! Models wrap JSON in code fences, prepend prose, or return the object as a
//! quoted string. [`recover_json`] runs a fixed chain of normalization steps
//! and attempts a parse after each one. The first successful parse wins; if
//! every step fails the caller gets a [`JsonRecoveryError`].

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;

/// Top-level JSON shape the caller expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::Array => ('[', ']'),
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Array => f.write_str("array"),
        }
    }
}

/// One step of the recovery chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
    AsIs,
    StripFences,
    SliceOuter,
    StripQuotes,
}

/// Order matters: the raw response is tried first, then the fence-stripped
/// text, then progressively more aggressive rewrites of it.
pub const RECOVERY_CHAIN: [Normalization; 4] = [
    Normalization::AsIs,
    Normalization::StripFences,
    Normalization::SliceOuter,
    Normalization::StripQuotes,
];

impl Normalization {
    fn apply<'a>(self, raw: &'a str, fenced: &'a str, shape: JsonShape) -> Cow<'a, str> {
        match self {
            Self::AsIs => Cow::Borrowed(raw.trim()),
            Self::StripFences => Cow::Borrowed(fenced),
            Self::SliceOuter => Cow::Borrowed(slice_outer(fenced, shape)),
            Self::StripQuotes => match unquote(fenced) {
                Cow::Borrowed(s) => Cow::Borrowed(slice_outer(s, shape)),
                Cow::Owned(s) => Cow::Owned(slice_outer(&s, shape).to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no JSON {shape} recovered after {attempts} attempts ({last_error}); response began {preview:?}")]
pub struct JsonRecoveryError {
    pub shape: JsonShape,
    pub attempts: usize,
    pub last_error: String,
    pub preview: String,
}

const PREVIEW_CHARS: usize = 120;

/// Parse `raw` as `T`, trying each [`Normalization`] in [`RECOVERY_CHAIN`].
pub fn recover_json<T: DeserializeOwned>(raw: &str, shape: JsonShape) -> Result<T, JsonRecoveryError> {
    let fenced = strip_code_fences(raw);
    let mut last_error = String::from("empty response");

    for step in RECOVERY_CHAIN {
        let candidate = step.apply(raw, fenced, shape);
        match serde_json::from_str::<T>(&candidate) {
            Ok(value) => {
                if step != Normalization::AsIs {
                    tracing::debug!(?step, %shape, "recovered JSON after normalization");
                }
                return Ok(value);
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(JsonRecoveryError {
        shape,
        attempts: RECOVERY_CHAIN.len(),
        last_error,
        preview: raw.trim().chars().take(PREVIEW_CHARS).collect(),
    })
}

/// Remove a Markdown code fence (with or without a language tag) and any
/// prose outside it. Only a fence that opens before the JSON payload counts;
/// backticks inside string values are left alone. Text without such a fence
/// is only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    if trimmed.find(['{', '[']).is_some_and(|payload| payload < open) {
        return trimmed;
    }
    let after_ticks = &trimmed[open + 3..];
    // The rest of the opening line is the language tag, if any.
    let content = match after_ticks.find('\n') {
        Some(nl) => &after_ticks[nl + 1..],
        None => after_ticks.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    match content.rfind("```") {
        Some(close) => content[..close].trim(),
        None => content.trim(),
    }
}

/// Slice from the first opening delimiter to the last closing one, inclusive.
/// Returns the input unchanged when no such pair exists.
pub fn slice_outer(text: &str, shape: JsonShape) -> &str {
    let (open, close) = shape.delimiters();
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Undo a response that arrived as a quoted string, either a proper JSON
/// string literal or stray quote characters around the payload.
fn unquote(text: &str) -> Cow<'_, str> {
    if text.starts_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(text) {
            return Cow::Owned(decoded);
        }
    }
    Cow::Borrowed(text.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim())
}
