//! Named-placeholder substitution for prompt text.
//!
//! Prompts embed JSON examples with literal braces, so generic formatting
//! is off the table. Only `{identifier}` tokens whose identifier has a
//! supplied value are replaced, in a single left-to-right pass; everything
//! else (including values that happen to contain `{...}`) is left alone.

use std::sync::OnceLock;

use regex::{Captures, Regex};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("prompt `{prompt}` is missing a value for `{placeholder}`")]
    MissingValue { prompt: String, placeholder: String },
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").expect("static pattern"))
}

/// Ordered name → value pairs. Setting an existing name replaces its value
/// in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptValues {
    entries: Vec<(String, String)>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A prompt with the placeholders it cannot render without.
#[derive(Clone, Copy, Debug)]
pub struct PromptTemplate<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub required: &'a [&'a str],
}

impl<'a> PromptTemplate<'a> {
    pub const fn new(name: &'a str, text: &'a str, required: &'a [&'a str]) -> Self {
        Self { name, text, required }
    }

    /// Render, failing on the first required placeholder without a value.
    pub fn render(&self, values: &PromptValues) -> Result<String, PromptError> {
        if let Some(missing) = self.required.iter().find(|p| values.get(p).is_none()) {
            return Err(PromptError::MissingValue {
                prompt: self.name.to_string(),
                placeholder: (*missing).to_string(),
            });
        }
        Ok(substitute(self.text, values))
    }
}

/// Single-pass substitution of known placeholders. Unknown `{tokens}` and
/// JSON braces pass through untouched.
pub fn substitute(text: &str, values: &PromptValues) -> String {
    placeholder_pattern()
        .replace_all(text, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names appearing in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for caps in placeholder_pattern().captures_iter(text) {
        let name = &caps[1];
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVAL: PromptTemplate<'static> = PromptTemplate::new(
        "evaluation",
        "Subject: {subject}\nBody: {body}\nReturn {\"brevity\": <score>}",
        &["subject", "body"],
    );

    #[test]
    fn substitutes_known_placeholders() {
        let values = PromptValues::new().with("subject", "Hello").with("body", "World");
        let rendered = EVAL.render(&values).unwrap();
        assert!(rendered.starts_with("Subject: Hello\nBody: World"));
    }

    #[test]
    fn json_braces_survive() {
        let values = PromptValues::new().with("subject", "s").with("body", "b");
        let rendered = EVAL.render(&values).unwrap();
        assert!(rendered.ends_with("{\"brevity\": <score>}"));
    }

    #[test]
    fn missing_required_value_fails_loudly() {
        let values = PromptValues::new().with("subject", "s");
        let err = EVAL.render(&values).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingValue {
                prompt: "evaluation".into(),
                placeholder: "body".into()
            }
        );
    }

    #[test]
    fn empty_value_counts_as_present() {
        let values = PromptValues::new().with("subject", "").with("body", "");
        assert!(EVAL.render(&values).is_ok());
    }

    #[test]
    fn values_are_not_rescanned() {
        let values = PromptValues::new()
            .with("a", "{b}")
            .with("b", "leaked");
        assert_eq!(substitute("x {a} y", &values), "x {b} y");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        let values = PromptValues::new().with("name", "Jane");
        assert_eq!(substitute("{name} {title}", &values), "Jane {title}");
    }

    #[test]
    fn set_replaces_in_place() {
        let mut values = PromptValues::new().with("a", "1").with("b", "2");
        values.set("a", "3");
        let pairs: Vec<_> = values.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn placeholders_listed_once_in_order() {
        let names = placeholders("{b} {a} {b} {\"json\": 1}");
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }
}
