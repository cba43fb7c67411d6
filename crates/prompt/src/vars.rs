//! Placeholder extraction and substitution.
//!
//! Prompt text refers to variables with `${name}` tokens. Whitespace inside
//! the braces is tolerated when reading and never written.

use crate::message::Message;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Variable bindings, name to value.
pub type Variables = HashMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z0-9_]+)\s*\}").expect("placeholder pattern is valid")
});

/// The placeholder token for `name`.
pub fn placeholder(name: &str) -> String {
    format!("${{{}}}", name)
}

/// Every placeholder identifier in `text`, left to right.
///
/// Duplicates are kept; use [`unique_placeholders`] when each name is
/// needed once.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Placeholder identifiers in order of first appearance, without repeats.
pub fn unique_placeholders(text: &str) -> Vec<String> {
    dedupe(extract_placeholders(text))
}

/// Order-preserving dedupe.
pub fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Replace every placeholder with its bound value.
///
/// Placeholders with no binding become the empty string. This never fails.
pub fn substitute_lenient(text: &str, variables: &Variables) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Apply [`substitute_lenient`] to the content of every message.
pub fn substitute_messages_lenient(messages: &[Message], variables: &Variables) -> Vec<Message> {
    messages
        .iter()
        .cloned()
        .map(|message| message.map_content(|content| substitute_lenient(content, variables)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FunctionCall;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_keeps_order_and_duplicates() {
        assert_eq!(
            extract_placeholders("${a} and ${b} and ${a}"),
            vec!["a", "b", "a"]
        );
    }

    #[test]
    fn test_extract_tolerates_inner_whitespace() {
        assert_eq!(extract_placeholders("${ name }, ${\tage}"), vec!["name", "age"]);
    }

    #[test]
    fn test_extract_ignores_non_placeholders() {
        assert!(extract_placeholders("no vars, {name}, $name, ${}, ${a-b}").is_empty());
        assert_eq!(extract_placeholders("${Name} ${name}"), vec!["Name", "name"]);
    }

    #[test]
    fn test_unique_placeholders() {
        assert_eq!(unique_placeholders("${b} ${a} ${b}"), vec!["b", "a"]);
    }

    #[test]
    fn test_substitute_bound() {
        let v = vars(&[("name", "James")]);
        assert_eq!(substitute_lenient("Hi ${name}!", &v), "Hi James!");
        assert_eq!(substitute_lenient("Hi ${ name }!", &v), "Hi James!");
    }

    #[test]
    fn test_substitute_missing_becomes_empty() {
        assert_eq!(substitute_lenient("Hi ${name}!", &Variables::new()), "Hi !");
    }

    #[test]
    fn test_substitute_value_is_not_rescanned() {
        let v = vars(&[("a", "${b}"), ("b", "x")]);
        assert_eq!(substitute_lenient("${a}", &v), "${b}");
    }

    #[test]
    fn test_substitute_messages() {
        let call = FunctionCall {
            name: "${name}".into(),
            arguments: "{}".into(),
        };
        let messages = vec![
            Message::system("You greet ${name}."),
            Message::assistant_with_call(None, call.clone()),
        ];
        let out = substitute_messages_lenient(&messages, &vars(&[("name", "Ada")]));

        assert_eq!(out[0], Message::system("You greet Ada."));
        // function calls are left alone
        assert_eq!(out[1], Message::assistant_with_call(None, call));
    }

    #[test]
    fn test_placeholder_token() {
        assert_eq!(placeholder("name"), "${name}");
        assert_eq!(extract_placeholders(&placeholder("x_1")), vec!["x_1"]);
    }
}
