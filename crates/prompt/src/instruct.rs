//! Conversion between chat messages and instruct text.
//!
//! Instruct text is the flattened, single-document form of a message
//! sequence, used for completion models and for editing a prompt in a text
//! editor:
//!
//! ```text
//! ---
//! name: Greeting
//! description: Greet the user
//! ---
//!
//! # System
//! You greet people.
//!
//! # User
//! Greet ${name}.
//! ```
//!
//! The front matter block is a YAML mapping of scalar values. Role headings
//! are the only signal for message boundaries. Text flattened without
//! headings parses back as a single system message.

use crate::message::{parse_messages_json, FunctionCall, Message, Role};
use pia_core::{AppError, AppResult};
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

const FRONT_MATTER_DELIMITER: &str = "---";

static ROLE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^# (System|User|Assistant)\s*$").expect("heading pattern is valid")
});

/// Ordered `key: value` metadata written above the messages.
///
/// `name` and `description` are the recognized keys; any other key is kept
/// as a free-form string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    entries: Vec<(String, String)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`FrontMatter::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Render the delimited block, including the blank line after it.
    ///
    /// The entries are written as a YAML mapping in insertion order.
    fn render(&self) -> String {
        let yaml = if self.is_empty() {
            String::new()
        } else {
            let mapping: serde_yaml::Mapping = self
                .entries
                .iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), yaml_value(v)))
                .collect();
            match serde_yaml::to_string(&mapping) {
                Ok(yaml) => yaml,
                Err(e) => {
                    tracing::warn!("Failed to render front matter: {}", e);
                    String::new()
                }
            }
        };
        format!("{delim}\n{}{delim}\n\n", yaml, delim = FRONT_MATTER_DELIMITER)
    }

    /// Parse the YAML between the delimiters. Every value must be a scalar;
    /// scalars are kept as their text.
    fn parse(block: &str) -> Result<Self, String> {
        if block.trim().is_empty() {
            return Ok(Self::new());
        }
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(block).map_err(|e| e.to_string())?;
        mapping
            .into_iter()
            .map(|(k, v)| match (scalar_text(&k), scalar_text(&v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(format!("non-scalar entry {:?}", k)),
            })
            .collect()
    }
}

/// Text of a YAML scalar; `None` for sequences, mappings and tagged values.
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Numbers and booleans whose text survives a YAML round trip are written
/// bare (`max_tokens: 300`); everything else is a YAML string.
fn yaml_value(text: &str) -> serde_yaml::Value {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(value @ (serde_yaml::Value::Number(_) | serde_yaml::Value::Bool(_)))
            if scalar_text(&value).as_deref() == Some(text) =>
        {
            value
        }
        _ => serde_yaml::Value::String(text.to_string()),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FrontMatter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut front_matter = Self::new();
        for (k, v) in iter {
            front_matter.insert(k, v);
        }
        front_matter
    }
}

impl Serialize for FrontMatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrontMatter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrontMatterVisitor;

        impl<'de> Visitor<'de> for FrontMatterVisitor {
            type Value = FrontMatter;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FrontMatter, A::Error> {
                let mut front_matter = FrontMatter::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    front_matter.insert(k, v);
                }
                Ok(front_matter)
            }
        }

        deserializer.deserialize_map(FrontMatterVisitor)
    }
}

/// A parsed instruct document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<FrontMatter>,
    pub messages: Vec<Message>,
}

impl InstructDocument {
    pub fn new(messages: Vec<Message>, attributes: Option<FrontMatter>) -> Self {
        Self {
            attributes,
            messages,
        }
    }

    /// Parse instruct text. Never fails; see [`instruct_to_messages`].
    pub fn parse(text: &str) -> Self {
        instruct_to_messages(text)
    }

    /// Read a document from JSON: either `{"attributes": {...}, "messages": [...]}`
    /// or a bare array of messages. Every message is validated.
    pub fn from_json(text: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value {
            serde_json::Value::Array(_) => Ok(Self::new(parse_messages_json(text)?, None)),
            serde_json::Value::Object(mut map) => {
                let attributes = match map.remove("attributes") {
                    None | Some(serde_json::Value::Null) => None,
                    Some(value) => Some(
                        serde_json::from_value::<FrontMatter>(value)
                            .map_err(|e| AppError::Validation(format!("attributes: {}", e)))?,
                    ),
                };
                let messages = match map.remove("messages") {
                    Some(serde_json::Value::Array(items)) => items
                        .into_iter()
                        .map(Message::from_json_value)
                        .collect::<AppResult<Vec<_>>>()?,
                    _ => {
                        return Err(AppError::Validation(
                            "expected a \"messages\" array".to_string(),
                        ))
                    }
                };
                Ok(Self::new(messages, attributes))
            }
            _ => Err(AppError::Validation(
                "expected a JSON object or array".to_string(),
            )),
        }
    }

    /// Flatten back to instruct text.
    pub fn to_text(&self, include_role_headers: bool) -> String {
        messages_to_instruct(
            &self.messages,
            self.attributes.as_ref(),
            include_role_headers,
        )
    }
}

/// Flatten a message sequence into instruct text.
///
/// Messages are separated by a blank line. With `include_role_headers`, each
/// body starts with a `# Role` heading line. Assistant function calls follow
/// the content as a pretty-printed JSON object. `attributes`, when given,
/// are written first as a `---` delimited block.
///
/// With headings, [`instruct_to_messages`] gives back the same messages,
/// except for assistant content that itself ends in a `{"name", "arguments"}`
/// object: that text is indistinguishable from a function call and reads
/// back as one.
pub fn messages_to_instruct(
    messages: &[Message],
    attributes: Option<&FrontMatter>,
    include_role_headers: bool,
) -> String {
    let body = messages
        .iter()
        .map(|message| render_message(message, include_role_headers))
        .collect::<Vec<_>>()
        .join("\n\n");

    match attributes {
        Some(front_matter) => front_matter.render() + &body,
        None => body,
    }
}

fn render_message(message: &Message, include_role_headers: bool) -> String {
    let mut out = String::new();
    if include_role_headers {
        out.push_str("# ");
        out.push_str(message.role().heading());
        out.push('\n');
    }

    match message {
        Message::System { content } | Message::User { content } => out.push_str(content),
        Message::Assistant {
            content,
            function_call,
        } => {
            if let Some(content) = content {
                out.push_str(content);
            }
            if let Some(call) = function_call {
                if content.is_some() {
                    out.push('\n');
                }
                out.push_str(&render_function_call(call));
            }
        }
    }
    out
}

fn render_function_call(call: &FunctionCall) -> String {
    let value = serde_json::json!({
        "name": call.name,
        "arguments": call.arguments,
    });
    format!("{:#}", value)
}

/// Parse instruct text back into messages and front matter.
///
/// Lines before the first heading belong to an implicit system message. A
/// heading-like line for any other role is plain content. A malformed front
/// matter block is dropped and reported as no attributes.
///
/// In an assistant section, the first line that is exactly `{` and starts a
/// trailing `{"name", "arguments"}` object begins the function call.
pub fn instruct_to_messages(text: &str) -> InstructDocument {
    let (attributes, body) = split_front_matter(text);
    InstructDocument {
        attributes,
        messages: parse_body(body),
    }
}

fn split_front_matter(text: &str) -> (Option<FrontMatter>, &str) {
    let Some((first, rest)) = text.split_once('\n') else {
        return (None, text);
    };
    if first.trim_end() != FRONT_MATTER_DELIMITER {
        return (None, text);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let block = &rest[..offset];
            let after = &rest[offset + line.len()..];
            let body = after
                .strip_prefix('\n')
                .or_else(|| after.strip_prefix("\r\n"))
                .unwrap_or(after);

            let attributes = match FrontMatter::parse(block) {
                Ok(front_matter) => Some(front_matter),
                Err(e) => {
                    tracing::debug!("Ignoring malformed front matter block: {}", e);
                    None
                }
            };
            return (attributes, body);
        }
        offset += line.len();
    }

    // Unterminated block: not front matter
    (None, text)
}

fn parse_body(body: &str) -> Vec<Message> {
    if body.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();
    let mut role = Role::System;
    let mut buffer: Vec<&str> = Vec::new();

    for line in body.split('\n') {
        match heading_role(line) {
            Some(next) => {
                // the blank separator line written between messages
                if buffer.last() == Some(&"") {
                    buffer.pop();
                }
                flush(&mut messages, role, &buffer);
                buffer.clear();
                role = next;
            }
            None => buffer.push(line),
        }
    }
    flush(&mut messages, role, &buffer);

    messages
}

fn heading_role(line: &str) -> Option<Role> {
    ROLE_HEADING
        .captures(line)
        .and_then(|caps| Role::from_heading(&caps[1]))
}

fn flush(messages: &mut Vec<Message>, role: Role, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    let message = match role {
        Role::System => Message::system(lines.join("\n")),
        Role::User => Message::user(lines.join("\n")),
        Role::Assistant => assistant_from_lines(lines),
    };
    messages.push(message);
}

/// Split a trailing function-call object off the assistant's lines.
fn assistant_from_lines(lines: &[&str]) -> Message {
    let call_start = lines.iter().enumerate().find_map(|(i, line)| {
        if line.trim_end() != "{" {
            return None;
        }
        serde_json::from_str::<FunctionCall>(&lines[i..].join("\n"))
            .ok()
            .map(|call| (i, call))
    });

    match call_start {
        Some((0, call)) => Message::assistant_with_call(None, call),
        Some((i, call)) => Message::assistant_with_call(Some(lines[..i].join("\n")), call),
        None => Message::assistant(lines.join("\n")),
    }
}
