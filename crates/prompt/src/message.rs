//! Chat message model.
//!
//! A prompt compiles to an ordered sequence of role-tagged messages. The
//! three roles are modelled as enum variants so every consumer (rendering,
//! parsing, substitution) has to handle each of them.

use pia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// The role a message is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name (`system`, `user`, `assistant`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Capitalized name used in instruct headings (`# System`).
    pub fn heading(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }

    /// Inverse of [`Role::heading`]. Case-sensitive.
    pub fn from_heading(s: &str) -> Option<Self> {
        match s {
            "System" => Some(Self::System),
            "User" => Some(Self::User),
            "Assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function call requested by the assistant.
///
/// `arguments` is always a JSON document in string form, never a live
/// object, so the call survives conversion to and from instruct text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl FunctionCall {
    /// Create a function call, pretty-printing `arguments` with 2-space indent.
    pub fn new(name: impl Into<String>, arguments: &serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments: format!("{:#}", arguments),
        }
    }

    /// Parse the arguments back into a JSON value.
    pub fn parsed_arguments(&self) -> AppResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.arguments)?)
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        /// May only be `None` when a function call is present
        content: Option<String>,

        #[serde(
            rename = "functionCall",
            alias = "function_call",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        function_call: Option<FunctionCall>,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message without a function call.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            function_call: None,
        }
    }

    /// Create an assistant message carrying a function call.
    pub fn assistant_with_call(content: Option<String>, function_call: FunctionCall) -> Self {
        Self::Assistant {
            content,
            function_call: Some(function_call),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } => Some(content),
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    pub fn function_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::Assistant { function_call, .. } => function_call.as_ref(),
            _ => None,
        }
    }

    /// Rewrite the content with `f`, keeping role and function call.
    /// Messages without content are returned unchanged.
    pub fn map_content(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            Self::System { content } => Self::System {
                content: f(&content),
            },
            Self::User { content } => Self::User {
                content: f(&content),
            },
            Self::Assistant {
                content,
                function_call,
            } => Self::Assistant {
                content: content.map(|c| f(&c)),
                function_call,
            },
        }
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        if let Self::Assistant {
            content: None,
            function_call: None,
        } = self
        {
            return Err(AppError::Validation(
                "assistant message must have content or a function call".to_string(),
            ));
        }
        Ok(())
    }

    /// Build a message from untyped JSON, rejecting anything that does not
    /// match the schema of its role.
    pub fn from_json_value(value: serde_json::Value) -> AppResult<Self> {
        let message: Message =
            serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }
}

/// Parse and validate a JSON array of messages.
pub fn parse_messages_json(text: &str) -> AppResult<Vec<Message>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Array(items) = value else {
        return Err(AppError::Validation(
            "expected a JSON array of messages".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            Message::from_json_value(item)
                .map_err(|e| AppError::Validation(format!("message {}: {}", i, e)))
        })
        .collect()
}
