//! Prompt definitions.
//!
//! A definition groups the candidate prompts for one task with the metadata
//! that travels in an instruct document's front matter.

use crate::candidate::{CandidatePrompt, Compiled};
use crate::instruct::{instruct_to_messages, messages_to_instruct, FrontMatter};
use crate::message::Message;
use crate::vars::{dedupe, Variables};
use pia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Model parameters carried with a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Model identifier (e.g., "gpt-4")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelParams {
    /// Read `model`, `temperature` and `max_tokens` from front matter.
    pub fn from_front_matter(front_matter: &FrontMatter) -> AppResult<Self> {
        let temperature = front_matter
            .get("temperature")
            .map(|t| {
                t.trim()
                    .parse::<f32>()
                    .map_err(|e| AppError::Prompt(format!("Invalid temperature {:?}: {}", t, e)))
            })
            .transpose()?;

        let max_tokens = front_matter
            .get("max_tokens")
            .map(|t| {
                t.trim()
                    .parse::<u32>()
                    .map_err(|e| AppError::Prompt(format!("Invalid max_tokens {:?}: {}", t, e)))
            })
            .transpose()?;

        Ok(Self {
            model: front_matter.get("model").map(str::to_string),
            temperature,
            max_tokens,
        })
    }

    /// Write the set parameters into `front_matter` and remove the unset ones.
    pub fn write_front_matter(&self, front_matter: &mut FrontMatter) {
        set_or_remove(front_matter, "model", self.model.clone());
        set_or_remove(
            front_matter,
            "temperature",
            self.temperature.map(|t| t.to_string()),
        );
        set_or_remove(
            front_matter,
            "max_tokens",
            self.max_tokens.map(|t| t.to_string()),
        );
    }
}

fn set_or_remove(front_matter: &mut FrontMatter, key: &str, value: Option<String>) {
    match value {
        Some(value) => front_matter.insert(key, value),
        None => {
            front_matter.remove(key);
        }
    }
}

/// A named prompt with one or more candidate implementations.
///
/// The first candidate is the main one; the others are alternatives kept
/// for comparison.
#[derive(Debug, Clone)]
pub struct PromptDefinition {
    /// Human-readable name
    pub name: String,

    /// What the prompt is for
    pub description: Option<String>,

    /// Candidate prompts, main first
    pub candidates: Vec<CandidatePrompt>,

    /// Model parameters
    pub params: ModelParams,

    /// Default variable values, overridden per compile
    pub vars: Variables,

    /// Front matter as read. Keys with no field above are written back as is.
    pub attributes: FrontMatter,
}

impl PromptDefinition {
    /// Create a definition with no candidates.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            candidates: Vec::new(),
            params: ModelParams::default(),
            vars: Variables::new(),
            attributes: FrontMatter::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_candidate(mut self, candidate: CandidatePrompt) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_vars(mut self, vars: Variables) -> Self {
        self.vars = vars;
        self
    }

    /// The candidate used for runs and edits.
    pub fn main_candidate(&self) -> AppResult<&CandidatePrompt> {
        self.candidates
            .first()
            .ok_or_else(|| AppError::Prompt(format!("Prompt {} has no candidates", self.name)))
    }

    /// Default vars overlaid with `overrides`.
    pub fn resolve_vars(&self, overrides: &Variables) -> Variables {
        let mut vars = self.vars.clone();
        vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }

    /// Compile the main candidate with [`PromptDefinition::resolve_vars`].
    pub fn compile(&self, overrides: &Variables) -> AppResult<Compiled> {
        self.main_candidate()?
            .with_variables(self.resolve_vars(overrides))
            .compile()
    }

    /// Compile every candidate with the same variables.
    pub fn compile_all(&self, overrides: &Variables) -> Vec<(String, AppResult<Compiled>)> {
        let vars = self.resolve_vars(overrides);
        self.candidates
            .iter()
            .map(|c| (c.name().to_string(), c.with_variables(vars.clone()).compile()))
            .collect()
    }

    /// Unique variables the main candidate's template refers to.
    pub fn input_variables(&self) -> AppResult<Vec<String>> {
        Ok(dedupe(self.main_candidate()?.get_all_variable_placeholders()?))
    }

    /// Front matter describing this prompt.
    pub fn front_matter(&self) -> FrontMatter {
        let mut front_matter = self.attributes.clone();
        front_matter.insert("name", self.name.as_str());
        set_or_remove(&mut front_matter, "description", self.description.clone());
        self.params.write_front_matter(&mut front_matter);
        front_matter
    }

    /// The main candidate's template as an instruct document with front matter.
    pub fn to_instruct_document(&self, include_role_headers: bool) -> AppResult<String> {
        let front_matter = self.front_matter();
        let document = match self.main_candidate()?.raw().compile()? {
            Compiled::Messages(messages) => {
                messages_to_instruct(&messages, Some(&front_matter), include_role_headers)
            }
            Compiled::Text(text) => {
                messages_to_instruct(&[Message::system(text)], Some(&front_matter), false)
            }
        };
        Ok(document)
    }

    /// Build a definition from an instruct document.
    ///
    /// The name comes from the front matter, or `fallback_name` when absent.
    /// The document body becomes the single candidate.
    pub fn from_instruct_document(text: &str, fallback_name: &str) -> AppResult<Self> {
        let front_matter = instruct_to_messages(text).attributes.unwrap_or_default();

        let name = front_matter
            .name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback_name)
            .to_string();

        Ok(Self {
            description: front_matter.description().map(str::to_string),
            params: ModelParams::from_front_matter(&front_matter)?,
            candidates: vec![CandidatePrompt::from_instruct_text("main", text)],
            vars: Variables::new(),
            attributes: front_matter,
            name,
        })
    }

    /// Install an edited instruct document as the main candidate.
    ///
    /// Returns the variables the new template uses that the previous main
    /// candidate did not. Name and description are taken from the document's
    /// front matter when present.
    pub fn replace_main_candidate(&mut self, text: &str) -> AppResult<Vec<String>> {
        let previous: HashSet<String> = match self.candidates.first() {
            Some(candidate) => candidate
                .get_all_variable_placeholders()?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        if let Some(front_matter) = instruct_to_messages(text).attributes {
            if let Some(name) = front_matter.name().filter(|n| !n.trim().is_empty()) {
                self.name = name.to_string();
            }
            if let Some(description) = front_matter.description() {
                self.description = Some(description.to_string());
            }
            self.attributes = front_matter;
        }

        let candidate = CandidatePrompt::from_instruct_text("edited", text);
        let added = dedupe(candidate.get_all_variable_placeholders()?)
            .into_iter()
            .filter(|name| !previous.contains(name))
            .collect();

        match self.candidates.first_mut() {
            Some(main) => *main = candidate,
            None => self.candidates.push(candidate),
        }
        tracing::debug!(prompt = %self.name, "Replaced main candidate");

        Ok(added)
    }
}
