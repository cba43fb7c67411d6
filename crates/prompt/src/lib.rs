//! Prompt engine for the Prompt Iteration Assistant.
//!
//! This crate provides:
//! - A typed chat message model
//! - `${name}` placeholder extraction and substitution
//! - Lossless conversion between messages and instruct text with front matter
//! - Candidate prompts with bound and template (raw) rendering
//! - Prompt definitions and a workspace loader

pub mod candidate;
pub mod definition;
pub mod instruct;
pub mod loader;
pub mod message;
pub mod vars;

// Re-export main types
pub use candidate::{Bindings, CandidatePrompt, CompileContext, Compiled};
pub use definition::{ModelParams, PromptDefinition};
pub use instruct::{instruct_to_messages, messages_to_instruct, FrontMatter, InstructDocument};
pub use loader::{list_prompts, load_prompt, prompt_path};
pub use message::{parse_messages_json, FunctionCall, Message, Role};
pub use vars::{
    dedupe, extract_placeholders, placeholder, substitute_lenient, substitute_messages_lenient,
    unique_placeholders, Variables,
};
